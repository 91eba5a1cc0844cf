use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::game::{CreateGameRequest, GameListItem, GameSnapshot, JoinGameRequest, Scoreboard},
    error::AppError,
    routes::actor::ActingUser,
    services::game_service,
    state::SharedState,
};

/// Game lifecycle routes: creation, joining, listing, snapshots and deletion.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", get(list_games).post(create_game))
        .route("/games/join", post(join_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
        .route("/games/{id}/snapshot", get(get_snapshot))
        .route("/games/{id}/scoreboard", get(get_scoreboard))
}

/// Open a new table hosted by the requesting user.
#[utoipa::path(
    post,
    path = "/games",
    tag = "games",
    params(("x-user-id" = Uuid, Header, description = "Acting user")),
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameSnapshot),
        (status = 400, description = "Invalid payload"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameSnapshot>), AppError> {
    let snapshot = game_service::create_game(&state, actor, payload).await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// Take a seat using a join code.
#[utoipa::path(
    post,
    path = "/games/join",
    tag = "games",
    params(("x-user-id" = Uuid, Header, description = "Acting user")),
    request_body = JoinGameRequest,
    responses(
        (status = 200, description = "Seated", body = GameSnapshot),
        (status = 404, description = "Unknown join code"),
        (status = 409, description = "Table full or draft already started")
    )
)]
pub async fn join_game(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Valid(Json(payload)): Valid<Json<JoinGameRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(game_service::join_game(&state, actor, payload).await?))
}

/// List stored games, newest first.
#[utoipa::path(
    get,
    path = "/games",
    tag = "games",
    responses((status = 200, description = "Stored games", body = [GameListItem]))
)]
pub async fn list_games(
    State(state): State<SharedState>,
) -> Result<Json<Vec<GameListItem>>, AppError> {
    Ok(Json(game_service::list_games(&state).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game summary", body = GameListItem),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameListItem>, AppError> {
    Ok(Json(game_service::get_game(&state, id).await?))
}

/// Delete a game and every row it owns. Host only.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "games",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 403, description = "Not the host")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, id, actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full table state as seen by the requesting user.
#[utoipa::path(
    get,
    path = "/games/{id}/snapshot",
    tag = "games",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses((status = 200, description = "Snapshot", body = GameSnapshot))
)]
pub async fn get_snapshot(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(game_service::get_snapshot(&state, id, actor).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/scoreboard",
    tag = "games",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Players ranked by victory points", body = Scoreboard))
)]
pub async fn get_scoreboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Scoreboard>, AppError> {
    Ok(Json(game_service::scoreboard(&state, id).await?))
}
