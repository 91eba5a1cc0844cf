use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{game::GameSnapshot, history::HistoryListing},
    error::AppError,
    routes::actor::ActingUser,
    services::history_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}/undo", post(undo))
        .route("/games/{id}/redo", post(redo))
        .route("/games/{id}/history", get(list_history))
}

/// Revert the latest recorded command.
#[utoipa::path(
    post,
    path = "/games/{id}/undo",
    tag = "history",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Command reverted", body = GameSnapshot),
        (status = 403, description = "Only the host or the author may undo"),
        (status = 409, description = "Nothing to undo")
    )
)]
pub async fn undo(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(history_service::undo(&state, id, actor).await?))
}

/// Replay the latest reverted command.
#[utoipa::path(
    post,
    path = "/games/{id}/redo",
    tag = "history",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Command replayed", body = GameSnapshot),
        (status = 403, description = "Only the host or the author may redo"),
        (status = 409, description = "Nothing to redo")
    )
)]
pub async fn redo(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(history_service::redo(&state, id, actor).await?))
}

#[utoipa::path(
    get,
    path = "/games/{id}/history",
    tag = "history",
    params(("id" = Uuid, Path, description = "Game identifier")),
    responses((status = 200, description = "Undo and redo stacks", body = HistoryListing))
)]
pub async fn list_history(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryListing>, AppError> {
    Ok(Json(history_service::list(&state, id).await?))
}
