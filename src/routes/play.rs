use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        game::GameSnapshot,
        play::{
            ActionPath, ActionRequest, CreateObjectiveRequest, MecatolRequest, PickCardRequest,
            ScoreRequest, SpeakerRequest, ToggleObjectiveRequest,
        },
    },
    error::AppError,
    routes::actor::ActingUser,
    services::play_service,
    state::SharedState,
};

/// In-game commands. Every route answers with the refreshed snapshot.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}/strategy/pick", post(pick_card))
        .route("/games/{id}/strategy/reset", post(reset_strategy))
        .route("/games/{id}/actions/{kind}", post(take_action))
        .route("/games/{id}/phase/advance", post(advance_phase))
        .route("/games/{id}/speaker", post(change_speaker))
        .route("/games/{id}/objectives", post(create_objective))
        .route(
            "/games/{id}/objectives/{objective_id}/toggle",
            post(toggle_objective),
        )
        .route("/games/{id}/mecatol", post(claim_mecatol))
        .route("/games/{id}/score", post(adjust_score))
}

/// Claim a strategy card for the current picker.
#[utoipa::path(
    post,
    path = "/games/{id}/strategy/pick",
    tag = "strategy",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = PickCardRequest,
    responses(
        (status = 200, description = "Card picked", body = GameSnapshot),
        (status = 403, description = "Not this player's turn"),
        (status = 409, description = "Card taken or wrong phase")
    )
)]
pub async fn pick_card(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<PickCardRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(play_service::pick_card(&state, id, actor, payload).await?))
}

/// Restart the draft of the current round. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/strategy/reset",
    tag = "strategy",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Draft reset", body = GameSnapshot),
        (status = 403, description = "Not the host")
    )
)]
pub async fn reset_strategy(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(play_service::reset_strategy(&state, id, actor).await?))
}

/// Take a tactical, component or strategy card action, or pass.
#[utoipa::path(
    post,
    path = "/games/{id}/actions/{kind}",
    tag = "actions",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("kind" = ActionPath, Path, description = "tactical, component, strategy-card or pass"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action recorded", body = GameSnapshot),
        (status = 403, description = "Not this player's turn"),
        (status = 409, description = "Action not allowed right now")
    )
)]
pub async fn take_action(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path((id, kind)): Path<(Uuid, ActionPath)>,
    Valid(Json(payload)): Valid<Json<ActionRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::take_action(&state, id, actor, kind.into(), payload).await?,
    ))
}

/// Close the current phase and open the next one. Host only.
#[utoipa::path(
    post,
    path = "/games/{id}/phase/advance",
    tag = "phases",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    responses(
        (status = 200, description = "Phase advanced", body = GameSnapshot),
        (status = 403, description = "Not the host"),
        (status = 409, description = "Phase cannot end yet"),
        (status = 503, description = "Storage unavailable or transition timed out")
    )
)]
pub async fn advance_phase(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(play_service::advance_phase(&state, id, actor).await?))
}

#[utoipa::path(
    post,
    path = "/games/{id}/speaker",
    tag = "scoring",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = SpeakerRequest,
    responses((status = 200, description = "Speaker changed", body = GameSnapshot))
)]
pub async fn change_speaker(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<SpeakerRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::change_speaker(&state, id, actor, payload).await?,
    ))
}

/// Reveal a new objective.
#[utoipa::path(
    post,
    path = "/games/{id}/objectives",
    tag = "scoring",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = CreateObjectiveRequest,
    responses((status = 200, description = "Objective revealed", body = GameSnapshot))
)]
pub async fn create_objective(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<CreateObjectiveRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::create_objective(&state, id, actor, payload).await?,
    ))
}

/// Score or unscore an objective for a player.
#[utoipa::path(
    post,
    path = "/games/{id}/objectives/{objective_id}/toggle",
    tag = "scoring",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("objective_id" = Uuid, Path, description = "Objective identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = ToggleObjectiveRequest,
    responses((status = 200, description = "Objective toggled", body = GameSnapshot))
)]
pub async fn toggle_objective(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path((id, objective_id)): Path<(Uuid, Uuid)>,
    Valid(Json(payload)): Valid<Json<ToggleObjectiveRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::toggle_objective(&state, id, objective_id, actor, payload).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/games/{id}/mecatol",
    tag = "scoring",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = MecatolRequest,
    responses((status = 200, description = "Custodian changed", body = GameSnapshot))
)]
pub async fn claim_mecatol(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<MecatolRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::claim_mecatol(&state, id, actor, payload).await?,
    ))
}

/// Set a player's victory points by hand.
#[utoipa::path(
    post,
    path = "/games/{id}/score",
    tag = "scoring",
    params(
        ("id" = Uuid, Path, description = "Game identifier"),
        ("x-user-id" = Uuid, Header, description = "Acting user")
    ),
    request_body = ScoreRequest,
    responses((status = 200, description = "Score adjusted", body = GameSnapshot))
)]
pub async fn adjust_score(
    State(state): State<SharedState>,
    ActingUser(actor): ActingUser,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<ScoreRequest>>,
) -> Result<Json<GameSnapshot>, AppError> {
    Ok(Json(
        play_service::adjust_score(&state, id, actor, payload).await?,
    ))
}
