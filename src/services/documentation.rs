use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document of the tracker backend.
#[openapi(
    info(title = "TI Tracker Back"),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::game_stream,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::list_games,
        crate::routes::game::get_game,
        crate::routes::game::delete_game,
        crate::routes::game::get_snapshot,
        crate::routes::game::get_scoreboard,
        crate::routes::play::pick_card,
        crate::routes::play::reset_strategy,
        crate::routes::play::take_action,
        crate::routes::play::advance_phase,
        crate::routes::play::change_speaker,
        crate::routes::play::create_objective,
        crate::routes::play::toggle_objective,
        crate::routes::play::claim_mecatol,
        crate::routes::play::adjust_score,
        crate::routes::history::undo,
        crate::routes::history::redo,
        crate::routes::history::list_history,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::game::PlayerInput,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::JoinGameRequest,
            crate::dto::game::GameListItem,
            crate::dto::game::PlayerSummary,
            crate::dto::game::StrategyView,
            crate::dto::game::ActionStateSummary,
            crate::dto::game::ActionView,
            crate::dto::game::ObjectiveSummary,
            crate::dto::game::HistoryStatus,
            crate::dto::game::GameSnapshot,
            crate::dto::game::ScoreEntry,
            crate::dto::game::Scoreboard,
            crate::dto::play::ActionPath,
            crate::dto::play::PickCardRequest,
            crate::dto::play::ActionRequest,
            crate::dto::play::SpeakerRequest,
            crate::dto::play::CreateObjectiveRequest,
            crate::dto::play::ToggleObjectiveRequest,
            crate::dto::play::MecatolRequest,
            crate::dto::play::ScoreRequest,
            crate::dto::history::HistoryEntryDto,
            crate::dto::history::HistoryListing,
            crate::dto::history::HistoryChange,
            crate::dto::history::HistoryEvent,
            crate::dto::phase::PhaseEnteredEvent,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dao::models::ObjectiveStage,
            crate::state::action::ActionControls,
            crate::state::round::RoundCursor,
            crate::state::state_machine::GamePhase,
            crate::state::strategy::CardStatus,
            crate::config::StrategyCard,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "games", description = "Game creation, joining and snapshots"),
        (name = "strategy", description = "Strategy card draft"),
        (name = "actions", description = "Action phase turns"),
        (name = "phases", description = "Round and phase progression"),
        (name = "scoring", description = "Speaker, objectives, Mecatol Rex and victory points"),
        (name = "history", description = "Undo and redo of table commands"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_game_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/games",
            "/games/join",
            "/games/{id}/actions/{kind}",
            "/games/{id}/phase/advance",
            "/games/{id}/undo",
            "/games/{id}/events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
