use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ActionStateEntity, GameEntity, ObjectiveEntity, ObjectiveStage, PlayerEntity},
    dto::{
        format_system_time,
        validation::{validate_join_code, validate_not_blank},
    },
    state::{
        action::ActionControls, round::RoundCursor, state_machine::GamePhase,
        strategy::CardStatus,
    },
};

/// Seat details supplied when creating or joining a game.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct PlayerInput {
    #[validate(length(min = 1, max = 32), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 48), custom(function = "validate_not_blank"))]
    pub faction: String,
    #[validate(length(min = 1, max = 16))]
    pub color: String,
}

/// Payload used to open a new table; the caller becomes host, seat 0 and speaker.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(length(min = 1, max = 64), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(nested)]
    pub host: PlayerInput,
    /// Defaults to the configured goal.
    #[serde(default)]
    #[validate(range(min = 1, max = 30))]
    pub victory_point_goal: Option<u32>,
}

/// Payload used to take a seat at an existing table.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinGameRequest {
    #[validate(custom(function = "validate_join_code"))]
    pub join_code: String,
    #[validate(nested)]
    pub player: PlayerInput,
}

/// Entry of the game listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameListItem {
    pub id: Uuid,
    pub name: String,
    pub join_code: String,
    pub round: u32,
    pub phase: GamePhase,
    pub created_at: String,
}

impl From<GameEntity> for GameListItem {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            name: game.name,
            join_code: game.join_code,
            round: game.round,
            phase: game.phase,
            created_at: format_system_time(game.created_at),
        }
    }
}

/// Player as shown on the table view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub faction: String,
    pub color: String,
    pub seat: u32,
    pub victory_points: u32,
    pub is_host: bool,
    pub is_speaker: bool,
    /// Strategy card held this round, from the draft or the persisted selections.
    pub strategy_card: Option<u8>,
    /// Turn time spent so far, including a running stretch.
    pub elapsed_ms: u64,
    pub timer_running: bool,
}

impl PlayerSummary {
    pub fn new(
        player: &PlayerEntity,
        game: &GameEntity,
        strategy_card: Option<u8>,
        elapsed_ms: u64,
        timer_running: bool,
    ) -> Self {
        Self {
            id: player.id,
            user_id: player.user_id,
            name: player.name.clone(),
            faction: player.faction.clone(),
            color: player.color.clone(),
            seat: player.seat,
            victory_points: player.victory_points,
            is_host: player.user_id == game.host_user_id,
            is_speaker: game.speaker_id == Some(player.id),
            strategy_card,
            elapsed_ms,
            timer_running,
        }
    }
}

/// Strategy phase view: pick order and the card board.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StrategyView {
    pub turn_order: Vec<Uuid>,
    pub current_picker: Option<Uuid>,
    pub all_picked: bool,
    pub cards: Vec<CardStatus>,
}

/// Per-round counters of a player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionStateSummary {
    pub player_id: Uuid,
    pub tactical_actions: u32,
    pub component_actions: u32,
    pub strategy_card_used: bool,
    pub passed: bool,
}

impl From<&ActionStateEntity> for ActionStateSummary {
    fn from(state: &ActionStateEntity) -> Self {
        Self {
            player_id: state.player_id,
            tactical_actions: state.tactical_actions,
            component_actions: state.component_actions,
            strategy_card_used: state.strategy_card_used,
            passed: state.passed,
        }
    }
}

/// Action phase view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActionView {
    /// Players that have not passed, in initiative order.
    pub active_players: Vec<Uuid>,
    pub current_player: Option<Uuid>,
    pub turn_index: u32,
    pub all_passed: bool,
    pub states: Vec<ActionStateSummary>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObjectiveSummary {
    pub id: Uuid,
    pub name: String,
    pub stage: ObjectiveStage,
    pub points: u32,
    pub scored_by: Vec<Uuid>,
}

impl From<&ObjectiveEntity> for ObjectiveSummary {
    fn from(objective: &ObjectiveEntity) -> Self {
        Self {
            id: objective.id,
            name: objective.name.clone(),
            stage: objective.stage,
            points: objective.points,
            scored_by: objective.scored_by.clone(),
        }
    }
}

/// Undo/redo availability for the requesting user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryStatus {
    pub undo_depth: usize,
    pub redo_depth: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Full table state as seen by one user.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSnapshot {
    pub id: Uuid,
    pub name: String,
    pub join_code: String,
    pub host_user_id: Uuid,
    /// Cache revision the snapshot was taken at; grows with every committed change.
    pub revision: u64,
    pub cursor: RoundCursor,
    pub phase_started_at: String,
    pub speaker_id: Option<Uuid>,
    pub mecatol_owner: Option<Uuid>,
    pub victory_point_goal: u32,
    pub players: Vec<PlayerSummary>,
    pub strategy: StrategyView,
    pub action: ActionView,
    pub objectives: Vec<ObjectiveSummary>,
    pub history: HistoryStatus,
    /// Controls of the requesting user's seat during the action phase.
    pub controls: Option<ActionControls>,
}

/// Scoreboard line of a player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreEntry {
    pub player_id: Uuid,
    pub name: String,
    pub faction: String,
    pub victory_points: u32,
    /// Names of the objectives the player scored.
    pub objectives: Vec<String>,
    pub holds_mecatol: bool,
}

/// Players ranked by victory points.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Scoreboard {
    pub victory_point_goal: u32,
    pub entries: Vec<ScoreEntry>,
    /// Leading player once they reached the goal.
    pub winner: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use validator::Validate;

    use super::*;

    fn player() -> PlayerInput {
        PlayerInput {
            name: "Ada".into(),
            faction: "Emirates of Hacan".into(),
            color: "yellow".into(),
        }
    }

    #[test]
    fn join_request_checks_code_and_player() {
        let valid = JoinGameRequest {
            join_code: "K7QX2M".into(),
            player: player(),
        };
        assert!(valid.validate().is_ok());

        let bad_code = JoinGameRequest {
            join_code: "K7QX0".into(),
            player: player(),
        };
        assert!(bad_code.validate().is_err());

        let blank_name = JoinGameRequest {
            join_code: "K7QX2M".into(),
            player: PlayerInput {
                name: "   ".into(),
                ..player()
            },
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn create_request_bounds_the_goal() {
        let request = CreateGameRequest {
            name: "Friday".into(),
            host: player(),
            victory_point_goal: Some(0),
        };
        assert!(request.validate().is_err());
    }
}
