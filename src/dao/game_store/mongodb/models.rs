use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::RowEntity;

pub const GAME_COLLECTION_NAME: &str = "games";
pub const PLAYER_COLLECTION_NAME: &str = "players";
pub const SELECTION_COLLECTION_NAME: &str = "strategy_selections";
pub const ACTION_STATE_COLLECTION_NAME: &str = "player_action_states";
pub const OBJECTIVE_COLLECTION_NAME: &str = "objectives";
pub const TIMER_COLLECTION_NAME: &str = "timers";

/// Every collection holding rows scoped to a game, excluding the game collection itself.
pub const CHILD_COLLECTIONS: [&str; 5] = [
    PLAYER_COLLECTION_NAME,
    SELECTION_COLLECTION_NAME,
    ACTION_STATE_COLLECTION_NAME,
    OBJECTIVE_COLLECTION_NAME,
    TIMER_COLLECTION_NAME,
];

/// Envelope stored in every collection: a string key, the owning game, and the row itself.
///
/// Ids are stored as strings so lookups do not depend on the driver's UUID encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub row: T,
}

impl<T> RowDocument<T> {
    pub fn new(id: String, game_id: Uuid, row: T) -> Self {
        Self {
            id,
            game_id: game_id.to_string(),
            row,
        }
    }
}

/// Collection name and document key of a row.
pub fn locate(row: &RowEntity) -> Option<(&'static str, String)> {
    let located = match row {
        RowEntity::Game(game) => (GAME_COLLECTION_NAME, game.id.to_string()),
        RowEntity::Player(player) => (
            PLAYER_COLLECTION_NAME,
            format!("{}:{}", player.game_id, player.id),
        ),
        RowEntity::Selection(selection) => (
            SELECTION_COLLECTION_NAME,
            format!(
                "{}:{}:{}",
                selection.game_id, selection.round, selection.player_id
            ),
        ),
        RowEntity::ActionState(state) => (
            ACTION_STATE_COLLECTION_NAME,
            format!("{}:{}:{}", state.game_id, state.round, state.player_id),
        ),
        RowEntity::Objective(objective) => (
            OBJECTIVE_COLLECTION_NAME,
            format!("{}:{}", objective.game_id, objective.id),
        ),
        RowEntity::Timer(timer) => (
            TIMER_COLLECTION_NAME,
            format!("{}:{}", timer.game_id, timer.player_id),
        ),
        RowEntity::DraftPick(_) => return None,
    };
    Some(located)
}
