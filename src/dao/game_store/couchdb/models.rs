use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::dao::models::RowEntity;

pub const GAME_PREFIX: &str = "game::";
pub const PLAYER_TABLE: &str = "player";
pub const SELECTION_TABLE: &str = "selection";
pub const ACTION_STATE_TABLE: &str = "action_state";
pub const OBJECTIVE_TABLE: &str = "objective";
pub const TIMER_TABLE: &str = "timer";
pub const END_SUFFIX: &str = "\u{ffff}";

/// Tables whose documents are keyed under a game id.
pub const CHILD_TABLES: [&str; 5] = [
    PLAYER_TABLE,
    SELECTION_TABLE,
    ACTION_STATE_TABLE,
    OBJECTIVE_TABLE,
    TIMER_TABLE,
];

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub value: Option<AllDocsValue>,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsValue {
    pub rev: String,
}

/// Only the revision of an existing document, enough to overwrite or delete it.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Document wrapping a single row of any table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRowDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub game_id: Uuid,
    pub row: T,
}

/// Tombstone sent through `_bulk_docs`.
#[derive(Debug, Serialize)]
pub struct DeletedDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_deleted")]
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct BulkDocsRequest<T> {
    pub docs: Vec<T>,
}

pub fn game_doc_id(id: Uuid) -> String {
    format!("{GAME_PREFIX}{id}")
}

/// Prefix shared by every document of `table` belonging to `game_id`.
pub fn child_prefix(table: &str, game_id: Uuid) -> String {
    format!("{table}::{game_id}::")
}

/// Document id of a persistent row; draft picks have none.
pub fn row_doc_id(row: &RowEntity) -> Option<String> {
    let id = match row {
        RowEntity::Game(game) => game_doc_id(game.id),
        RowEntity::Player(player) => {
            format!("{}{}", child_prefix(PLAYER_TABLE, player.game_id), player.id)
        }
        RowEntity::Selection(selection) => format!(
            "{}{}:{}",
            child_prefix(SELECTION_TABLE, selection.game_id),
            selection.round,
            selection.player_id
        ),
        RowEntity::ActionState(state) => format!(
            "{}{}:{}",
            child_prefix(ACTION_STATE_TABLE, state.game_id),
            state.round,
            state.player_id
        ),
        RowEntity::Objective(objective) => format!(
            "{}{}",
            child_prefix(OBJECTIVE_TABLE, objective.game_id),
            objective.id
        ),
        RowEntity::Timer(timer) => format!(
            "{}{}",
            child_prefix(TIMER_TABLE, timer.game_id),
            timer.player_id
        ),
        RowEntity::DraftPick(_) => return None,
    };
    Some(id)
}
