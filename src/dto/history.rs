use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::format_system_time,
    state::{cache::GameCache, history::HistoryEntry},
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEntryDto {
    pub id: Uuid,
    pub author: Uuid,
    /// Command kind, e.g. `tactical_action`.
    pub kind: String,
    pub description: String,
    pub recorded_at: String,
}

impl HistoryEntryDto {
    pub fn new(entry: &HistoryEntry, cache: &GameCache) -> Self {
        Self {
            id: entry.id,
            author: entry.author,
            kind: entry.command.kind().to_string(),
            description: entry.command.describe(cache),
            recorded_at: format_system_time(entry.recorded_at),
        }
    }
}

/// Both stacks, oldest entry first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryListing {
    pub undo: Vec<HistoryEntryDto>,
    pub redo: Vec<HistoryEntryDto>,
}

/// What happened to the history.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryChange {
    Recorded,
    Undone,
    Redone,
    Cleared,
}

/// Broadcast whenever the history stacks change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistoryEvent {
    pub change: HistoryChange,
    pub entry: Option<HistoryEntryDto>,
    pub undo_depth: usize,
    pub redo_depth: usize,
}
