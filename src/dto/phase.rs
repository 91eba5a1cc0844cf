use serde::Serialize;
use utoipa::ToSchema;

use crate::{dto::format_system_time, state::round::RoundCursor};

/// Broadcast once when a game enters a new phase.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhaseEnteredEvent {
    pub cursor: RoundCursor,
    /// RFC 3339 timestamp of the phase start.
    pub started_at: String,
}

impl PhaseEnteredEvent {
    pub fn new(cursor: RoundCursor, started_at: std::time::SystemTime) -> Self {
        Self {
            cursor,
            started_at: format_system_time(started_at),
        }
    }
}
