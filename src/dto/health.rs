use serde::Serialize;
use utoipa::ToSchema;

/// Overall service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    /// No usable storage backend; reads of loaded games still work, writes are refused.
    Degraded,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Whether the last storage ping succeeded.
    pub storage_reachable: bool,
    /// Games currently held in memory.
    pub open_games: usize,
}
