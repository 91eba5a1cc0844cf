/// Write path shared by every mutating service.
pub mod commit;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle: creation, joining, loading, snapshots and deletion.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Undo/redo over recorded commands.
pub mod history_service;
/// Strategy picks, turns, scoring and phase transitions.
pub mod play_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events subscription service.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
