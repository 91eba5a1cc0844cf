use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Named payload pushed to SSE clients.
///
/// Game-wide events carry the hub sequence number in `id`; events addressed to a
/// single client (the handshake) have none.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    pub id: Option<u64>,
    pub event: &'static str,
    pub data: String,
}

impl ServerEvent {
    /// Event sent to one client only, outside of the game sequence.
    pub fn direct<T: Serialize>(event: &'static str, payload: &T) -> serde_json::Result<Self> {
        Ok(Self {
            id: None,
            event,
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First event of every stream.
pub struct Handshake {
    pub game_id: Uuid,
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Sequence number of the last game event sent before this client joined.
    pub last_event_id: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}
