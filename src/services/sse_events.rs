use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::ChangeEvent,
    dto::{
        history::HistoryEvent,
        phase::PhaseEnteredEvent,
        sse::SystemStatus,
    },
    state::{SharedState, SseHub},
};

pub const EVENT_CHANGE: &str = "change";
pub const EVENT_HISTORY: &str = "history";
pub const EVENT_PHASE_ENTERED: &str = "phase.entered";
pub const EVENT_INFO: &str = "info";
pub const EVENT_HANDSHAKE: &str = "handshake";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Broadcast every row change, in order, as individual `change` events.
pub fn broadcast_changes(hub: &SseHub, changes: &[ChangeEvent]) {
    for change in changes {
        send_event(hub, EVENT_CHANGE, change);
    }
}

/// Broadcast a history stack update.
pub fn broadcast_history(hub: &SseHub, event: &HistoryEvent) {
    send_event(hub, EVENT_HISTORY, event);
}

/// Broadcast the one-off cue announcing a new phase.
pub fn broadcast_phase_entered(hub: &SseHub, event: &PhaseEnteredEvent) {
    send_event(hub, EVENT_PHASE_ENTERED, event);
}

/// Send a human-readable info message to the game's subscribers.
pub fn broadcast_info(hub: &SseHub, message: &str) {
    hub.publish(EVENT_INFO, message.to_string());
}

/// Tell every open game whether the backend runs without storage.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    for runtime in state.runtimes().iter() {
        send_event(runtime.sse(), EVENT_SYSTEM_STATUS, &payload);
    }
}

fn send_event(hub: &SseHub, event: &'static str, payload: &impl Serialize) {
    match serde_json::to_string(payload) {
        Ok(data) => {
            hub.publish(event, data);
        }
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
