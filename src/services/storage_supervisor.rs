use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    services::sse_events,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a storage backend installed, switching degraded mode on and off as it
/// comes and goes. Never returns.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                info!("storage connection established; leaving degraded mode");
                if state.set_game_store(store.clone()).await {
                    sse_events::broadcast_system_status(&state, false);
                }
                delay = INITIAL_DELAY;
                watch_store(&state, store.as_ref()).await;
                warn!("giving up on the current storage connection; opening a new one");
            }
            Err(err) => {
                warn!(error = %err, ?delay, "storage connection attempt failed");
            }
        }
        sleep(delay).await;
        delay = (delay * 2).min(MAX_DELAY);
    }
}

/// Poll the store until it fails and cannot be revived in place.
async fn watch_store(state: &SharedState, store: &dyn GameStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("storage healthy again; leaving degraded mode");
                set_degraded(state, false);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        set_degraded(state, true);
        if !revive(store).await {
            warn!(
                attempts = MAX_RECONNECT_ATTEMPTS,
                "storage reconnect attempts exhausted; staying in degraded mode"
            );
            return;
        }
        info!("storage reconnected after a failed health check");
        set_degraded(state, false);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

/// Ask the store to reconnect, backing off between attempts.
async fn revive(store: &dyn GameStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => return true,
            Err(err) => {
                warn!(attempt, error = %err, "storage reconnect attempt failed");
                if attempt < MAX_RECONNECT_ATTEMPTS {
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_DELAY);
                }
            }
        }
    }
    false
}

/// Flip degraded mode and tell open games about it when it actually changed.
fn set_degraded(state: &SharedState, degraded: bool) {
    if state.update_degraded(degraded) {
        sse_events::broadcast_system_status(state, degraded);
    }
}
