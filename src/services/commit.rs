//! Write path shared by every mutating service.
//!
//! A mutation runs against a scratch copy of the cache. The resulting row
//! changes are written to the store first; only once the store accepted them
//! are they applied to the shared cache and broadcast. A failed write leaves
//! the cache, the history and the subscribers untouched.

use std::time::{Duration, SystemTime};

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    dao::models::ChangeEvent,
    error::ServiceError,
    services::sse_events,
    state::{GameRuntime, SharedState, cache::GameCache, timer},
};

/// Run `mutate` on a scratch copy of the game and commit the outcome.
///
/// The caller must hold the runtime gate.
pub async fn commit<T, F>(
    state: &SharedState,
    runtime: &GameRuntime,
    mutate: F,
) -> Result<(T, Vec<ChangeEvent>), ServiceError>
where
    F: FnOnce(&mut GameCache) -> Result<T, ServiceError>,
{
    commit_within(state, runtime, None, mutate).await
}

/// Same as [`commit`], giving up with [`ServiceError::Timeout`] when the store
/// write takes longer than `limit`. Once the write went through, the cache
/// update and the broadcast always run to completion.
pub async fn commit_within<T, F>(
    state: &SharedState,
    runtime: &GameRuntime,
    limit: Option<Duration>,
    mutate: F,
) -> Result<(T, Vec<ChangeEvent>), ServiceError>
where
    F: FnOnce(&mut GameCache) -> Result<T, ServiceError>,
{
    let store = state.require_game_store().await?;

    let before = runtime.cache().snapshot().await;
    let mut scratch = before.clone();
    let value = mutate(&mut scratch)?;
    timer::follow_turn(&mut scratch, SystemTime::now());

    let changes = before.diff(&scratch);
    if changes.is_empty() {
        return Ok((value, changes));
    }

    let persistent: Vec<ChangeEvent> = changes
        .iter()
        .filter(|change| change.row.is_persistent())
        .cloned()
        .collect();
    if !persistent.is_empty() {
        let write = store.apply_changes(runtime.game_id(), persistent);
        let written = match limit {
            Some(limit) => match timeout(limit, write).await {
                Ok(written) => written,
                Err(_) => {
                    warn!(
                        game_id = %runtime.game_id(),
                        ?limit,
                        "store write timed out; discarding changes"
                    );
                    return Err(ServiceError::Timeout);
                }
            },
            None => write.await,
        };
        if let Err(err) = written {
            warn!(
                game_id = %runtime.game_id(),
                error = %err,
                "failed to persist changes; discarding them"
            );
            return Err(err.into());
        }
    }

    runtime.cache().apply_all(&changes).await;
    sse_events::broadcast_changes(runtime.sse(), &changes);
    debug!(
        game_id = %runtime.game_id(),
        changes = changes.len(),
        "changes committed"
    );

    Ok((value, changes))
}
