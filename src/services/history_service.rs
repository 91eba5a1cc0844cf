use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{
        game::GameSnapshot,
        history::{HistoryChange, HistoryEntryDto, HistoryEvent, HistoryListing},
    },
    error::ServiceError,
    services::{commit::commit, game_service, sse_events},
    state::{
        GameRuntime, SharedState,
        cache::GameCache,
        command::Command,
        history::{History, HistoryEntry},
    },
};

/// Apply `command`, persist it and push it on the undo stack.
///
/// The caller must hold the runtime gate.
pub async fn record(
    state: &SharedState,
    runtime: &GameRuntime,
    actor: Uuid,
    command: Command,
) -> Result<(), ServiceError> {
    commit(state, runtime, |cache| {
        command.apply(cache).map_err(ServiceError::from)
    })
    .await?;

    let cache = runtime.cache().read().await;
    let mut history = runtime.history().lock().await;
    let entry = HistoryEntry::new(actor, command);
    let dto = HistoryEntryDto::new(&entry, &cache);
    history.push(entry);
    announce(runtime, &history, HistoryChange::Recorded, Some(dto));
    Ok(())
}

/// Revert the latest entry. The host may revert anyone's entry, players only their own.
pub async fn undo(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    let gate = runtime.gate().await;
    let is_host = runtime.cache().read().await.game().host_user_id == actor;
    let inverse = runtime
        .history()
        .lock()
        .await
        .authorize_undo(actor, is_host)?
        .command
        .invert();

    commit(state, &runtime, |cache| {
        inverse.apply(cache).map_err(ServiceError::from)
    })
    .await?;

    {
        let cache = runtime.cache().read().await;
        let mut history = runtime.history().lock().await;
        let dto = history
            .commit_undo()
            .map(|entry| HistoryEntryDto::new(entry, &cache));
        announce(&runtime, &history, HistoryChange::Undone, dto);
    }
    drop(gate);

    info!(%game_id, %actor, "history entry undone");
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

/// Replay the latest undone entry, with the same permission rule as undo.
pub async fn redo(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    let gate = runtime.gate().await;
    let is_host = runtime.cache().read().await.game().host_user_id == actor;
    let command = runtime
        .history()
        .lock()
        .await
        .authorize_redo(actor, is_host)?
        .command
        .clone();

    commit(state, &runtime, |cache| {
        command.apply(cache).map_err(ServiceError::from)
    })
    .await?;

    {
        let cache = runtime.cache().read().await;
        let mut history = runtime.history().lock().await;
        let dto = history
            .commit_redo()
            .map(|entry| HistoryEntryDto::new(entry, &cache));
        announce(&runtime, &history, HistoryChange::Redone, dto);
    }
    drop(gate);

    info!(%game_id, %actor, "history entry redone");
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

pub async fn list(state: &SharedState, game_id: Uuid) -> Result<HistoryListing, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    let cache = runtime.cache().read().await;
    let history = runtime.history().lock().await;
    Ok(listing(&history, &cache))
}

/// Drop both stacks, e.g. when the phase moves on.
pub async fn clear(runtime: &GameRuntime) {
    let mut history = runtime.history().lock().await;
    history.clear();
    announce(runtime, &history, HistoryChange::Cleared, None);
}

fn listing(history: &History, cache: &GameCache) -> HistoryListing {
    let to_dto = |entry: &HistoryEntry| HistoryEntryDto::new(entry, cache);
    HistoryListing {
        undo: history.undo_entries().iter().map(to_dto).collect(),
        redo: history.redo_entries().iter().map(to_dto).collect(),
    }
}

fn announce(
    runtime: &GameRuntime,
    history: &History,
    change: HistoryChange,
    entry: Option<HistoryEntryDto>,
) {
    let event = HistoryEvent {
        change,
        entry,
        undo_depth: history.undo_entries().len(),
        redo_depth: history.redo_entries().len(),
    };
    sse_events::broadcast_history(runtime.sse(), &event);
}
