//! In-process [`GameStore`] used for local play sessions and tests.

use std::{collections::BTreeMap, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        ActionStateEntity, ChangeEvent, ChangeOp, GameEntity, GameRecord, ObjectiveEntity,
        PlayerEntity, RowEntity, SelectionEntity, TimerEntity, round_player_key,
    },
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone)]
struct StoredGame {
    game: GameEntity,
    players: BTreeMap<Uuid, PlayerEntity>,
    selections: BTreeMap<String, SelectionEntity>,
    action_states: BTreeMap<String, ActionStateEntity>,
    objectives: BTreeMap<Uuid, ObjectiveEntity>,
    timers: BTreeMap<Uuid, TimerEntity>,
}

impl StoredGame {
    fn new(game: GameEntity) -> Self {
        Self {
            game,
            players: BTreeMap::new(),
            selections: BTreeMap::new(),
            action_states: BTreeMap::new(),
            objectives: BTreeMap::new(),
            timers: BTreeMap::new(),
        }
    }

    fn apply(&mut self, change: ChangeEvent) {
        let remove = change.op == ChangeOp::Delete;
        match change.row {
            RowEntity::Game(game) => self.game = game,
            RowEntity::Player(player) => upsert_or_remove(&mut self.players, player.id, player, remove),
            RowEntity::Selection(selection) => {
                let key = round_player_key(selection.round, selection.player_id);
                upsert_or_remove(&mut self.selections, key, selection, remove)
            }
            RowEntity::ActionState(state) => {
                let key = round_player_key(state.round, state.player_id);
                upsert_or_remove(&mut self.action_states, key, state, remove)
            }
            RowEntity::Objective(objective) => {
                upsert_or_remove(&mut self.objectives, objective.id, objective, remove)
            }
            RowEntity::Timer(timer) => upsert_or_remove(&mut self.timers, timer.player_id, timer, remove),
            RowEntity::DraftPick(_) => {}
        }
    }

    fn to_record(&self) -> GameRecord {
        let mut players: Vec<PlayerEntity> = self.players.values().cloned().collect();
        players.sort_by_key(|player| player.seat);
        GameRecord {
            game: self.game.clone(),
            players,
            selections: self.selections.values().cloned().collect(),
            action_states: self.action_states.values().cloned().collect(),
            objectives: self.objectives.values().cloned().collect(),
            timers: self.timers.values().cloned().collect(),
        }
    }
}

fn upsert_or_remove<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V, remove: bool) {
    if remove {
        map.remove(&key);
    } else {
        map.insert(key, value);
    }
}

/// Store keeping every game in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<DashMap<Uuid, StoredGame>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_batch(&self, game_id: Uuid, changes: Vec<ChangeEvent>) -> StorageResult<()> {
        let mut changes = changes
            .into_iter()
            .filter(|change| change.row.is_persistent())
            .peekable();
        if changes.peek().is_none() {
            return Ok(());
        }

        if let Some(mut stored) = self.games.get_mut(&game_id) {
            // Deleting the game row drops the whole game.
            let mut drop_game = false;
            for change in changes {
                if change.op == ChangeOp::Delete && matches!(change.row, RowEntity::Game(_)) {
                    drop_game = true;
                    continue;
                }
                stored.apply(change);
            }
            drop(stored);
            if drop_game {
                self.games.remove(&game_id);
            }
            return Ok(());
        }

        let mut game = None;
        let mut rest = Vec::new();
        for change in changes {
            let creates_game = game.is_none()
                && change.op != ChangeOp::Delete
                && matches!(change.row, RowEntity::Game(_));
            if !creates_game {
                rest.push(change);
                continue;
            }
            if let RowEntity::Game(row) = change.row {
                game = Some(row);
            }
        }
        let game = game.ok_or_else(|| {
            StorageError::Rejected(format!(
                "game `{game_id}` does not exist and the batch does not create it"
            ))
        })?;

        let mut stored = StoredGame::new(game);
        for change in rest {
            stored.apply(change);
        }
        self.games.insert(game_id, stored);
        Ok(())
    }
}

impl GameStore for MemoryGameStore {
    fn apply_changes(
        &self,
        game_id: Uuid,
        changes: Vec<ChangeEvent>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.apply_batch(game_id, changes);
        Box::pin(async move { result })
    }

    fn load_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let record = self.games.get(&id).map(|stored| stored.to_record());
        Box::pin(async move { Ok(record) })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let game = self
            .games
            .iter()
            .find(|entry| entry.game.join_code == code)
            .map(|entry| entry.game.clone());
        Box::pin(async move { Ok(game) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let mut games: Vec<GameEntity> = self.games.iter().map(|entry| entry.game.clone()).collect();
        games.sort_by_key(|game| game.created_at);
        Box::pin(async move { Ok(games) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let removed = self.games.remove(&id).is_some();
        Box::pin(async move { Ok(removed) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
