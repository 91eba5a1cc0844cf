//! Keyed in-memory mirror of every row of one open game.
//!
//! The cache only moves forward by applying [`ChangeEvent`]s, the same events
//! delivered on the realtime feed. Services mutate a scratch clone and call
//! [`GameCache::diff`] to obtain the events describing their change.

use std::hash::Hash;

use indexmap::IndexMap;
use tokio::sync::{RwLock, RwLockReadGuard, watch};
use uuid::Uuid;

use crate::dao::models::{
    ActionStateEntity, ChangeEvent, ChangeOp, GameEntity, GameRecord, ObjectiveEntity,
    PlayerEntity, RowEntity, SelectionEntity, TimerEntity,
};
use crate::state::round::RoundCursor;

type RoundPlayer = (u32, Uuid);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameCache {
    game: GameEntity,
    players: IndexMap<Uuid, PlayerEntity>,
    draft: IndexMap<Uuid, SelectionEntity>,
    selections: IndexMap<RoundPlayer, SelectionEntity>,
    action_states: IndexMap<RoundPlayer, ActionStateEntity>,
    objectives: IndexMap<Uuid, ObjectiveEntity>,
    timers: IndexMap<Uuid, TimerEntity>,
}

impl GameCache {
    /// Build the cache from rows loaded out of the store.
    pub fn from_record(record: GameRecord) -> Self {
        let GameRecord {
            game,
            mut players,
            selections,
            action_states,
            objectives,
            timers,
        } = record;
        players.sort_by_key(|player| player.seat);

        Self {
            game,
            players: players.into_iter().map(|p| (p.id, p)).collect(),
            draft: IndexMap::new(),
            selections: selections
                .into_iter()
                .map(|s| ((s.round, s.player_id), s))
                .collect(),
            action_states: action_states
                .into_iter()
                .map(|s| ((s.round, s.player_id), s))
                .collect(),
            objectives: objectives.into_iter().map(|o| (o.id, o)).collect(),
            timers: timers.into_iter().map(|t| (t.player_id, t)).collect(),
        }
    }

    /// Persistent rows of the cache; draft picks are left out.
    pub fn to_record(&self) -> GameRecord {
        GameRecord {
            game: self.game.clone(),
            players: self.players.values().cloned().collect(),
            selections: self.selections.values().cloned().collect(),
            action_states: self.action_states.values().cloned().collect(),
            objectives: self.objectives.values().cloned().collect(),
            timers: self.timers.values().cloned().collect(),
        }
    }

    /// Apply one row change. Game deletions are handled by the owner of the cache.
    pub fn apply(&mut self, change: &ChangeEvent) {
        let remove = change.op == ChangeOp::Delete;
        match &change.row {
            RowEntity::Game(game) => {
                if !remove {
                    self.game = game.clone();
                }
            }
            RowEntity::Player(player) => {
                upsert_or_remove(&mut self.players, player.id, player, remove);
                self.players.sort_by(|_, a, _, b| a.seat.cmp(&b.seat));
            }
            RowEntity::DraftPick(pick) => {
                upsert_or_remove(&mut self.draft, pick.player_id, pick, remove)
            }
            RowEntity::Selection(selection) => upsert_or_remove(
                &mut self.selections,
                (selection.round, selection.player_id),
                selection,
                remove,
            ),
            RowEntity::ActionState(state) => upsert_or_remove(
                &mut self.action_states,
                (state.round, state.player_id),
                state,
                remove,
            ),
            RowEntity::Objective(objective) => {
                upsert_or_remove(&mut self.objectives, objective.id, objective, remove)
            }
            RowEntity::Timer(timer) => {
                upsert_or_remove(&mut self.timers, timer.player_id, timer, remove)
            }
        }
    }

    /// Row changes turning `self` into `next`.
    pub fn diff(&self, next: &GameCache) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        if self.game != next.game {
            events.push(ChangeEvent::update(RowEntity::Game(next.game.clone())));
        }
        diff_table(&self.players, &next.players, RowEntity::Player, &mut events);
        diff_table(&self.draft, &next.draft, RowEntity::DraftPick, &mut events);
        diff_table(
            &self.selections,
            &next.selections,
            RowEntity::Selection,
            &mut events,
        );
        diff_table(
            &self.action_states,
            &next.action_states,
            RowEntity::ActionState,
            &mut events,
        );
        diff_table(
            &self.objectives,
            &next.objectives,
            RowEntity::Objective,
            &mut events,
        );
        diff_table(&self.timers, &next.timers, RowEntity::Timer, &mut events);
        events
    }

    pub fn game(&self) -> &GameEntity {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut GameEntity {
        &mut self.game
    }

    pub fn cursor(&self) -> RoundCursor {
        RoundCursor {
            round: self.game.round,
            phase: self.game.phase,
        }
    }

    /// Players ordered by seat.
    pub fn players(&self) -> impl Iterator<Item = &PlayerEntity> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, id: Uuid) -> Option<&PlayerEntity> {
        self.players.get(&id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut PlayerEntity> {
        self.players.get_mut(&id)
    }

    /// Player seat held by a user account.
    pub fn player_for_user(&self, user_id: Uuid) -> Option<&PlayerEntity> {
        self.players.values().find(|player| player.user_id == user_id)
    }

    pub fn add_player(&mut self, player: PlayerEntity) {
        self.players.insert(player.id, player);
        self.players.sort_by(|_, a, _, b| a.seat.cmp(&b.seat));
    }

    /// Picks made so far in the running strategy phase, in pick order.
    pub fn draft_picks(&self) -> impl Iterator<Item = &SelectionEntity> {
        self.draft.values()
    }

    pub fn draft_pick(&self, player_id: Uuid) -> Option<&SelectionEntity> {
        self.draft.get(&player_id)
    }

    pub fn insert_draft_pick(&mut self, pick: SelectionEntity) {
        self.draft.insert(pick.player_id, pick);
    }

    pub fn remove_draft_pick(&mut self, player_id: Uuid) -> Option<SelectionEntity> {
        self.draft.shift_remove(&player_id)
    }

    /// Drain the draft, handing back the picks in pick order.
    pub fn take_draft(&mut self) -> Vec<SelectionEntity> {
        self.draft.drain(..).map(|(_, pick)| pick).collect()
    }

    /// Persisted selections of a round.
    pub fn selections_for_round(&self, round: u32) -> impl Iterator<Item = &SelectionEntity> {
        self.selections
            .values()
            .filter(move |selection| selection.round == round)
    }

    /// Strategy card held by a player in `round`, from the draft or the persisted rows.
    pub fn card_of(&self, round: u32, player_id: Uuid) -> Option<u8> {
        self.selections
            .get(&(round, player_id))
            .or_else(|| {
                self.draft
                    .get(&player_id)
                    .filter(|pick| pick.round == round)
            })
            .map(|selection| selection.card)
    }

    pub fn insert_selection(&mut self, selection: SelectionEntity) {
        self.selections
            .insert((selection.round, selection.player_id), selection);
    }

    /// Remove every persisted selection of `round`.
    pub fn clear_selections(&mut self, round: u32) {
        self.selections.retain(|(r, _), _| *r != round);
    }

    pub fn action_state(&self, round: u32, player_id: Uuid) -> Option<&ActionStateEntity> {
        self.action_states.get(&(round, player_id))
    }

    pub fn action_state_mut(
        &mut self,
        round: u32,
        player_id: Uuid,
    ) -> Option<&mut ActionStateEntity> {
        self.action_states.get_mut(&(round, player_id))
    }

    pub fn upsert_action_state(&mut self, state: ActionStateEntity) {
        self.action_states
            .insert((state.round, state.player_id), state);
    }

    pub fn objectives(&self) -> impl Iterator<Item = &ObjectiveEntity> {
        self.objectives.values()
    }

    pub fn objective(&self, id: Uuid) -> Option<&ObjectiveEntity> {
        self.objectives.get(&id)
    }

    pub fn objective_mut(&mut self, id: Uuid) -> Option<&mut ObjectiveEntity> {
        self.objectives.get_mut(&id)
    }

    pub fn insert_objective(&mut self, objective: ObjectiveEntity) {
        self.objectives.insert(objective.id, objective);
    }

    pub fn timers(&self) -> impl Iterator<Item = &TimerEntity> {
        self.timers.values()
    }

    pub fn timer(&self, player_id: Uuid) -> Option<&TimerEntity> {
        self.timers.get(&player_id)
    }

    pub fn timers_mut(&mut self) -> impl Iterator<Item = &mut TimerEntity> {
        self.timers.values_mut()
    }

    pub fn upsert_timer(&mut self, timer: TimerEntity) {
        self.timers.insert(timer.player_id, timer);
    }
}

fn upsert_or_remove<K, V>(map: &mut IndexMap<K, V>, key: K, value: &V, remove: bool)
where
    K: Hash + Eq,
    V: Clone,
{
    if remove {
        map.shift_remove(&key);
    } else {
        map.insert(key, value.clone());
    }
}

fn diff_table<K, V>(
    before: &IndexMap<K, V>,
    after: &IndexMap<K, V>,
    wrap: fn(V) -> RowEntity,
    events: &mut Vec<ChangeEvent>,
) where
    K: Hash + Eq,
    V: Clone + PartialEq,
{
    for (key, row) in after {
        match before.get(key) {
            None => events.push(ChangeEvent::insert(wrap(row.clone()))),
            Some(previous) if previous != row => {
                events.push(ChangeEvent::update(wrap(row.clone())))
            }
            Some(_) => {}
        }
    }
    for (key, row) in before {
        if !after.contains_key(key) {
            events.push(ChangeEvent::delete(wrap(row.clone())));
        }
    }
}

/// Observable cache shared between the request handlers of one game.
///
/// Every applied batch bumps a revision counter that observers can watch.
pub struct SharedCache {
    cache: RwLock<GameCache>,
    revision: watch::Sender<u64>,
}

impl SharedCache {
    pub fn new(cache: GameCache) -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            cache: RwLock::new(cache),
            revision,
        }
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, GameCache> {
        self.cache.read().await
    }

    /// Owned copy used as the scratch space of a command.
    pub async fn snapshot(&self) -> GameCache {
        self.cache.read().await.clone()
    }

    /// Apply confirmed changes in order, then notify observers once.
    pub async fn apply_all(&self, changes: &[ChangeEvent]) {
        if changes.is_empty() {
            return;
        }
        {
            let mut cache = self.cache.write().await;
            for change in changes {
                cache.apply(change);
            }
        }
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Number of batches applied since the game was opened.
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
