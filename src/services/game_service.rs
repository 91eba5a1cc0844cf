use std::{sync::Arc, time::SystemTime};

use rand::{Rng, rng};
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{GameEntity, GameRecord, PlayerEntity},
    dto::{
        game::{
            ActionStateSummary, ActionView, CreateGameRequest, GameListItem, GameSnapshot,
            HistoryStatus, JoinGameRequest, ObjectiveSummary, PlayerInput, PlayerSummary,
            ScoreEntry, Scoreboard, StrategyView,
        },
        validation::{JOIN_CODE_ALPHABET, JOIN_CODE_LENGTH},
    },
    error::ServiceError,
    services::{commit::commit, sse_events},
    state::{
        GameRuntime, SharedState, action,
        cache::GameCache,
        state_machine::GamePhase,
        strategy, timer,
    },
};

const JOIN_CODE_ATTEMPTS: usize = 16;

/// Open a new table; the requesting user becomes host, seat 0 and speaker.
pub async fn create_game(
    state: &SharedState,
    actor: Uuid,
    request: CreateGameRequest,
) -> Result<GameSnapshot, ServiceError> {
    let store = state.require_game_store().await?;
    let join_code = unique_join_code(state).await?;

    let CreateGameRequest {
        name,
        host,
        victory_point_goal,
    } = request;
    let now = SystemTime::now();
    let game_id = Uuid::new_v4();
    let host_player = new_player(game_id, actor, host, 0);
    let game = GameEntity {
        id: game_id,
        name: name.trim().to_string(),
        join_code,
        host_user_id: actor,
        round: 1,
        phase: GamePhase::first(),
        phase_started_at: now,
        speaker_id: Some(host_player.id),
        mecatol_owner: None,
        action_turn_index: 0,
        victory_point_goal: victory_point_goal.unwrap_or(state.config().victory_point_goal()),
        created_at: now,
        updated_at: now,
    };

    let mut cache = GameCache::from_record(GameRecord {
        game,
        players: vec![host_player],
        selections: Vec::new(),
        action_states: Vec::new(),
        objectives: Vec::new(),
        timers: Vec::new(),
    });
    timer::follow_turn(&mut cache, now);

    store
        .apply_changes(game_id, cache.to_record().into_inserts())
        .await?;

    let runtime = Arc::new(GameRuntime::new(cache, state.config().transition_timeout()));
    state.runtimes().insert(game_id, runtime.clone());
    info!(%game_id, host = %actor, "game created");

    Ok(build_snapshot(state, &runtime, actor).await)
}

/// Seat the requesting user at the game behind `join_code`.
///
/// Joining is only possible before the first pick of round 1. A user that
/// already holds a seat simply gets the snapshot back.
pub async fn join_game(
    state: &SharedState,
    actor: Uuid,
    request: JoinGameRequest,
) -> Result<GameSnapshot, ServiceError> {
    let store = state.require_game_store().await?;
    let code = request.join_code.trim().to_ascii_uppercase();
    let Some(game) = store.find_game_by_code(code.clone()).await? else {
        return Err(ServiceError::NotFound(format!("no game uses join code `{code}`")));
    };

    let runtime = open_runtime(state, game.id).await?;
    let max_players = state.config().max_players();
    let player = request.player;

    let gate = runtime.gate().await;
    let (seated, _) = commit(state, &runtime, |cache| {
        if let Some(existing) = cache.player_for_user(actor) {
            return Ok(existing.id);
        }
        let game = cache.game();
        if game.round != 1
            || game.phase != GamePhase::Strategy
            || cache.draft_picks().next().is_some()
        {
            return Err(ServiceError::InvalidState(
                "players can only join before the first strategy pick".into(),
            ));
        }
        if cache.player_count() >= max_players {
            return Err(ServiceError::InvalidState(format!(
                "the table is full ({max_players} players)"
            )));
        }
        let faction = player.faction.trim();
        if cache
            .players()
            .any(|seated| seated.faction.eq_ignore_ascii_case(faction))
        {
            return Err(ServiceError::InvalidInput(format!(
                "faction `{faction}` is already taken"
            )));
        }

        let seat = cache.players().map(|p| p.seat + 1).max().unwrap_or(0);
        let entity = new_player(game.id, actor, player, seat);
        let id = entity.id;
        cache.add_player(entity);
        Ok(id)
    })
    .await?;
    drop(gate);

    info!(game_id = %game.id, user = %actor, player = %seated, "player seated");
    Ok(build_snapshot(state, &runtime, actor).await)
}

fn new_player(game_id: Uuid, user_id: Uuid, input: PlayerInput, seat: u32) -> PlayerEntity {
    PlayerEntity {
        game_id,
        id: Uuid::new_v4(),
        user_id,
        name: input.name.trim().to_string(),
        faction: input.faction.trim().to_string(),
        color: input.color.trim().to_string(),
        seat,
        victory_points: 0,
    }
}

async fn unique_join_code(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_game_store().await?;
    for _ in 0..JOIN_CODE_ATTEMPTS {
        let code = generate_join_code();
        if store.find_game_by_code(code.clone()).await?.is_none() {
            return Ok(code);
        }
    }
    Err(ServiceError::InvalidState(
        "could not find a free join code".into(),
    ))
}

fn generate_join_code() -> String {
    let alphabet = JOIN_CODE_ALPHABET.as_bytes();
    let mut rng = rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}

/// Runtime of an open game, loading it from the store on first use.
pub async fn open_runtime(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Arc<GameRuntime>, ServiceError> {
    if let Some(runtime) = state.runtimes().get(&game_id) {
        return Ok(runtime.value().clone());
    }

    let store = state.require_game_store().await?;
    let Some(record) = store.load_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    let loaded = Arc::new(GameRuntime::new(
        GameCache::from_record(record),
        state.config().transition_timeout(),
    ));
    // Another request may have loaded it meanwhile; keep whichever got in first.
    let runtime = state
        .runtimes()
        .entry(game_id)
        .or_insert(loaded)
        .value()
        .clone();
    info!(%game_id, "game loaded into memory");
    Ok(runtime)
}

pub async fn list_games(state: &SharedState) -> Result<Vec<GameListItem>, ServiceError> {
    let store = state.require_game_store().await?;
    let mut games = store.list_games().await?;
    games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(games.into_iter().map(GameListItem::from).collect())
}

pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<GameListItem, ServiceError> {
    let runtime = open_runtime(state, game_id).await?;
    let game = runtime.cache().read().await.game().clone();
    Ok(game.into())
}

pub async fn get_snapshot(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = open_runtime(state, game_id).await?;
    Ok(build_snapshot(state, &runtime, actor).await)
}

/// Remove a game and every row it owns. Host only.
pub async fn delete_game(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<(), ServiceError> {
    let runtime = open_runtime(state, game_id).await?;
    let gate = runtime.gate().await;
    ensure_host(&*runtime.cache().read().await, actor)?;

    let store = state.require_game_store().await?;
    if !store.delete_game(game_id).await? {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }
    state.runtimes().remove(&game_id);
    drop(gate);

    sse_events::broadcast_info(runtime.sse(), "game deleted");
    info!(%game_id, "game deleted");
    Ok(())
}

pub async fn scoreboard(state: &SharedState, game_id: Uuid) -> Result<Scoreboard, ServiceError> {
    let runtime = open_runtime(state, game_id).await?;
    let cache = runtime.cache().read().await;
    Ok(build_scoreboard(&cache))
}

/// Players ranked by victory points, seat order breaking ties.
pub fn build_scoreboard(cache: &GameCache) -> Scoreboard {
    let game = cache.game();
    let mut entries: Vec<ScoreEntry> = cache
        .players()
        .map(|player| ScoreEntry {
            player_id: player.id,
            name: player.name.clone(),
            faction: player.faction.clone(),
            victory_points: player.victory_points,
            objectives: cache
                .objectives()
                .filter(|objective| objective.scored_by.contains(&player.id))
                .map(|objective| objective.name.clone())
                .collect(),
            holds_mecatol: game.mecatol_owner == Some(player.id),
        })
        .collect();
    entries.sort_by(|a, b| b.victory_points.cmp(&a.victory_points));

    let winner = entries
        .first()
        .filter(|leader| leader.victory_points >= game.victory_point_goal)
        .map(|leader| leader.player_id);

    Scoreboard {
        victory_point_goal: game.victory_point_goal,
        entries,
        winner,
    }
}

/// Full view of the game for `actor`.
pub async fn build_snapshot(
    state: &SharedState,
    runtime: &GameRuntime,
    actor: Uuid,
) -> GameSnapshot {
    let cache = runtime.cache().read().await;
    let history = runtime.history().lock().await;
    let now = SystemTime::now();
    let game = cache.game();
    let round = game.round;
    let is_host = game.host_user_id == actor;

    let players = cache
        .players()
        .map(|player| {
            let card = cache
                .draft_pick(player.id)
                .map(|pick| pick.card)
                .or_else(|| cache.card_of(round, player.id));
            let timer = cache.timer(player.id);
            PlayerSummary::new(
                player,
                game,
                card,
                timer.map(|t| timer::elapsed_ms(t, now)).unwrap_or_default(),
                timer.is_some_and(|t| t.running_since.is_some()),
            )
        })
        .collect();

    let strategy = StrategyView {
        turn_order: strategy::turn_order(&cache),
        current_picker: strategy::current_picker(&cache),
        all_picked: strategy::all_picked(&cache),
        cards: strategy::card_board(&cache, state.config().strategy_cards()),
    };

    let action = ActionView {
        active_players: action::active_players(&cache),
        current_player: action::current_player(&cache),
        turn_index: game.action_turn_index,
        all_passed: game.phase == GamePhase::Action && action::all_passed(&cache),
        states: cache
            .players()
            .filter_map(|player| cache.action_state(round, player.id))
            .map(ActionStateSummary::from)
            .collect(),
    };

    let controls = cache
        .player_for_user(actor)
        .filter(|_| game.phase == GamePhase::Action)
        .map(|player| action::controls(&cache, player.id));

    GameSnapshot {
        id: game.id,
        name: game.name.clone(),
        join_code: game.join_code.clone(),
        host_user_id: game.host_user_id,
        revision: runtime.cache().revision(),
        cursor: cache.cursor(),
        phase_started_at: crate::dto::format_system_time(game.phase_started_at),
        speaker_id: game.speaker_id,
        mecatol_owner: game.mecatol_owner,
        victory_point_goal: game.victory_point_goal,
        players,
        strategy,
        action,
        objectives: cache.objectives().map(ObjectiveSummary::from).collect(),
        history: HistoryStatus {
            undo_depth: history.undo_entries().len(),
            redo_depth: history.redo_entries().len(),
            can_undo: history.can_undo(actor, is_host),
            can_redo: history.can_redo(actor, is_host),
        },
        controls,
    }
}

pub fn ensure_host(cache: &GameCache, actor: Uuid) -> Result<(), ServiceError> {
    if cache.game().host_user_id == actor {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "only the host may do this".into(),
        ))
    }
}

/// Seat `actor` acts for: `requested` when they own it or host the game, else their own seat.
pub fn resolve_player(
    cache: &GameCache,
    actor: Uuid,
    requested: Option<Uuid>,
) -> Result<Uuid, ServiceError> {
    let is_host = cache.game().host_user_id == actor;
    match requested {
        Some(player_id) => {
            let player = cache
                .player(player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))?;
            if is_host || player.user_id == actor {
                Ok(player_id)
            } else {
                Err(ServiceError::Forbidden(
                    "players may only act for their own seat".into(),
                ))
            }
        }
        None => cache
            .player_for_user(actor)
            .map(|player| player.id)
            .ok_or_else(|| ServiceError::Forbidden("user has no seat at this game".into())),
    }
}

/// Refuse users that neither host nor sit at the game.
pub fn ensure_member(cache: &GameCache, actor: Uuid) -> Result<(), ServiceError> {
    if cache.game().host_user_id == actor || cache.player_for_user(actor).is_some() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "user has no seat at this game".into(),
        ))
    }
}
