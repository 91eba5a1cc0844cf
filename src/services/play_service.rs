use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::ObjectiveEntity,
    dto::{
        game::GameSnapshot,
        phase::PhaseEnteredEvent,
        play::{
            ActionRequest, CreateObjectiveRequest, MecatolRequest, PickCardRequest, ScoreRequest,
            SpeakerRequest, ToggleObjectiveRequest,
        },
    },
    error::ServiceError,
    services::{
        commit::{commit, commit_within},
        game_service::{self, ensure_host, ensure_member, resolve_player},
        history_service, sse_events,
    },
    state::{
        SharedState,
        action::{self, ActionKind},
        cache::GameCache,
        command::{Change, Command},
        state_machine::{GamePhase, PhaseEvent},
        strategy,
    },
};

/// Plan an undoable command against the current cache, then record it.
async fn execute<F>(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    plan: F,
) -> Result<GameSnapshot, ServiceError>
where
    F: FnOnce(&GameCache) -> Result<Command, ServiceError>,
{
    let runtime = game_service::open_runtime(state, game_id).await?;
    let gate = runtime.gate().await;
    let command = plan(&*runtime.cache().read().await)?;
    history_service::record(state, &runtime, actor, command).await?;
    drop(gate);
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

fn changed<T: PartialEq>(change: Change<T>, what: &str) -> Result<Change<T>, ServiceError> {
    if change.before == change.after {
        Err(ServiceError::InvalidInput(format!("{what} is already set to that value")))
    } else {
        Ok(change)
    }
}

pub async fn pick_card(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    request: PickCardRequest,
) -> Result<GameSnapshot, ServiceError> {
    let cards = state.config().strategy_cards();
    execute(state, game_id, actor, |cache| {
        let player_id = resolve_player(cache, actor, request.player_id)?;
        Ok(strategy::plan_pick(cache, cards, player_id, request.card)?)
    })
    .await
}

pub async fn take_action(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    kind: ActionKind,
    request: ActionRequest,
) -> Result<GameSnapshot, ServiceError> {
    execute(state, game_id, actor, |cache| {
        let player_id = resolve_player(cache, actor, request.player_id)?;
        Ok(action::plan_action(cache, player_id, kind)?)
    })
    .await
}

pub async fn change_speaker(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    request: SpeakerRequest,
) -> Result<GameSnapshot, ServiceError> {
    execute(state, game_id, actor, |cache| {
        ensure_member(cache, actor)?;
        if let Some(player_id) = request.player_id {
            cache
                .player(player_id)
                .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))?;
        }
        let speaker = changed(
            Change::new(cache.game().speaker_id, request.player_id),
            "speaker",
        )?;
        Ok(Command::ChangeSpeaker { speaker })
    })
    .await
}

pub async fn toggle_objective(
    state: &SharedState,
    game_id: Uuid,
    objective_id: Uuid,
    actor: Uuid,
    request: ToggleObjectiveRequest,
) -> Result<GameSnapshot, ServiceError> {
    execute(state, game_id, actor, |cache| {
        let player_id = resolve_player(cache, actor, request.player_id)?;
        let objective = cache.objective(objective_id).ok_or_else(|| {
            ServiceError::NotFound(format!("objective `{objective_id}` not found"))
        })?;
        let scored = objective.scored_by.contains(&player_id);
        Ok(Command::ToggleObjective {
            objective_id,
            player_id,
            scored: Change::new(scored, !scored),
            points: objective.points,
        })
    })
    .await
}

/// Claim Mecatol Rex for a player, or hand the token back with `player_id: null`.
pub async fn claim_mecatol(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    request: MecatolRequest,
) -> Result<GameSnapshot, ServiceError> {
    execute(state, game_id, actor, |cache| {
        let current = cache.game().mecatol_owner;
        let owner = match request.player_id {
            Some(player_id) => Some(resolve_player(cache, actor, Some(player_id))?),
            None => {
                let holder = current.ok_or_else(|| {
                    ServiceError::InvalidState("Mecatol Rex is not claimed".into())
                })?;
                resolve_player(cache, actor, Some(holder))?;
                None
            }
        };
        let owner = changed(Change::new(current, owner), "Mecatol Rex owner")?;
        Ok(Command::ClaimMecatol { owner })
    })
    .await
}

pub async fn adjust_score(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    request: ScoreRequest,
) -> Result<GameSnapshot, ServiceError> {
    execute(state, game_id, actor, |cache| {
        let player_id = resolve_player(cache, actor, request.player_id)?;
        let current = cache
            .player(player_id)
            .map(|player| player.victory_points)
            .unwrap_or_default();
        let points = changed(
            Change::new(current, request.victory_points),
            "victory points",
        )?;
        Ok(Command::AdjustVictoryPoints { player_id, points })
    })
    .await
}

/// Reveal an objective. Not undoable.
pub async fn create_objective(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
    request: CreateObjectiveRequest,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    let gate = runtime.gate().await;
    ensure_member(&*runtime.cache().read().await, actor)?;

    let (objective_id, _) = commit(state, &runtime, |cache| {
        let name = request.name.trim();
        if cache
            .objectives()
            .any(|objective| objective.name.eq_ignore_ascii_case(name))
        {
            return Err(ServiceError::InvalidInput(format!(
                "objective `{name}` is already on the table"
            )));
        }
        let objective = ObjectiveEntity {
            game_id,
            id: Uuid::new_v4(),
            name: name.to_string(),
            stage: request.stage,
            points: request.points,
            scored_by: Vec::new(),
        };
        let id = objective.id;
        cache.insert_objective(objective);
        Ok(id)
    })
    .await?;
    drop(gate);

    info!(%game_id, %objective_id, "objective revealed");
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

/// Throw away every pick of the round and restart the draft. Host only, not undoable.
pub async fn reset_strategy(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    ensure_host(&*runtime.cache().read().await, actor)?;

    let runtime_ref = &*runtime;
    runtime
        .run_transition(PhaseEvent::ResetStrategy, |_| async move {
            commit_within(state, runtime_ref, runtime_ref.transition_timeout(), |cache| {
                strategy::reset_round(cache);
                Ok(())
            })
            .await?;
            history_service::clear(runtime_ref).await;
            Ok(())
        })
        .await?;

    info!(%game_id, "strategy phase reset");
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

/// Close the current phase and open the next one. Host only, not undoable.
///
/// Leaving the strategy phase needs every player to hold a card and turns the
/// draft into persisted selections; leaving the action phase needs every
/// player to have passed.
pub async fn advance_phase(
    state: &SharedState,
    game_id: Uuid,
    actor: Uuid,
) -> Result<GameSnapshot, ServiceError> {
    let runtime = game_service::open_runtime(state, game_id).await?;
    ensure_host(&*runtime.cache().read().await, actor)?;

    let runtime_ref = &*runtime;
    let ((), cursor) = runtime
        .run_transition(PhaseEvent::Advance, |to| async move {
            let limit = runtime_ref.transition_timeout();
            let (started_at, _) = commit_within(state, runtime_ref, limit, move |cache| {
                let leaving = cache.game().phase;
                match leaving {
                    GamePhase::Strategy => {
                        if !strategy::all_picked(cache) {
                            return Err(ServiceError::InvalidState(
                                "every player must pick a strategy card first".into(),
                            ));
                        }
                        strategy::finalize_draft(cache);
                    }
                    GamePhase::Action => {
                        if !action::all_passed(cache) {
                            return Err(ServiceError::InvalidState(
                                "every player must pass before the action phase ends".into(),
                            ));
                        }
                    }
                    GamePhase::Status | GamePhase::Agenda => {}
                }

                let now = SystemTime::now();
                let game = cache.game_mut();
                game.round = to.round;
                game.phase = to.phase;
                game.phase_started_at = now;
                game.updated_at = now;
                Ok(now)
            })
            .await?;

            history_service::clear(runtime_ref).await;
            if runtime_ref.session().lock().await.take_entry_cue(to) {
                sse_events::broadcast_phase_entered(
                    runtime_ref.sse(),
                    &PhaseEnteredEvent::new(to, started_at),
                );
            }
            Ok(())
        })
        .await?;

    info!(%game_id, round = cursor.round, phase = %cursor.phase, "phase advanced");
    Ok(game_service::build_snapshot(state, &runtime, actor).await)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{game_store::GameStore, models::ObjectiveStage},
        dto::game::{CreateGameRequest, JoinGameRequest, PlayerInput},
        services::commit::tests::flaky_state_with,
        state::round::RoundCursor,
    };

    struct Table {
        state: SharedState,
        store: crate::services::commit::tests::FlakyStore,
        game_id: Uuid,
        /// Users in seat order; the first one hosts.
        users: Vec<Uuid>,
        /// Player ids in seat order.
        seats: Vec<Uuid>,
    }

    impl Table {
        fn host(&self) -> Uuid {
            self.users[0]
        }

        fn user_of(&self, player: Uuid) -> Uuid {
            let index = self.seats.iter().position(|id| *id == player).unwrap();
            self.users[index]
        }
    }

    async fn table(players: usize) -> Table {
        table_with(players, AppConfig::default()).await
    }

    async fn table_with(players: usize, config: AppConfig) -> Table {
        let (state, store) = flaky_state_with(config).await;
        let users: Vec<Uuid> = (0..players).map(|_| Uuid::new_v4()).collect();
        let created = game_service::create_game(
            &state,
            users[0],
            CreateGameRequest {
                name: "Test table".into(),
                host: PlayerInput {
                    name: "Player 0".into(),
                    faction: "Faction 0".into(),
                    color: "red".into(),
                },
                victory_point_goal: None,
            },
        )
        .await
        .unwrap();

        let mut snapshot = created.clone();
        for (seat, user) in users.iter().enumerate().skip(1) {
            snapshot = game_service::join_game(
                &state,
                *user,
                JoinGameRequest {
                    join_code: created.join_code.clone(),
                    player: PlayerInput {
                        name: format!("Player {seat}"),
                        faction: format!("Faction {seat}"),
                        color: "blue".into(),
                    },
                },
            )
            .await
            .unwrap();
        }

        Table {
            state,
            store,
            game_id: created.id,
            users,
            seats: snapshot.players.iter().map(|p| p.id).collect(),
        }
    }

    async fn pick(table: &Table, card: u8) -> GameSnapshot {
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        let picker = snapshot.strategy.current_picker.unwrap();
        pick_card(
            &table.state,
            table.game_id,
            table.user_of(picker),
            PickCardRequest {
                player_id: None,
                card,
            },
        )
        .await
        .unwrap()
    }

    async fn act(table: &Table, kind: ActionKind) -> Result<GameSnapshot, ServiceError> {
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        let current = snapshot.action.current_player.unwrap();
        take_action(
            &table.state,
            table.game_id,
            table.user_of(current),
            kind,
            ActionRequest::default(),
        )
        .await
    }

    /// Three players holding cards 5, 2 and 7 in seat order, in the action phase.
    async fn action_table() -> Table {
        let table = table(3).await;
        for card in [5, 2, 7] {
            pick(&table, card).await;
        }
        advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        table
    }

    #[tokio::test]
    async fn picks_follow_speaker_order_and_show_bonus() {
        let table = table(3).await;
        let snapshot = pick(&table, 4).await;

        assert_eq!(snapshot.strategy.current_picker, Some(table.seats[1]));
        let card = snapshot.strategy.cards.iter().find(|c| c.number == 4).unwrap();
        assert_eq!(card.picked_by, Some(table.seats[0]));
        assert_eq!(card.trade_goods, 0);
        assert_eq!(snapshot.players[0].strategy_card, Some(4));
        assert!(snapshot.players[1].timer_running);
        assert!(!snapshot.players[0].timer_running);
        assert_eq!(snapshot.history.undo_depth, 1);
        // Two joins and the pick.
        assert_eq!(snapshot.revision, 3);
    }

    #[tokio::test]
    async fn speaker_change_mid_draft_keeps_the_draft_moving() {
        let table = table(3).await;
        pick(&table, 1).await;
        let snapshot = change_speaker(
            &table.state,
            table.game_id,
            table.host(),
            SpeakerRequest {
                player_id: Some(table.seats[1]),
            },
        )
        .await
        .unwrap();
        assert_eq!(snapshot.strategy.current_picker, Some(table.seats[1]));

        pick(&table, 2).await;
        let snapshot = pick(&table, 3).await;
        assert_eq!(snapshot.strategy.current_picker, None);
        let cards: Vec<Option<u8>> = snapshot.players.iter().map(|p| p.strategy_card).collect();
        assert_eq!(cards, vec![Some(1), Some(2), Some(3)]);

        let snapshot = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.cursor.phase, GamePhase::Action);
    }

    #[tokio::test]
    async fn out_of_turn_pick_is_forbidden() {
        let table = table(3).await;
        let err = pick_card(
            &table.state,
            table.game_id,
            table.users[2],
            PickCardRequest {
                player_id: None,
                card: 1,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn players_cannot_act_for_other_seats() {
        let table = table(3).await;
        let err = pick_card(
            &table.state,
            table.game_id,
            table.users[1],
            PickCardRequest {
                player_id: Some(table.seats[0]),
                card: 1,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        // The host may drive any seat.
        pick_card(
            &table.state,
            table.game_id,
            table.host(),
            PickCardRequest {
                player_id: Some(table.seats[0]),
                card: 1,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn leaving_strategy_requires_every_pick() {
        let table = table(3).await;
        pick(&table, 1).await;
        let err = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let runtime = game_service::open_runtime(&table.state, table.game_id)
            .await
            .unwrap();
        let snapshot = runtime.machine_snapshot().await;
        assert_eq!(snapshot.cursor, RoundCursor::first());
        assert_eq!(snapshot.pending, None);
    }

    #[tokio::test]
    async fn advancing_persists_the_draft_and_clears_history() {
        let table = action_table().await;
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();

        assert_eq!(snapshot.cursor.phase, GamePhase::Action);
        assert_eq!(snapshot.history.undo_depth, 0);
        assert_eq!(
            snapshot.action.active_players,
            vec![table.seats[1], table.seats[0], table.seats[2]]
        );

        let stored = table
            .store
            .load_game(table.game_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.selections.len(), 3);
        assert_eq!(stored.action_states.len(), 3);
        assert_eq!(stored.game.phase, GamePhase::Action);
    }

    #[tokio::test]
    async fn slow_store_times_out_the_advance_and_keeps_the_phase() {
        let config = AppConfig::default().with_transition_timeout(Some(Duration::from_millis(20)));
        let table = table_with(3, config).await;
        for card in [5, 2, 7] {
            pick(&table, card).await;
        }
        table.store.slow_writes(Duration::from_millis(200));

        let err = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));

        let runtime = game_service::open_runtime(&table.state, table.game_id)
            .await
            .unwrap();
        assert_eq!(runtime.machine_snapshot().await.pending, None);
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.cursor, RoundCursor::first());
        assert_eq!(snapshot.history.undo_depth, 3);
        let stored = table
            .store
            .load_game(table.game_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.game.phase, GamePhase::Strategy);

        table.store.slow_writes(Duration::ZERO);
        let snapshot = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.cursor.phase, GamePhase::Action);
    }

    #[tokio::test]
    async fn advancing_clears_history_before_releasing_the_gate() {
        let table = table(3).await;
        for card in [5, 2, 7] {
            pick(&table, card).await;
        }
        let runtime = game_service::open_runtime(&table.state, table.game_id)
            .await
            .unwrap();
        let runtime_ref = &*runtime;

        // Hold the history so the transition stops right before clearing it.
        let history = runtime.history().lock().await;
        let check = async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let gate = tokio::time::timeout(Duration::from_millis(100), runtime_ref.gate()).await;
            let gate_was_closed = gate.is_err();
            drop(gate);
            drop(history);
            gate_was_closed
        };
        let (advanced, gate_was_closed) = tokio::join!(
            advance_phase(&table.state, table.game_id, table.host()),
            check
        );

        assert!(gate_was_closed);
        let snapshot = advanced.unwrap();
        assert_eq!(snapshot.cursor.phase, GamePhase::Action);
        assert_eq!(snapshot.history.undo_depth, 0);
        assert!(runtime.history().lock().await.undo_entries().is_empty());
    }

    #[tokio::test]
    async fn only_the_host_advances() {
        let table = table(2).await;
        let err = advance_phase(&table.state, table.game_id, table.users[1])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn action_phase_ends_only_after_everyone_passed() {
        let table = action_table().await;
        let err = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        for _ in 0..3 {
            act(&table, ActionKind::StrategyCard).await.unwrap();
        }
        for _ in 0..3 {
            act(&table, ActionKind::Pass).await.unwrap();
        }
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert!(snapshot.action.all_passed);
        assert_eq!(snapshot.action.current_player, None);
        assert!(snapshot.players.iter().all(|p| !p.timer_running));

        let snapshot = advance_phase(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.cursor.phase, GamePhase::Status);
    }

    #[tokio::test]
    async fn full_cycle_reaches_the_next_round_with_bonuses() {
        let table = action_table().await;
        for _ in 0..3 {
            act(&table, ActionKind::StrategyCard).await.unwrap();
        }
        for _ in 0..3 {
            act(&table, ActionKind::Pass).await.unwrap();
        }
        for _ in 0..3 {
            advance_phase(&table.state, table.game_id, table.host())
                .await
                .unwrap();
        }

        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(
            snapshot.cursor,
            RoundCursor {
                round: 2,
                phase: GamePhase::Strategy
            }
        );
        let bonus = |number: u8| {
            snapshot
                .strategy
                .cards
                .iter()
                .find(|card| card.number == number)
                .unwrap()
                .trade_goods
        };
        assert_eq!(bonus(5), 0);
        assert_eq!(bonus(1), 1);
    }

    #[tokio::test]
    async fn reset_restarts_the_draft() {
        let table = table(3).await;
        pick(&table, 3).await;
        pick(&table, 6).await;

        let err = reset_strategy(&table.state, table.game_id, table.users[1])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let snapshot = reset_strategy(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert!(snapshot.strategy.cards.iter().all(|c| c.picked_by.is_none()));
        assert_eq!(snapshot.strategy.current_picker, Some(table.seats[0]));
        assert_eq!(snapshot.history.undo_depth, 0);
    }

    #[tokio::test]
    async fn undo_and_redo_respect_authorship() {
        let table = table(3).await;
        pick(&table, 2).await;
        pick(&table, 5).await;

        // Seat 2 cannot undo seat 1's pick; seat 1 and the host can.
        let guest = table.users[2];
        let err = history_service::undo(&table.state, table.game_id, guest)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let snapshot = history_service::undo(&table.state, table.game_id, table.users[1])
            .await
            .unwrap();
        assert_eq!(snapshot.strategy.current_picker, Some(table.seats[1]));
        assert_eq!(snapshot.history.redo_depth, 1);

        let snapshot = history_service::redo(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.players[1].strategy_card, Some(5));
        assert_eq!(snapshot.history.undo_depth, 2);
        assert_eq!(snapshot.history.redo_depth, 0);

        let listing = history_service::list(&table.state, table.game_id)
            .await
            .unwrap();
        assert_eq!(listing.undo.len(), 2);
        assert_eq!(listing.undo[1].kind, "pick_strategy_card");
    }

    #[tokio::test]
    async fn undo_restores_the_turn_after_an_action() {
        let table = action_table().await;
        act(&table, ActionKind::Tactical).await.unwrap();

        let snapshot = history_service::undo(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.action.current_player, Some(table.seats[1]));
        assert_eq!(snapshot.action.turn_index, 0);
        let state = snapshot
            .action
            .states
            .iter()
            .find(|s| s.player_id == table.seats[1])
            .unwrap();
        assert_eq!(state.tactical_actions, 0);
    }

    #[tokio::test]
    async fn failed_write_leaves_history_and_state_untouched() {
        let table = table(3).await;
        pick(&table, 2).await;
        table.store.fail_writes(true);

        let err = history_service::undo(&table.state, table.game_id, table.host())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        table.store.fail_writes(false);
        let snapshot = game_service::get_snapshot(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.history.undo_depth, 1);
        assert_eq!(snapshot.history.redo_depth, 0);
        assert_eq!(snapshot.players[0].strategy_card, Some(2));
    }

    #[tokio::test]
    async fn objectives_and_mecatol_move_points() {
        let table = table(2).await;
        let snapshot = create_objective(
            &table.state,
            table.game_id,
            table.host(),
            CreateObjectiveRequest {
                name: "Expand Borders".into(),
                stage: ObjectiveStage::StageOne,
                points: 1,
            },
        )
        .await
        .unwrap();
        let objective = snapshot.objectives[0].id;

        let guest = table.users[1];
        let snapshot = toggle_objective(
            &table.state,
            table.game_id,
            objective,
            guest,
            ToggleObjectiveRequest { player_id: None },
        )
        .await
        .unwrap();
        assert_eq!(snapshot.players[1].victory_points, 1);
        assert_eq!(snapshot.objectives[0].scored_by, vec![table.seats[1]]);

        let snapshot = claim_mecatol(
            &table.state,
            table.game_id,
            guest,
            MecatolRequest {
                player_id: Some(table.seats[1]),
            },
        )
        .await
        .unwrap();
        assert_eq!(snapshot.players[1].victory_points, 2);
        assert_eq!(snapshot.mecatol_owner, Some(table.seats[1]));

        let board = game_service::scoreboard(&table.state, table.game_id)
            .await
            .unwrap();
        assert_eq!(board.entries[0].player_id, table.seats[1]);
        assert_eq!(board.entries[0].objectives, vec!["Expand Borders".to_string()]);

        let snapshot = history_service::undo(&table.state, table.game_id, guest)
            .await
            .unwrap();
        assert_eq!(snapshot.players[1].victory_points, 1);
        assert_eq!(snapshot.mecatol_owner, None);
    }

    #[tokio::test]
    async fn speaker_and_score_changes_are_undoable() {
        let table = table(3).await;
        let snapshot = change_speaker(
            &table.state,
            table.game_id,
            table.host(),
            SpeakerRequest {
                player_id: Some(table.seats[2]),
            },
        )
        .await
        .unwrap();
        assert_eq!(snapshot.strategy.turn_order[0], table.seats[2]);

        let snapshot = adjust_score(
            &table.state,
            table.game_id,
            table.users[1],
            ScoreRequest {
                player_id: None,
                victory_points: 4,
            },
        )
        .await
        .unwrap();
        assert_eq!(snapshot.players[1].victory_points, 4);

        let err = adjust_score(
            &table.state,
            table.game_id,
            table.users[1],
            ScoreRequest {
                player_id: None,
                victory_points: 4,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        history_service::undo(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        let snapshot = history_service::undo(&table.state, table.game_id, table.host())
            .await
            .unwrap();
        assert_eq!(snapshot.players[1].victory_points, 0);
        assert_eq!(snapshot.speaker_id, Some(table.seats[0]));
    }
}
