//! Action phase turn cycling over the players that have not passed yet.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::{
    cache::GameCache,
    command::{Change, Command},
    state_machine::GamePhase,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("actions can only be taken during the action phase, current phase is {0}")]
    WrongPhase(GamePhase),
    #[error("player `{0}` is not part of this game")]
    UnknownPlayer(Uuid),
    #[error("every player has passed; only ending the phase is possible")]
    EveryonePassed,
    #[error("it is not this player's turn")]
    NotYourTurn { current: Uuid },
    #[error("player `{0}` has no action state for this round")]
    MissingActionState(Uuid),
    #[error("the strategy card was already used this round")]
    StrategyCardUsed,
    #[error("a player must use their strategy card before passing")]
    StrategyCardUnused,
}

/// Kind of turn a player takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Tactical,
    Component,
    StrategyCard,
    Pass,
}

/// Players still in the round, in ascending strategy card order.
pub fn active_players(cache: &GameCache) -> Vec<Uuid> {
    let round = cache.game().round;
    let mut active: Vec<(u8, Uuid)> = cache
        .players()
        .filter(|player| {
            cache
                .action_state(round, player.id)
                .is_none_or(|state| !state.passed)
        })
        .map(|player| {
            let card = cache.card_of(round, player.id).unwrap_or(u8::MAX);
            (card, player.id)
        })
        .collect();
    // Stable sort keeps seat order for players without a card.
    active.sort_by_key(|(card, _)| *card);
    active.into_iter().map(|(_, id)| id).collect()
}

/// Player whose turn it is, `None` once every player passed.
pub fn current_player(cache: &GameCache) -> Option<Uuid> {
    let active = active_players(cache);
    if active.is_empty() {
        return None;
    }
    let index = cache.game().action_turn_index as usize % active.len();
    Some(active[index])
}

pub fn all_passed(cache: &GameCache) -> bool {
    active_players(cache).is_empty()
}

/// Which controls a player may use right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActionControls {
    pub tactical: bool,
    pub component: bool,
    pub strategy_card: bool,
    pub pass: bool,
    pub end_phase: bool,
}

pub fn controls(cache: &GameCache, player_id: Uuid) -> ActionControls {
    if cache.game().phase != GamePhase::Action {
        return ActionControls::default();
    }
    let Some(current) = current_player(cache) else {
        return ActionControls {
            end_phase: true,
            ..ActionControls::default()
        };
    };
    if current != player_id {
        return ActionControls::default();
    }

    let used = cache
        .action_state(cache.game().round, player_id)
        .is_some_and(|state| state.strategy_card_used);
    ActionControls {
        tactical: true,
        component: true,
        strategy_card: !used,
        pass: used,
        end_phase: false,
    }
}

/// Validate a turn and build the command recording it.
pub fn plan_action(
    cache: &GameCache,
    player_id: Uuid,
    kind: ActionKind,
) -> Result<Command, ActionError> {
    let game = cache.game();
    if game.phase != GamePhase::Action {
        return Err(ActionError::WrongPhase(game.phase));
    }
    if cache.player(player_id).is_none() {
        return Err(ActionError::UnknownPlayer(player_id));
    }
    let current = current_player(cache).ok_or(ActionError::EveryonePassed)?;
    if current != player_id {
        return Err(ActionError::NotYourTurn { current });
    }

    let round = game.round;
    let state = cache
        .action_state(round, player_id)
        .ok_or(ActionError::MissingActionState(player_id))?;
    let index = game.action_turn_index;
    let next_turn = Change::new(index, index + 1);

    let command = match kind {
        ActionKind::Tactical => Command::TacticalAction {
            round,
            player_id,
            count: Change::new(state.tactical_actions, state.tactical_actions + 1),
            turn_index: next_turn,
        },
        ActionKind::Component => Command::ComponentAction {
            round,
            player_id,
            count: Change::new(state.component_actions, state.component_actions + 1),
            turn_index: next_turn,
        },
        ActionKind::StrategyCard => {
            if state.strategy_card_used {
                return Err(ActionError::StrategyCardUsed);
            }
            Command::StrategyCardAction {
                round,
                player_id,
                used: Change::new(false, true),
                turn_index: next_turn,
            }
        }
        // The index settles on the passer's slot; once they leave the active
        // list that slot belongs to whoever followed them.
        ActionKind::Pass => {
            if !state.strategy_card_used {
                return Err(ActionError::StrategyCardUnused);
            }
            let active = active_players(cache).len() as u32;
            Command::Pass {
                round,
                player_id,
                passed: Change::new(false, true),
                turn_index: Change::new(index, index % active),
            }
        }
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{
            cache::tests::sample_cache,
            strategy::{current_picker, finalize_draft, plan_pick},
        },
    };

    /// Three players in the action phase holding cards 5, 2 and 7 in seat order.
    fn action_cache() -> (GameCache, Vec<Uuid>) {
        let config = AppConfig::default();
        let mut cache = sample_cache(3);
        for card in [5, 2, 7] {
            let player = current_picker(&cache).unwrap();
            plan_pick(&cache, config.strategy_cards(), player, card)
                .unwrap()
                .apply(&mut cache)
                .unwrap();
        }
        finalize_draft(&mut cache);
        cache.game_mut().phase = GamePhase::Action;
        let seats: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        (cache, seats)
    }

    fn take(cache: &mut GameCache, player: Uuid, kind: ActionKind) {
        plan_action(cache, player, kind)
            .unwrap()
            .apply(cache)
            .unwrap();
    }

    #[test]
    fn initiative_order_follows_card_numbers() {
        let (cache, seats) = action_cache();
        assert_eq!(active_players(&cache), vec![seats[1], seats[0], seats[2]]);
        assert_eq!(current_player(&cache), Some(seats[1]));
    }

    #[test]
    fn actions_rotate_through_active_players() {
        let (mut cache, seats) = action_cache();
        take(&mut cache, seats[1], ActionKind::Tactical);
        assert_eq!(current_player(&cache), Some(seats[0]));
        take(&mut cache, seats[0], ActionKind::Component);
        assert_eq!(current_player(&cache), Some(seats[2]));
        take(&mut cache, seats[2], ActionKind::StrategyCard);
        assert_eq!(current_player(&cache), Some(seats[1]));
        assert_eq!(cache.action_state(1, seats[1]).unwrap().tactical_actions, 1);
    }

    #[test]
    fn passing_skips_the_player_without_removing_rows() {
        let (mut cache, seats) = action_cache();
        take(&mut cache, seats[1], ActionKind::StrategyCard);
        take(&mut cache, seats[0], ActionKind::Tactical);
        take(&mut cache, seats[2], ActionKind::Tactical);
        // Back to seat 1, who already used their card and passes.
        take(&mut cache, seats[1], ActionKind::Pass);

        assert_eq!(active_players(&cache), vec![seats[0], seats[2]]);
        assert_eq!(current_player(&cache), Some(seats[0]));
        assert!(cache.action_state(1, seats[1]).is_some());
        assert_eq!(
            plan_action(&cache, seats[1], ActionKind::Tactical).unwrap_err(),
            ActionError::NotYourTurn { current: seats[0] }
        );

        take(&mut cache, seats[0], ActionKind::Tactical);
        assert_eq!(current_player(&cache), Some(seats[2]));
    }

    #[test]
    fn last_in_initiative_passing_wraps_to_the_first() {
        let (mut cache, seats) = action_cache();
        for player in [seats[1], seats[0], seats[2]] {
            take(&mut cache, player, ActionKind::StrategyCard);
        }
        take(&mut cache, seats[1], ActionKind::Tactical);
        take(&mut cache, seats[0], ActionKind::Tactical);
        assert_eq!(current_player(&cache), Some(seats[2]));

        take(&mut cache, seats[2], ActionKind::Pass);
        assert_eq!(active_players(&cache), vec![seats[1], seats[0]]);
        assert_eq!(current_player(&cache), Some(seats[1]));
        take(&mut cache, seats[1], ActionKind::Tactical);
        assert_eq!(current_player(&cache), Some(seats[0]));
    }

    #[test]
    fn undoing_a_pass_restores_the_turn() {
        let (mut cache, seats) = action_cache();
        take(&mut cache, seats[1], ActionKind::StrategyCard);
        take(&mut cache, seats[0], ActionKind::Tactical);
        take(&mut cache, seats[2], ActionKind::Tactical);
        let before = cache.clone();

        let pass = plan_action(&cache, seats[1], ActionKind::Pass).unwrap();
        pass.apply(&mut cache).unwrap();
        pass.invert().apply(&mut cache).unwrap();

        assert_eq!(cache, before);
        assert_eq!(current_player(&cache), Some(seats[1]));
    }

    #[test]
    fn pass_requires_used_strategy_card() {
        let (cache, seats) = action_cache();
        assert_eq!(
            plan_action(&cache, seats[1], ActionKind::Pass).unwrap_err(),
            ActionError::StrategyCardUnused
        );
    }

    #[test]
    fn strategy_card_is_used_once_per_round() {
        let (mut cache, seats) = action_cache();
        take(&mut cache, seats[1], ActionKind::StrategyCard);
        take(&mut cache, seats[0], ActionKind::Tactical);
        take(&mut cache, seats[2], ActionKind::Tactical);
        assert_eq!(
            plan_action(&cache, seats[1], ActionKind::StrategyCard).unwrap_err(),
            ActionError::StrategyCardUsed
        );
    }

    #[test]
    fn all_passed_leaves_only_end_phase() {
        let (mut cache, seats) = action_cache();
        let round = cache.game().round;
        for id in &seats {
            let state = cache.action_state_mut(round, *id).unwrap();
            state.strategy_card_used = true;
            state.passed = true;
        }

        assert!(all_passed(&cache));
        assert_eq!(current_player(&cache), None);
        for id in &seats {
            assert_eq!(
                controls(&cache, *id),
                ActionControls {
                    end_phase: true,
                    ..ActionControls::default()
                }
            );
        }
        assert_eq!(
            plan_action(&cache, seats[0], ActionKind::Tactical).unwrap_err(),
            ActionError::EveryonePassed
        );
    }

    #[test]
    fn controls_reflect_strategy_card_use() {
        let (mut cache, seats) = action_cache();
        assert_eq!(
            controls(&cache, seats[1]),
            ActionControls {
                tactical: true,
                component: true,
                strategy_card: true,
                pass: false,
                end_phase: false
            }
        );
        assert_eq!(controls(&cache, seats[0]), ActionControls::default());

        take(&mut cache, seats[1], ActionKind::StrategyCard);
        take(&mut cache, seats[0], ActionKind::Tactical);
        take(&mut cache, seats[2], ActionKind::Tactical);
        let now = controls(&cache, seats[1]);
        assert!(now.pass);
        assert!(!now.strategy_card);
    }
}
