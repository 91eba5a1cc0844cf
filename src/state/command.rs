//! Undoable game commands.
//!
//! Every command records the values it moves from and to, so the inverse is
//! obtained by swapping them and the history engine never needs to know which
//! kind of command it is replaying.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{dao::models::SelectionEntity, state::cache::GameCache};

/// Value transition carried by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Change<T> {
    pub before: T,
    pub after: T,
}

impl<T> Change<T> {
    pub fn new(before: T, after: T) -> Self {
        Self { before, after }
    }

    pub fn inverted(self) -> Self {
        Self {
            before: self.after,
            after: self.before,
        }
    }
}

impl<T: PartialEq + std::fmt::Debug> Change<T> {
    fn expect_current(&self, what: &'static str, current: &T) -> Result<(), CommandError> {
        if *current == self.before {
            Ok(())
        } else {
            Err(CommandError::Stale {
                what,
                expected: format!("{:?}", self.before),
                actual: format!("{current:?}"),
            })
        }
    }
}

/// Reasons a command cannot be applied to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("player `{0}` is not part of this game")]
    UnknownPlayer(Uuid),
    #[error("objective `{0}` does not exist")]
    UnknownObjective(Uuid),
    #[error("player `{player_id}` has no action state for round {round}")]
    MissingActionState { round: u32, player_id: Uuid },
    #[error("strategy card {card} is already claimed this round")]
    CardTaken { card: u8 },
    #[error("player `{0}` already picked a strategy card")]
    AlreadyPicked(Uuid),
    #[error("player `{player_id}` does not hold strategy card {card}")]
    CardNotHeld { player_id: Uuid, card: u8 },
    #[error("{what} changed in the meantime (expected {expected}, found {actual})")]
    Stale {
        what: &'static str,
        expected: String,
        actual: String,
    },
}

/// State change that can be applied to a game cache and inverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    PickStrategyCard {
        round: u32,
        player_id: Uuid,
        card: u8,
        order: u8,
        trade_goods: u32,
    },
    ReturnStrategyCard {
        round: u32,
        player_id: Uuid,
        card: u8,
        order: u8,
        trade_goods: u32,
    },
    TacticalAction {
        round: u32,
        player_id: Uuid,
        count: Change<u32>,
        turn_index: Change<u32>,
    },
    ComponentAction {
        round: u32,
        player_id: Uuid,
        count: Change<u32>,
        turn_index: Change<u32>,
    },
    StrategyCardAction {
        round: u32,
        player_id: Uuid,
        used: Change<bool>,
        turn_index: Change<u32>,
    },
    Pass {
        round: u32,
        player_id: Uuid,
        passed: Change<bool>,
        turn_index: Change<u32>,
    },
    ChangeSpeaker {
        speaker: Change<Option<Uuid>>,
    },
    ToggleObjective {
        objective_id: Uuid,
        player_id: Uuid,
        scored: Change<bool>,
        points: u32,
    },
    ClaimMecatol {
        owner: Change<Option<Uuid>>,
    },
    AdjustVictoryPoints {
        player_id: Uuid,
        points: Change<u32>,
    },
}

impl Command {
    /// Short machine-readable name of the command.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::PickStrategyCard { .. } => "pick_strategy_card",
            Command::ReturnStrategyCard { .. } => "return_strategy_card",
            Command::TacticalAction { .. } => "tactical_action",
            Command::ComponentAction { .. } => "component_action",
            Command::StrategyCardAction { .. } => "strategy_card_action",
            Command::Pass { .. } => "pass",
            Command::ChangeSpeaker { .. } => "change_speaker",
            Command::ToggleObjective { .. } => "toggle_objective",
            Command::ClaimMecatol { .. } => "claim_mecatol",
            Command::AdjustVictoryPoints { .. } => "adjust_victory_points",
        }
    }

    /// Human-readable one-liner used by the history listing.
    pub fn describe(&self, cache: &GameCache) -> String {
        let name = |id: Uuid| {
            cache
                .player(id)
                .map(|player| player.name.clone())
                .unwrap_or_else(|| id.to_string())
        };
        let optional = |id: Option<Uuid>| id.map(name).unwrap_or_else(|| "nobody".into());

        match self {
            Command::PickStrategyCard {
                player_id, card, ..
            } => format!("{} picked strategy card {card}", name(*player_id)),
            Command::ReturnStrategyCard {
                player_id, card, ..
            } => format!("{} returned strategy card {card}", name(*player_id)),
            Command::TacticalAction { player_id, .. } => {
                format!("{} took a tactical action", name(*player_id))
            }
            Command::ComponentAction { player_id, .. } => {
                format!("{} took a component action", name(*player_id))
            }
            Command::StrategyCardAction {
                player_id, used, ..
            } => {
                if used.after {
                    format!("{} used their strategy card", name(*player_id))
                } else {
                    format!("{} took back their strategy card action", name(*player_id))
                }
            }
            Command::Pass { player_id, passed, .. } => {
                if passed.after {
                    format!("{} passed", name(*player_id))
                } else {
                    format!("{} is back in the round", name(*player_id))
                }
            }
            Command::ChangeSpeaker { speaker } => {
                format!("speaker moved to {}", optional(speaker.after))
            }
            Command::ToggleObjective {
                objective_id,
                player_id,
                scored,
                ..
            } => {
                let objective = cache
                    .objective(*objective_id)
                    .map(|objective| objective.name.clone())
                    .unwrap_or_else(|| objective_id.to_string());
                if scored.after {
                    format!("{} scored {objective}", name(*player_id))
                } else {
                    format!("{} unscored {objective}", name(*player_id))
                }
            }
            Command::ClaimMecatol { owner } => {
                format!("Mecatol Rex claimed by {}", optional(owner.after))
            }
            Command::AdjustVictoryPoints { player_id, points } => format!(
                "{} victory points {} -> {}",
                name(*player_id),
                points.before,
                points.after
            ),
        }
    }

    /// Command undoing `self`.
    pub fn invert(&self) -> Command {
        match self.clone() {
            Command::PickStrategyCard {
                round,
                player_id,
                card,
                order,
                trade_goods,
            } => Command::ReturnStrategyCard {
                round,
                player_id,
                card,
                order,
                trade_goods,
            },
            Command::ReturnStrategyCard {
                round,
                player_id,
                card,
                order,
                trade_goods,
            } => Command::PickStrategyCard {
                round,
                player_id,
                card,
                order,
                trade_goods,
            },
            Command::TacticalAction {
                round,
                player_id,
                count,
                turn_index,
            } => Command::TacticalAction {
                round,
                player_id,
                count: count.inverted(),
                turn_index: turn_index.inverted(),
            },
            Command::ComponentAction {
                round,
                player_id,
                count,
                turn_index,
            } => Command::ComponentAction {
                round,
                player_id,
                count: count.inverted(),
                turn_index: turn_index.inverted(),
            },
            Command::StrategyCardAction {
                round,
                player_id,
                used,
                turn_index,
            } => Command::StrategyCardAction {
                round,
                player_id,
                used: used.inverted(),
                turn_index: turn_index.inverted(),
            },
            Command::Pass {
                round,
                player_id,
                passed,
                turn_index,
            } => Command::Pass {
                round,
                player_id,
                passed: passed.inverted(),
                turn_index: turn_index.inverted(),
            },
            Command::ChangeSpeaker { speaker } => Command::ChangeSpeaker {
                speaker: speaker.inverted(),
            },
            Command::ToggleObjective {
                objective_id,
                player_id,
                scored,
                points,
            } => Command::ToggleObjective {
                objective_id,
                player_id,
                scored: scored.inverted(),
                points,
            },
            Command::ClaimMecatol { owner } => Command::ClaimMecatol {
                owner: owner.inverted(),
            },
            Command::AdjustVictoryPoints { player_id, points } => Command::AdjustVictoryPoints {
                player_id,
                points: points.inverted(),
            },
        }
    }

    /// Apply the command to `cache`, refusing when the recorded starting values no longer hold.
    pub fn apply(&self, cache: &mut GameCache) -> Result<(), CommandError> {
        match self {
            Command::PickStrategyCard {
                round,
                player_id,
                card,
                order,
                trade_goods,
            } => {
                ensure_player(cache, *player_id)?;
                if cache.draft_pick(*player_id).is_some() {
                    return Err(CommandError::AlreadyPicked(*player_id));
                }
                if cache.draft_picks().any(|pick| pick.card == *card) {
                    return Err(CommandError::CardTaken { card: *card });
                }
                let game_id = cache.game().id;
                cache.insert_draft_pick(SelectionEntity {
                    game_id,
                    round: *round,
                    player_id: *player_id,
                    card: *card,
                    order: *order,
                    trade_goods: *trade_goods,
                });
            }
            Command::ReturnStrategyCard {
                player_id, card, ..
            } => {
                let held = cache.draft_pick(*player_id).map(|pick| pick.card);
                if held != Some(*card) {
                    return Err(CommandError::CardNotHeld {
                        player_id: *player_id,
                        card: *card,
                    });
                }
                cache.remove_draft_pick(*player_id);
            }
            Command::TacticalAction {
                round,
                player_id,
                count,
                turn_index,
            } => {
                turn_index.expect_current("turn index", &cache.game().action_turn_index)?;
                let state = action_state(cache, *round, *player_id)?;
                count.expect_current("tactical action count", &state.tactical_actions)?;
                state.tactical_actions = count.after;
                cache.game_mut().action_turn_index = turn_index.after;
            }
            Command::ComponentAction {
                round,
                player_id,
                count,
                turn_index,
            } => {
                turn_index.expect_current("turn index", &cache.game().action_turn_index)?;
                let state = action_state(cache, *round, *player_id)?;
                count.expect_current("component action count", &state.component_actions)?;
                state.component_actions = count.after;
                cache.game_mut().action_turn_index = turn_index.after;
            }
            Command::StrategyCardAction {
                round,
                player_id,
                used,
                turn_index,
            } => {
                turn_index.expect_current("turn index", &cache.game().action_turn_index)?;
                let state = action_state(cache, *round, *player_id)?;
                used.expect_current("strategy card use", &state.strategy_card_used)?;
                state.strategy_card_used = used.after;
                cache.game_mut().action_turn_index = turn_index.after;
            }
            Command::Pass {
                round,
                player_id,
                passed,
                turn_index,
            } => {
                turn_index.expect_current("turn index", &cache.game().action_turn_index)?;
                let state = action_state(cache, *round, *player_id)?;
                passed.expect_current("pass flag", &state.passed)?;
                state.passed = passed.after;
                cache.game_mut().action_turn_index = turn_index.after;
            }
            Command::ChangeSpeaker { speaker } => {
                if let Some(id) = speaker.after {
                    ensure_player(cache, id)?;
                }
                speaker.expect_current("speaker", &cache.game().speaker_id)?;
                cache.game_mut().speaker_id = speaker.after;
            }
            Command::ToggleObjective {
                objective_id,
                player_id,
                scored,
                points,
            } => {
                ensure_player(cache, *player_id)?;
                let objective = cache
                    .objective_mut(*objective_id)
                    .ok_or(CommandError::UnknownObjective(*objective_id))?;
                let currently = objective.scored_by.contains(player_id);
                scored.expect_current("objective score", &currently)?;
                if scored.after {
                    objective.scored_by.push(*player_id);
                } else {
                    objective.scored_by.retain(|id| id != player_id);
                }
                let player = player_mut(cache, *player_id)?;
                player.victory_points = if scored.after {
                    player.victory_points + points
                } else {
                    player.victory_points.saturating_sub(*points)
                };
            }
            Command::ClaimMecatol { owner } => {
                if let Some(id) = owner.after {
                    ensure_player(cache, id)?;
                }
                owner.expect_current("Mecatol Rex owner", &cache.game().mecatol_owner)?;
                // The custodians point follows the token.
                if let Some(previous) = owner.before {
                    let player = player_mut(cache, previous)?;
                    player.victory_points = player.victory_points.saturating_sub(1);
                }
                if let Some(next) = owner.after {
                    player_mut(cache, next)?.victory_points += 1;
                }
                cache.game_mut().mecatol_owner = owner.after;
            }
            Command::AdjustVictoryPoints { player_id, points } => {
                let player = player_mut(cache, *player_id)?;
                points.expect_current("victory points", &player.victory_points)?;
                player.victory_points = points.after;
            }
        }
        Ok(())
    }
}

fn ensure_player(cache: &GameCache, player_id: Uuid) -> Result<(), CommandError> {
    cache
        .player(player_id)
        .map(|_| ())
        .ok_or(CommandError::UnknownPlayer(player_id))
}

fn player_mut(
    cache: &mut GameCache,
    player_id: Uuid,
) -> Result<&mut crate::dao::models::PlayerEntity, CommandError> {
    cache
        .player_mut(player_id)
        .ok_or(CommandError::UnknownPlayer(player_id))
}

fn action_state(
    cache: &mut GameCache,
    round: u32,
    player_id: Uuid,
) -> Result<&mut crate::dao::models::ActionStateEntity, CommandError> {
    cache
        .action_state_mut(round, player_id)
        .ok_or(CommandError::MissingActionState { round, player_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{ActionStateEntity, ObjectiveEntity, ObjectiveStage},
        state::cache::tests::sample_cache,
    };

    fn prepared_cache() -> (GameCache, Vec<Uuid>) {
        let mut cache = sample_cache(3);
        let ids: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        let game_id = cache.game().id;
        for id in &ids {
            cache.upsert_action_state(ActionStateEntity::fresh(game_id, 1, *id));
        }
        cache.insert_objective(ObjectiveEntity {
            game_id,
            id: Uuid::nil(),
            name: "Expand Borders".into(),
            stage: ObjectiveStage::StageOne,
            points: 1,
            scored_by: Vec::new(),
        });
        (cache, ids)
    }

    fn every_kind(ids: &[Uuid]) -> Vec<Command> {
        vec![
            Command::PickStrategyCard {
                round: 1,
                player_id: ids[0],
                card: 4,
                order: 1,
                trade_goods: 0,
            },
            Command::TacticalAction {
                round: 1,
                player_id: ids[0],
                count: Change::new(0, 1),
                turn_index: Change::new(0, 1),
            },
            Command::ComponentAction {
                round: 1,
                player_id: ids[1],
                count: Change::new(0, 1),
                turn_index: Change::new(0, 1),
            },
            Command::StrategyCardAction {
                round: 1,
                player_id: ids[1],
                used: Change::new(false, true),
                turn_index: Change::new(0, 1),
            },
            Command::Pass {
                round: 1,
                player_id: ids[2],
                passed: Change::new(false, true),
                turn_index: Change::new(0, 0),
            },
            Command::ChangeSpeaker {
                speaker: Change::new(Some(ids[0]), Some(ids[2])),
            },
            Command::ToggleObjective {
                objective_id: Uuid::nil(),
                player_id: ids[1],
                scored: Change::new(false, true),
                points: 1,
            },
            Command::ClaimMecatol {
                owner: Change::new(None, Some(ids[2])),
            },
            Command::AdjustVictoryPoints {
                player_id: ids[0],
                points: Change::new(0, 3),
            },
        ]
    }

    #[test]
    fn invert_undoes_every_command_kind() {
        let (cache, ids) = prepared_cache();
        for command in every_kind(&ids) {
            let mut scratch = cache.clone();
            command.apply(&mut scratch).unwrap();
            assert_ne!(scratch, cache, "{} changed nothing", command.kind());

            let applied = scratch.clone();
            command.invert().apply(&mut scratch).unwrap();
            assert_eq!(scratch, cache, "{} did not revert", command.kind());

            command.apply(&mut scratch).unwrap();
            assert_eq!(scratch, applied, "{} did not replay", command.kind());
        }
    }

    #[test]
    fn double_invert_is_identity() {
        let (_, ids) = prepared_cache();
        for command in every_kind(&ids) {
            assert_eq!(command.invert().invert(), command);
        }
    }

    #[test]
    fn stale_command_is_refused() {
        let (mut cache, ids) = prepared_cache();
        let command = Command::AdjustVictoryPoints {
            player_id: ids[0],
            points: Change::new(5, 6),
        };
        let err = command.apply(&mut cache).unwrap_err();
        assert!(matches!(err, CommandError::Stale { .. }));
    }

    #[test]
    fn mecatol_moves_the_custodians_point() {
        let (mut cache, ids) = prepared_cache();
        Command::ClaimMecatol {
            owner: Change::new(None, Some(ids[0])),
        }
        .apply(&mut cache)
        .unwrap();
        Command::ClaimMecatol {
            owner: Change::new(Some(ids[0]), Some(ids[1])),
        }
        .apply(&mut cache)
        .unwrap();

        assert_eq!(cache.player(ids[0]).unwrap().victory_points, 0);
        assert_eq!(cache.player(ids[1]).unwrap().victory_points, 1);
        assert_eq!(cache.game().mecatol_owner, Some(ids[1]));
    }

    #[test]
    fn picking_a_claimed_card_fails() {
        let (mut cache, ids) = prepared_cache();
        let pick = |player_id, order| Command::PickStrategyCard {
            round: 1,
            player_id,
            card: 2,
            order,
            trade_goods: 0,
        };
        pick(ids[0], 1).apply(&mut cache).unwrap();
        assert_eq!(
            pick(ids[1], 2).apply(&mut cache).unwrap_err(),
            CommandError::CardTaken { card: 2 }
        );
    }
}
