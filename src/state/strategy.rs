//! Strategy phase rules: speaker-relative pick order and trade-good bonuses.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::StrategyCard,
    dao::models::ActionStateEntity,
    state::{cache::GameCache, command::Command, state_machine::GamePhase},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("strategy cards can only be picked during the strategy phase, current phase is {0}")]
    WrongPhase(GamePhase),
    #[error("player `{0}` is not part of this game")]
    UnknownPlayer(Uuid),
    #[error("strategy card {0} does not exist")]
    UnknownCard(u8),
    #[error("strategy card {card} is already held by `{holder}`")]
    CardTaken { card: u8, holder: Uuid },
    #[error("player `{0}` already picked a strategy card this round")]
    AlreadyPicked(Uuid),
    #[error("it is not this player's turn to pick")]
    NotYourTurn { current: Option<Uuid> },
}

/// Pick order of the round: seats starting from the speaker.
pub fn turn_order(cache: &GameCache) -> Vec<Uuid> {
    let mut order: Vec<Uuid> = cache.players().map(|player| player.id).collect();
    if let Some(start) = cache
        .game()
        .speaker_id
        .and_then(|speaker| order.iter().position(|id| *id == speaker))
    {
        order.rotate_left(start);
    }
    order
}

/// Player expected to pick next: the first one in turn order still without a
/// card, `None` once everyone picked.
pub fn current_picker(cache: &GameCache) -> Option<Uuid> {
    turn_order(cache)
        .into_iter()
        .find(|player_id| cache.draft_pick(*player_id).is_none())
}

pub fn all_picked(cache: &GameCache) -> bool {
    cache.player_count() > 0 && cache.draft_picks().count() >= cache.player_count()
}

/// Trade goods accrued on `card` at the start of `round`: one per earlier round it went unpicked.
pub fn trade_good_bonus(cache: &GameCache, card: u8, round: u32) -> u32 {
    (1..round)
        .filter(|past| {
            !cache
                .selections_for_round(*past)
                .any(|selection| selection.card == card)
        })
        .count() as u32
}

/// Bonus shown next to a card in the running draft; a claimed card shows none.
pub fn displayed_bonus(cache: &GameCache, card: u8) -> u32 {
    if cache.draft_picks().any(|pick| pick.card == card) {
        0
    } else {
        trade_good_bonus(cache, card, cache.game().round)
    }
}

/// State of one strategy card during the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CardStatus {
    pub number: u8,
    pub name: String,
    pub picked_by: Option<Uuid>,
    pub trade_goods: u32,
}

pub fn card_board(cache: &GameCache, cards: &[StrategyCard]) -> Vec<CardStatus> {
    cards
        .iter()
        .map(|card| CardStatus {
            number: card.number,
            name: card.name.clone(),
            picked_by: cache
                .draft_picks()
                .find(|pick| pick.card == card.number)
                .map(|pick| pick.player_id),
            trade_goods: displayed_bonus(cache, card.number),
        })
        .collect()
}

/// Validate a pick and build the command recording it.
pub fn plan_pick(
    cache: &GameCache,
    cards: &[StrategyCard],
    player_id: Uuid,
    card: u8,
) -> Result<Command, StrategyError> {
    let phase = cache.game().phase;
    if phase != GamePhase::Strategy {
        return Err(StrategyError::WrongPhase(phase));
    }
    if cache.player(player_id).is_none() {
        return Err(StrategyError::UnknownPlayer(player_id));
    }
    if !cards.iter().any(|candidate| candidate.number == card) {
        return Err(StrategyError::UnknownCard(card));
    }
    if let Some(holder) = cache.draft_picks().find(|pick| pick.card == card) {
        return Err(StrategyError::CardTaken {
            card,
            holder: holder.player_id,
        });
    }
    if cache.draft_pick(player_id).is_some() {
        return Err(StrategyError::AlreadyPicked(player_id));
    }
    let current = current_picker(cache);
    if current != Some(player_id) {
        return Err(StrategyError::NotYourTurn { current });
    }

    let picks = cache.draft_picks().count();
    let round = cache.game().round;
    Ok(Command::PickStrategyCard {
        round,
        player_id,
        card,
        order: (picks + 1) as u8,
        trade_goods: trade_good_bonus(cache, card, round),
    })
}

/// Turn the draft into selection rows and open the action phase bookkeeping.
pub fn finalize_draft(cache: &mut GameCache) {
    let round = cache.game().round;
    let game_id = cache.game().id;
    for pick in cache.take_draft() {
        cache.insert_selection(pick);
    }
    let players: Vec<Uuid> = cache.players().map(|player| player.id).collect();
    for player_id in players {
        if cache.action_state(round, player_id).is_none() {
            cache.upsert_action_state(ActionStateEntity::fresh(game_id, round, player_id));
        }
    }
    cache.game_mut().action_turn_index = 0;
}

/// Drop every pick of the current round, restoring the carried-over bonuses.
pub fn reset_round(cache: &mut GameCache) {
    let round = cache.game().round;
    cache.take_draft();
    cache.clear_selections(round);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig, dao::models::SelectionEntity, state::cache::tests::sample_cache,
    };

    fn pick(cache: &mut GameCache, cards: &[StrategyCard], card: u8) -> Uuid {
        let player = current_picker(cache).unwrap();
        plan_pick(cache, cards, player, card)
            .unwrap()
            .apply(cache)
            .unwrap();
        player
    }

    fn seed_round(cache: &mut GameCache, round: u32, cards: &[u8]) {
        let game_id = cache.game().id;
        let players: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        for (index, (player_id, card)) in players.iter().zip(cards).enumerate() {
            cache.insert_selection(SelectionEntity {
                game_id,
                round,
                player_id: *player_id,
                card: *card,
                order: index as u8 + 1,
                trade_goods: 0,
            });
        }
    }

    #[test]
    fn order_starts_at_speaker_and_wraps() {
        let mut cache = sample_cache(4);
        let seats: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        cache.game_mut().speaker_id = Some(seats[2]);

        assert_eq!(turn_order(&cache), vec![seats[2], seats[3], seats[0], seats[1]]);
        assert_eq!(current_picker(&cache), Some(seats[2]));
    }

    #[test]
    fn picks_advance_the_current_picker_until_done() {
        let config = AppConfig::default();
        let mut cache = sample_cache(3);
        let order = turn_order(&cache);

        assert_eq!(pick(&mut cache, config.strategy_cards(), 5), order[0]);
        assert_eq!(current_picker(&cache), Some(order[1]));
        pick(&mut cache, config.strategy_cards(), 1);
        pick(&mut cache, config.strategy_cards(), 8);

        assert_eq!(current_picker(&cache), None);
        assert!(all_picked(&cache));
        let orders: Vec<u8> = cache.draft_picks().map(|p| p.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn speaker_change_mid_draft_skips_players_who_picked() {
        let config = AppConfig::default();
        let cards = config.strategy_cards();
        let mut cache = sample_cache(3);
        let seats: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        cache.game_mut().speaker_id = Some(seats[0]);
        pick(&mut cache, cards, 1);

        cache.game_mut().speaker_id = Some(seats[1]);
        assert_eq!(current_picker(&cache), Some(seats[1]));
        assert_eq!(pick(&mut cache, cards, 2), seats[1]);
        assert_eq!(pick(&mut cache, cards, 3), seats[2]);
        assert_eq!(current_picker(&cache), None);
        assert!(all_picked(&cache));
    }

    #[test]
    fn no_two_picks_share_card_or_player() {
        let config = AppConfig::default();
        let cards = config.strategy_cards();
        let mut cache = sample_cache(3);
        let first = pick(&mut cache, cards, 2);

        let next = current_picker(&cache).unwrap();
        assert_eq!(
            plan_pick(&cache, cards, next, 2).unwrap_err(),
            StrategyError::CardTaken {
                card: 2,
                holder: first
            }
        );
        assert_eq!(
            plan_pick(&cache, cards, first, 3).unwrap_err(),
            StrategyError::AlreadyPicked(first)
        );
    }

    #[test]
    fn out_of_turn_and_unknown_cards_are_refused() {
        let config = AppConfig::default();
        let cards = config.strategy_cards();
        let cache = sample_cache(3);
        let order = turn_order(&cache);

        assert_eq!(
            plan_pick(&cache, cards, order[1], 1).unwrap_err(),
            StrategyError::NotYourTurn {
                current: Some(order[0])
            }
        );
        assert_eq!(
            plan_pick(&cache, cards, order[0], 9).unwrap_err(),
            StrategyError::UnknownCard(9)
        );
    }

    #[test]
    fn bonus_counts_prior_rounds_without_the_card() {
        let mut cache = sample_cache(3);
        seed_round(&mut cache, 1, &[1, 2, 3]);
        seed_round(&mut cache, 2, &[1, 4, 5]);
        seed_round(&mut cache, 3, &[6, 7, 8]);

        assert_eq!(trade_good_bonus(&cache, 4, 1), 0);
        assert_eq!(trade_good_bonus(&cache, 4, 4), 2);
        assert_eq!(trade_good_bonus(&cache, 1, 4), 1);
        assert_eq!(trade_good_bonus(&cache, 8, 4), 2);
    }

    #[test]
    fn reset_restores_the_carried_bonus() {
        let config = AppConfig::default();
        let cards = config.strategy_cards();
        let mut cache = sample_cache(6);
        seed_round(&mut cache, 1, &[1, 2, 3, 5, 6, 7]);
        cache.game_mut().round = 2;

        assert_eq!(displayed_bonus(&cache, 4), 1);
        let player = current_picker(&cache).unwrap();
        let command = plan_pick(&cache, cards, player, 4).unwrap();
        assert!(matches!(
            command,
            Command::PickStrategyCard { trade_goods: 1, .. }
        ));
        command.apply(&mut cache).unwrap();
        assert_eq!(displayed_bonus(&cache, 4), 0);

        reset_round(&mut cache);
        assert_eq!(displayed_bonus(&cache, 4), 1);
        assert_eq!(current_picker(&cache), turn_order(&cache).first().copied());
    }

    #[test]
    fn finalize_persists_picks_and_opens_action_states() {
        let config = AppConfig::default();
        let mut cache = sample_cache(2);
        pick(&mut cache, config.strategy_cards(), 3);
        pick(&mut cache, config.strategy_cards(), 6);
        cache.game_mut().action_turn_index = 7;

        finalize_draft(&mut cache);

        assert_eq!(cache.draft_picks().count(), 0);
        assert_eq!(cache.selections_for_round(1).count(), 2);
        assert_eq!(cache.game().action_turn_index, 0);
        let ids: Vec<Uuid> = cache.players().map(|p| p.id).collect();
        for id in ids {
            assert!(!cache.action_state(1, id).unwrap().passed);
        }
    }
}
