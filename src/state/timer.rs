//! Per-player turn timers. Only the player holding the turn has a running timer.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::TimerEntity,
    state::{action, cache::GameCache, state_machine::GamePhase, strategy},
};

/// Player whose clock should be running, if any.
pub fn turn_holder(cache: &GameCache) -> Option<Uuid> {
    match cache.game().phase {
        GamePhase::Strategy => strategy::current_picker(cache),
        GamePhase::Action => action::current_player(cache),
        GamePhase::Status | GamePhase::Agenda => None,
    }
}

/// Accumulated time of a timer including its running stretch.
pub fn elapsed_ms(timer: &TimerEntity, now: SystemTime) -> u64 {
    timer.elapsed_ms + running_ms(timer, now)
}

fn running_ms(timer: &TimerEntity, now: SystemTime) -> u64 {
    timer
        .running_since
        .and_then(|since| now.duration_since(since).ok())
        .map(|stretch| stretch.as_millis() as u64)
        .unwrap_or_default()
}

/// Stop every timer but the turn holder's, starting theirs if needed.
pub fn follow_turn(cache: &mut GameCache, now: SystemTime) {
    let holder = turn_holder(cache);
    let game_id = cache.game().id;

    let missing: Vec<Uuid> = cache
        .players()
        .filter(|player| cache.timer(player.id).is_none())
        .map(|player| player.id)
        .collect();
    for player_id in missing {
        cache.upsert_timer(TimerEntity {
            game_id,
            player_id,
            elapsed_ms: 0,
            running_since: None,
        });
    }

    for timer in cache.timers_mut() {
        let should_run = Some(timer.player_id) == holder;
        match (timer.running_since, should_run) {
            (Some(_), false) => {
                let stretch = running_ms(timer, now);
                timer.elapsed_ms += stretch;
                timer.running_since = None;
            }
            (None, true) => timer.running_since = Some(now),
            _ => {}
        }
    }
}
