use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::state_machine::GamePhase;

/// Position of a game inside its round/phase cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RoundCursor {
    /// Current round, starting at 1.
    pub round: u32,
    /// Phase inside the round.
    pub phase: GamePhase,
}

impl RoundCursor {
    /// Cursor of a freshly created game.
    pub fn first() -> Self {
        Self {
            round: 1,
            phase: GamePhase::Strategy,
        }
    }

    /// Cursor after the current phase ends; leaving the agenda phase opens a new round.
    pub fn advance(self) -> Self {
        let phase = self.phase.next();
        let round = if phase == GamePhase::first() {
            self.round + 1
        } else {
            self.round
        };
        Self { round, phase }
    }
}

impl Default for RoundCursor {
    fn default() -> Self {
        Self::first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_increments_round_once() {
        let mut cursor = RoundCursor::first();
        let mut visited = Vec::new();
        for _ in 0..4 {
            visited.push(cursor.phase);
            cursor = cursor.advance();
        }

        assert_eq!(
            visited,
            vec![
                GamePhase::Strategy,
                GamePhase::Action,
                GamePhase::Status,
                GamePhase::Agenda
            ]
        );
        assert_eq!(
            cursor,
            RoundCursor {
                round: 2,
                phase: GamePhase::Strategy
            }
        );
    }

    #[test]
    fn intra_round_advance_keeps_round() {
        let cursor = RoundCursor {
            round: 3,
            phase: GamePhase::Action,
        };
        assert_eq!(cursor.advance().round, 3);
        assert_eq!(cursor.advance().phase, GamePhase::Status);
    }
}
