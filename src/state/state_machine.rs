use std::{fmt, time::Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::round::RoundCursor;

/// Phases of a round, in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players pick strategy cards in speaker order.
    Strategy,
    /// Players take turns in initiative order until everyone passed.
    Action,
    /// Objectives are scored and cards refreshed.
    Status,
    /// Laws are voted on.
    Agenda,
}

const PHASE_CYCLE: [GamePhase; 4] = [
    GamePhase::Strategy,
    GamePhase::Action,
    GamePhase::Status,
    GamePhase::Agenda,
];

impl GamePhase {
    /// Phase every round starts with.
    pub fn first() -> Self {
        PHASE_CYCLE[0]
    }

    /// Following phase in the fixed cycle, wrapping after the agenda phase.
    pub fn next(self) -> Self {
        let index = PHASE_CYCLE
            .iter()
            .position(|phase| *phase == self)
            .unwrap_or_default();
        PHASE_CYCLE[(index + 1) % PHASE_CYCLE.len()]
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Strategy => "strategy",
            GamePhase::Action => "action",
            GamePhase::Status => "status",
            GamePhase::Agenda => "agenda",
        };
        f.write_str(name)
    }
}

/// Events that can be applied to the phase machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Close the current phase and open the next one.
    Advance,
    /// Throw away every strategy pick of the round and start the draft over.
    ResetStrategy,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// Cursor the machine was at when the invalid event was received.
    pub from: RoundCursor,
    /// The event that cannot be applied from this cursor.
    pub event: PhaseEvent,
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current cursor.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// Cursor changed since the plan was created.
    CursorMismatch {
        /// Cursor when the plan was created.
        expected: RoundCursor,
        /// Current cursor.
        actual: RoundCursor,
    },
    /// Version changed since the plan was created.
    VersionMismatch {
        /// Version when the plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned transition.
pub type PlanId = Uuid;

/// A transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Cursor the machine is currently at.
    pub from: RoundCursor,
    /// Cursor the machine will move to.
    pub to: RoundCursor,
    /// Event that triggered this transition.
    pub event: PhaseEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the phase machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current cursor.
    pub cursor: RoundCursor,
    /// Version number (increments on each transition).
    pub version: usize,
    /// Target cursor of the pending transition, if any.
    pub pending: Option<RoundCursor>,
}

/// Round/phase progression of one game.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    cursor: RoundCursor,
    version: usize,
    pending: Option<Plan>,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(RoundCursor::first())
    }
}

impl PhaseMachine {
    /// Create a machine resuming at `cursor`.
    pub fn new(cursor: RoundCursor) -> Self {
        Self {
            cursor,
            version: 0,
            pending: None,
        }
    }

    pub fn cursor(&self) -> RoundCursor {
        self.cursor
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            cursor: self.cursor,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Validate that `event` can be applied and reserve the transition.
    pub fn plan(&mut self, event: PhaseEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.cursor,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, returning the new cursor.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<RoundCursor, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.cursor != plan.from {
            return Err(ApplyError::CursorMismatch {
                expected: plan.from,
                actual: self.cursor,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.cursor = plan.to;
        self.version = plan.version_next;

        Ok(self.cursor)
    }

    /// Drop a planned transition without applying it.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    fn compute_transition(&self, event: PhaseEvent) -> Result<RoundCursor, InvalidTransition> {
        match (self.cursor.phase, event) {
            (_, PhaseEvent::Advance) => Ok(self.cursor.advance()),
            (GamePhase::Strategy, PhaseEvent::ResetStrategy) => Ok(self.cursor),
            _ => Err(InvalidTransition {
                from: self.cursor,
                event,
            }),
        }
    }
}
