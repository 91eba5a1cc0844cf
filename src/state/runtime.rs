//! Live state of one open game.

use std::{future::Future, time::Duration};

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::{
        AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot,
        cache::{GameCache, SharedCache},
        history::History,
        round::RoundCursor,
        session::PhaseSession,
        sse::SseHub,
        state_machine::{PhaseEvent, PhaseMachine},
    },
};

const SSE_CAPACITY: usize = 64;

/// Everything the server keeps in memory for a game while it is open.
///
/// Commands and phase transitions of one game are serialized through
/// [`GameRuntime::gate`]; different games proceed independently.
pub struct GameRuntime {
    game_id: Uuid,
    cache: SharedCache,
    machine: RwLock<PhaseMachine>,
    history: Mutex<History>,
    session: Mutex<PhaseSession>,
    sse: SseHub,
    gate: Mutex<()>,
    transition_timeout: Option<Duration>,
}

impl GameRuntime {
    pub fn new(cache: GameCache, transition_timeout: Option<Duration>) -> Self {
        let cursor = cache.cursor();
        Self {
            game_id: cache.game().id,
            cache: SharedCache::new(cache),
            machine: RwLock::new(PhaseMachine::new(cursor)),
            history: Mutex::new(History::new()),
            session: Mutex::new(PhaseSession::new(cursor)),
            sse: SseHub::new(SSE_CAPACITY),
            gate: Mutex::new(()),
            transition_timeout,
        }
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    pub fn history(&self) -> &Mutex<History> {
        &self.history
    }

    pub fn session(&self) -> &Mutex<PhaseSession> {
        &self.session
    }

    /// Broadcast hub of the game's realtime feed.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Serialize a command against every other write to this game.
    pub async fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Upper bound for the store write of a phase transition.
    pub fn transition_timeout(&self) -> Option<Duration> {
        self.transition_timeout
    }

    pub async fn machine_snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    async fn plan_transition(&self, event: PhaseEvent) -> Result<Plan, PlanError> {
        let mut machine = self.machine.write().await;
        machine.plan(event)
    }

    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<RoundCursor, ApplyError> {
        let mut machine = self.machine.write().await;
        machine.apply(plan_id)
    }

    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut machine = self.machine.write().await;
        machine.abort(plan_id)
    }

    /// Plan `event`, run `work` with the target cursor, then apply or abort the plan.
    ///
    /// `work` must not take [`GameRuntime::gate`]; it is held for the whole
    /// transition, so anything `work` does after its write is seen by the next
    /// command as part of the transition. Bound the write itself with
    /// [`GameRuntime::transition_timeout`]; `work` is never cut short here.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: PhaseEvent,
        work: F,
    ) -> Result<(T, RoundCursor), ServiceError>
    where
        F: FnOnce(RoundCursor) -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.gate.lock().await;
        let Plan {
            id: plan_id, to, ..
        } = self.plan_transition(event).await?;

        match work(to).await {
            Ok(value) => {
                let next = self.apply_planned_transition(plan_id).await?;
                drop(gate);
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        game_id = %self.game_id,
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{cache::tests::sample_cache, state_machine::GamePhase};

    #[tokio::test]
    async fn failed_work_aborts_the_plan() {
        let runtime = GameRuntime::new(sample_cache(2), None);
        let err = runtime
            .run_transition(PhaseEvent::Advance, |_| async {
                Err::<(), _>(ServiceError::InvalidState("nope".into()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let snapshot = runtime.machine_snapshot().await;
        assert_eq!(snapshot.cursor, RoundCursor::first());
        assert_eq!(snapshot.pending, None);
    }

    #[tokio::test]
    async fn successful_work_moves_the_cursor() {
        let runtime = GameRuntime::new(sample_cache(2), Some(Duration::from_secs(1)));
        let (target, next) = runtime
            .run_transition(PhaseEvent::Advance, |to| async move { Ok(to) })
            .await
            .unwrap();
        assert_eq!(target, next);
        assert_eq!(next.phase, GamePhase::Action);
    }

    #[tokio::test]
    async fn work_runs_to_completion_past_the_limit() {
        let runtime = GameRuntime::new(sample_cache(2), Some(Duration::from_millis(10)));
        let (_, next) = runtime
            .run_transition(PhaseEvent::Advance, |_| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(next.phase, GamePhase::Action);
        assert_eq!(runtime.machine_snapshot().await.pending, None);
    }

    #[tokio::test]
    async fn gate_stays_closed_while_work_runs() {
        let runtime = GameRuntime::new(sample_cache(2), None);
        runtime
            .run_transition(PhaseEvent::Advance, |_| async {
                assert!(runtime.gate.try_lock().is_err());
                Ok(())
            })
            .await
            .unwrap();
        assert!(runtime.gate.try_lock().is_ok());
    }
}
