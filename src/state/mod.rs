pub mod action;
pub mod cache;
pub mod command;
pub mod history;
pub mod round;
pub mod runtime;
pub mod session;
mod sse;
pub mod state_machine;
pub mod strategy;
pub mod timer;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{config::AppConfig, dao::game_store::GameStore, error::ServiceError};

pub use self::runtime::GameRuntime;
pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handle, configuration and open games.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    runtimes: DashMap<Uuid, Arc<GameRuntime>>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            runtimes: DashMap::new(),
            config,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current game store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    ///
    /// Returns `true` when this flipped the degraded flag.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) -> bool {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false)
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Flip the degraded flag, notifying watchers only when it changes.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Games currently held in memory, keyed by game id.
    pub fn runtimes(&self) -> &DashMap<Uuid, Arc<GameRuntime>> {
        &self.runtimes
    }
}
