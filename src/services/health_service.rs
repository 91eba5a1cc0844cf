use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Report degraded mode and storage reachability, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage_reachable = match state.game_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        None => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    HealthResponse {
        status: if state.is_degraded() {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        },
        storage_reachable,
        open_games: state.runtimes().len(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{config::AppConfig, dao::game_store::memory::MemoryGameStore, state::AppState};

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default());
        let report = health_status(&state).await;
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.storage_reachable);

        state.set_game_store(Arc::new(MemoryGameStore::new())).await;
        let report = health_status(&state).await;
        assert_eq!(report.status, HealthStatus::Ok);
        assert!(report.storage_reachable);
        assert_eq!(report.open_games, 0);
    }
}
