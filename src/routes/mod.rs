use axum::Router;

use crate::state::SharedState;

pub mod actor;
pub mod docs;
pub mod game;
pub mod health;
pub mod history;
pub mod play;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(game::router())
        .merge(play::router())
        .merge(history::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
