//! Persistence: row models, the [`game_store::GameStore`] seam and its backends.

pub mod game_store;
pub mod models;
pub mod storage;
