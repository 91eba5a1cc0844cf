//! Print the resolved storage configuration and the games it holds.

use anyhow::Context;
use ti_tracker_back::dao::game_store::{self, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let backend = StorageBackend::from_env().context("reading STORAGE_BACKEND")?;
    println!("backend: {}", game_store::describe_backend(backend));

    let store = game_store::connect(backend)
        .await
        .context("connecting to storage")?;
    store.health_check().await.context("storage health check")?;

    let mut games = store.list_games().await.context("listing games")?;
    games.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    println!("{} stored game(s)", games.len());
    for game in games {
        println!(
            "{}  {:<8} round {:>2} {:<8} {}",
            game.id,
            game.join_code,
            game.round,
            game.phase.to_string(),
            game.name
        );
    }
    Ok(())
}
