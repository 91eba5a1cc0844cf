use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::open_database,
    error::{MongoDaoError, MongoResult},
    models::{
        ACTION_STATE_COLLECTION_NAME, CHILD_COLLECTIONS, GAME_COLLECTION_NAME,
        OBJECTIVE_COLLECTION_NAME, PLAYER_COLLECTION_NAME, RowDocument, SELECTION_COLLECTION_NAME,
        TIMER_COLLECTION_NAME, locate,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{ChangeEvent, ChangeOp, GameEntity, GameRecord, PlayerEntity, RowEntity},
    storage::StorageResult,
};

/// MongoDB-backed [`GameStore`] implementation, one collection per table.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let database = open_database(&self.config).await?;
        self.state.write().await.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let database = open_database(&config).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let games = database.collection::<mongodb::bson::Document>(GAME_COLLECTION_NAME);
        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"row.join_code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("game_join_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        games
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GAME_COLLECTION_NAME,
                index: "row.join_code",
                source,
            })?;

        // Child rows are always fetched per game.
        for collection in CHILD_COLLECTIONS {
            let index = mongodb::IndexModel::builder()
                .keys(doc! {"game_id": 1})
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection}_game_idx")))
                        .build(),
                )
                .build();
            database
                .collection::<mongodb::bson::Document>(collection)
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: "game_id",
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T>(&self, name: &'static str) -> Collection<RowDocument<T>>
    where
        T: Send + Sync,
    {
        let guard = self.inner.state.read().await;
        guard.database.collection::<RowDocument<T>>(name)
    }

    async fn write_row<T>(
        &self,
        collection: &'static str,
        id: String,
        game_id: Uuid,
        row: T,
        op: ChangeOp,
    ) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        let handle = self.collection::<T>(collection).await;
        let filter = doc! {"_id": id.as_str()};
        let outcome = match op {
            ChangeOp::Delete => handle.delete_one(filter).await.map(|_| ()),
            ChangeOp::Insert | ChangeOp::Update => handle
                .replace_one(filter, RowDocument::new(id.clone(), game_id, row))
                .upsert(true)
                .await
                .map(|_| ()),
        };

        outcome.map_err(|source| MongoDaoError::WriteRow {
            collection,
            id,
            source,
        })
    }

    async fn apply_change(&self, game_id: Uuid, change: ChangeEvent) -> MongoResult<()> {
        let Some((collection, id)) = locate(&change.row) else {
            return Ok(());
        };
        debug!(%game_id, collection, op = ?change.op, "writing row");

        match change.row {
            RowEntity::Game(row) => {
                if change.op == ChangeOp::Delete {
                    return self.delete_game(row.id).await.map(|_| ());
                }
                self.write_row(collection, id, game_id, row, change.op).await
            }
            RowEntity::Player(row) => self.write_row(collection, id, game_id, row, change.op).await,
            RowEntity::Selection(row) => {
                self.write_row(collection, id, game_id, row, change.op).await
            }
            RowEntity::ActionState(row) => {
                self.write_row(collection, id, game_id, row, change.op).await
            }
            RowEntity::Objective(row) => {
                self.write_row(collection, id, game_id, row, change.op).await
            }
            RowEntity::Timer(row) => self.write_row(collection, id, game_id, row, change.op).await,
            RowEntity::DraftPick(_) => Ok(()),
        }
    }

    async fn apply_changes(&self, game_id: Uuid, changes: Vec<ChangeEvent>) -> MongoResult<()> {
        // Standalone deployments have no multi-document transactions; rows are
        // written in order so the game row of a new game lands first.
        for change in changes {
            self.apply_change(game_id, change).await?;
        }
        Ok(())
    }

    async fn read_rows<T>(&self, collection: &'static str, game_id: Uuid) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync + Unpin,
    {
        let documents: Vec<RowDocument<T>> = self
            .collection::<T>(collection)
            .await
            .find(doc! {"game_id": game_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                id: game_id,
                source,
            })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadGame {
                id: game_id,
                source,
            })?;

        Ok(documents.into_iter().map(|document| document.row).collect())
    }

    async fn load_game(&self, id: Uuid) -> MongoResult<Option<GameRecord>> {
        let game = self
            .collection::<GameEntity>(GAME_COLLECTION_NAME)
            .await
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;

        let Some(game) = game else {
            return Ok(None);
        };

        let mut players: Vec<PlayerEntity> = self.read_rows(PLAYER_COLLECTION_NAME, id).await?;
        players.sort_by_key(|player| player.seat);

        Ok(Some(GameRecord {
            game: game.row,
            players,
            selections: self.read_rows(SELECTION_COLLECTION_NAME, id).await?,
            action_states: self.read_rows(ACTION_STATE_COLLECTION_NAME, id).await?,
            objectives: self.read_rows(OBJECTIVE_COLLECTION_NAME, id).await?,
            timers: self.read_rows(TIMER_COLLECTION_NAME, id).await?,
        }))
    }

    async fn find_game_by_code(&self, code: String) -> MongoResult<Option<GameEntity>> {
        let document = self
            .collection::<GameEntity>(GAME_COLLECTION_NAME)
            .await
            .find_one(doc! {"row.join_code": code})
            .await
            .map_err(|source| MongoDaoError::FindByCode { source })?;
        Ok(document.map(|document| document.row))
    }

    async fn list_games(&self) -> MongoResult<Vec<GameEntity>> {
        let documents: Vec<RowDocument<GameEntity>> = self
            .collection::<GameEntity>(GAME_COLLECTION_NAME)
            .await
            .find(doc! {})
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        let mut games: Vec<GameEntity> =
            documents.into_iter().map(|document| document.row).collect();
        games.sort_by_key(|game| game.created_at);
        Ok(games)
    }

    async fn delete_game(&self, id: Uuid) -> MongoResult<bool> {
        let database = self.database().await;
        for collection in CHILD_COLLECTIONS {
            database
                .collection::<mongodb::bson::Document>(collection)
                .delete_many(doc! {"game_id": id.to_string()})
                .await
                .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        }

        let result = database
            .collection::<mongodb::bson::Document>(GAME_COLLECTION_NAME)
            .delete_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::DeleteGame { id, source })?;
        Ok(result.deleted_count > 0)
    }
}

impl GameStore for MongoGameStore {
    fn apply_changes(
        &self,
        game_id: Uuid,
        changes: Vec<ChangeEvent>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .apply_changes(game_id, changes)
                .await
                .map_err(Into::into)
        })
    }

    fn load_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move { store.load_game(id).await.map_err(Into::into) })
    }

    fn find_game_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game_by_code(code).await.map_err(Into::into) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_games().await.map_err(Into::into) })
    }

    fn delete_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { inner.reconnect().await.map_err(Into::into) })
    }
}
