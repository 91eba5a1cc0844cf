use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::from_value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{ChangeEvent, ChangeOp, GameEntity, GameRecord, PlayerEntity, RowEntity},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        ACTION_STATE_TABLE, AllDocsResponse, BulkDocsRequest, CHILD_TABLES, CouchRowDocument,
        DeletedDocument, END_SUFFIX, GAME_PREFIX, OBJECTIVE_TABLE, PLAYER_TABLE, RevisionOnly,
        SELECTION_TABLE, TIMER_TABLE, child_prefix, game_doc_id, row_doc_id,
    },
};

/// CouchDB-backed [`GameStore`], one document per row.
#[derive(Clone)]
pub struct CouchGameStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchGameStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url);
        let database = Arc::<str>::from(config.database);
        let auth = config
            .credentials
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    /// Request against `path` inside the database, or the database itself when `None`.
    fn request(&self, method: Method, path: Option<&str>) -> RequestBuilder {
        let url = match path {
            Some(path) => format!("{}/{}/{}", self.base_url, self.database, path),
            None => format!("{}/{}", self.base_url, self.database),
        };
        let builder = self.client.request(method, url);
        match &self.auth {
            Some((user, pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder, path: &str) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    fn ensure_success(response: &Response, path: &str) -> CouchResult<()> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: path.to_string(),
                status: response.status(),
            })
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let response = self
            .request(Method::GET, None)
            .send()
            .await
            .map_err(|source| CouchDaoError::Database {
                operation: "query",
                database: database.clone(),
                source,
            })?;

        let status = match response.status() {
            StatusCode::NOT_FOUND => {
                info!(database, "creating CouchDB database");
                self.request(Method::PUT, None)
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::Database {
                        operation: "create",
                        database: database.clone(),
                        source,
                    })?
                    .status()
            }
            other => other,
        };

        if status.is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::DatabaseStatus { database, status })
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = Self::send(self.request(Method::GET, Some(doc_id)), doc_id).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::ensure_success(&response, doc_id)?;
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: doc_id.to_string(),
                source,
            })
    }

    async fn current_rev(&self, doc_id: &str) -> CouchResult<Option<String>> {
        Ok(self
            .get_document::<RevisionOnly>(doc_id)
            .await?
            .map(|existing| existing.rev))
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = Self::send(
            self.request(Method::PUT, Some(doc_id)).json(document),
            doc_id,
        )
        .await?;
        Self::ensure_success(&response, doc_id)
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(rev) = self.current_rev(doc_id).await? else {
            return Ok(false);
        };

        let response = Self::send(
            self.request(Method::DELETE, Some(doc_id))
                .query(&[("rev", rev)]),
            doc_id,
        )
        .await?;
        // Someone else removed it between the two calls.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        Self::ensure_success(&response, doc_id)?;
        Ok(true)
    }

    /// Documents whose id starts with `prefix`.
    async fn all_docs(&self, prefix: &str, include_docs: bool) -> CouchResult<AllDocsResponse> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", include_docs.to_string()),
            ("startkey", format!("\"{prefix}\"")),
            ("endkey", format!("\"{prefix}{END_SUFFIX}\"")),
        ];

        let response =
            Self::send(self.request(Method::GET, Some(ALL_DOCS)).query(&query), ALL_DOCS).await?;
        Self::ensure_success(&response, ALL_DOCS)?;
        response
            .json::<AllDocsResponse>()
            .await
            .map_err(|source| CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            })
    }

    async fn list_rows<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let payload = self.all_docs(prefix, true).await?;

        let mut rows = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed: CouchRowDocument<T> =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: row.id,
                        source,
                    })?;
                rows.push(parsed.row);
            }
        }

        Ok(rows)
    }

    async fn write_row<T>(&self, doc_id: String, game_id: Uuid, row: T) -> CouchResult<()>
    where
        T: Serialize,
    {
        let rev = self.current_rev(&doc_id).await?;
        let document = CouchRowDocument {
            id: doc_id.clone(),
            rev,
            game_id,
            row,
        };
        self.put_document(&doc_id, &document).await
    }

    async fn apply_change(&self, game_id: Uuid, change: ChangeEvent) -> CouchResult<()> {
        let Some(doc_id) = row_doc_id(&change.row) else {
            return Ok(());
        };
        debug!(%game_id, doc_id, op = ?change.op, "writing document");

        if change.op == ChangeOp::Delete {
            if let RowEntity::Game(game) = &change.row {
                return self.delete_game(game.id).await.map(|_| ());
            }
            return self.delete_document(&doc_id).await.map(|_| ());
        }

        match change.row {
            RowEntity::Game(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::Player(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::Selection(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::ActionState(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::Objective(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::Timer(row) => self.write_row(doc_id, game_id, row).await,
            RowEntity::DraftPick(_) => Ok(()),
        }
    }

    async fn apply_changes(&self, game_id: Uuid, changes: Vec<ChangeEvent>) -> CouchResult<()> {
        for change in changes {
            self.apply_change(game_id, change).await?;
        }
        Ok(())
    }

    async fn load_game(&self, id: Uuid) -> CouchResult<Option<GameRecord>> {
        let Some(game) = self
            .get_document::<CouchRowDocument<GameEntity>>(&game_doc_id(id))
            .await?
        else {
            return Ok(None);
        };

        let mut players: Vec<PlayerEntity> =
            self.list_rows(&child_prefix(PLAYER_TABLE, id)).await?;
        players.sort_by_key(|player| player.seat);

        Ok(Some(GameRecord {
            game: game.row,
            players,
            selections: self.list_rows(&child_prefix(SELECTION_TABLE, id)).await?,
            action_states: self
                .list_rows(&child_prefix(ACTION_STATE_TABLE, id))
                .await?,
            objectives: self.list_rows(&child_prefix(OBJECTIVE_TABLE, id)).await?,
            timers: self.list_rows(&child_prefix(TIMER_TABLE, id)).await?,
        }))
    }

    async fn list_games(&self) -> CouchResult<Vec<GameEntity>> {
        let mut games: Vec<GameEntity> = self.list_rows(GAME_PREFIX).await?;
        games.sort_by_key(|game| game.created_at);
        Ok(games)
    }

    async fn delete_game(&self, id: Uuid) -> CouchResult<bool> {
        let mut tombstones = Vec::new();
        for table in CHILD_TABLES {
            let listing = self.all_docs(&child_prefix(table, id), false).await?;
            tombstones.extend(listing.rows.into_iter().filter_map(|row| {
                row.value.map(|value| DeletedDocument {
                    id: row.id,
                    rev: value.rev,
                    deleted: true,
                })
            }));
        }

        if !tombstones.is_empty() {
            const BULK_DOCS: &str = "_bulk_docs";
            debug!(%id, rows = tombstones.len(), "deleting game rows");
            let response = Self::send(
                self.request(Method::POST, Some(BULK_DOCS))
                    .json(&BulkDocsRequest { docs: tombstones }),
                BULK_DOCS,
            )
            .await?;
            Self::ensure_success(&response, BULK_DOCS)?;
        }

        self.delete_document(&game_doc_id(id)).await
    }
}

impl GameStore for CouchGameStore {
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
        Box::pin(async move {
            // Game documents are few; a scan avoids maintaining a design document.
            let games = store.list_games().await?;
            Ok(games.into_iter().find(|game| game.join_code == code))
        })
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
        let store = self.clone();
        Box::pin(async move {
            let path = store.database.to_string();
            let response = Self::send(store.request(Method::GET, None), &path).await?;
            Self::ensure_success(&response, &path).map_err(Into::into)
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
