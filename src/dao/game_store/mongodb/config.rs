use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::game_store::DEFAULT_MONGO_DB;

/// Name reported to the server, visible in `db.currentOp()` and server logs.
const APP_NAME: &str = "ti-tracker-back";
/// Pings attempted before a connection attempt is reported as failed.
const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
    pub connect_attempts: u32,
}

impl MongoConfig {
    /// Parse `uri`, falling back to [`DEFAULT_MONGO_DB`] when no database is named.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        // The URI may embed credentials, keep it out of the error.
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri { source })?;
        if options.app_name.is_none() {
            options.app_name = Some(APP_NAME.into());
        }

        let database_name = db_name
            .filter(|name| !name.trim().is_empty())
            .or(options.default_database.as_deref())
            .unwrap_or(DEFAULT_MONGO_DB)
            .to_owned();

        Ok(Self {
            options,
            database_name,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn database_comes_from_argument_then_uri_then_default() {
        let named = MongoConfig::from_uri("mongodb://localhost:27017/tables", Some("league"))
            .await
            .unwrap();
        assert_eq!(named.database_name, "league");
        assert_eq!(named.options.app_name.as_deref(), Some(APP_NAME));

        let from_uri = MongoConfig::from_uri("mongodb://localhost:27017/tables", None)
            .await
            .unwrap();
        assert_eq!(from_uri.database_name, "tables");

        let fallback = MongoConfig::from_uri("mongodb://localhost:27017", Some(" "))
            .await
            .unwrap();
        assert_eq!(fallback.database_name, DEFAULT_MONGO_DB);
    }

    #[tokio::test]
    async fn malformed_uri_is_rejected() {
        assert!(matches!(
            MongoConfig::from_uri("postgres://nope", None).await,
            Err(MongoDaoError::InvalidUri { .. })
        ));
    }
}
