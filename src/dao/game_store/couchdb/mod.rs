//! CouchDB backend: one document per row, keyed `<kind>:<game id>:<row id>`.

mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchGameStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::MissingEnvVar { var } => {
                StorageError::Rejected(format!("CouchDB is not configured: `{var}` is unset"))
            }
            CouchDaoError::DeserializeValue { .. } => StorageError::Rejected(err.to_string()),
            other => StorageError::unavailable("couchdb", other),
        }
    }
}
