//! MongoDB backend: one collection per row kind, documents keyed by row id.

mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            // A bad URI will not fix itself by retrying.
            MongoDaoError::InvalidUri { .. } => StorageError::Rejected(err.to_string()),
            other => StorageError::unavailable("mongodb", other),
        }
    }
}
