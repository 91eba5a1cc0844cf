use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures of the CouchDB backend.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Reaching the database endpoint itself failed (`operation` is `query` or `create`).
    #[error("failed to {operation} CouchDB database `{database}`")]
    Database {
        operation: &'static str,
        database: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected CouchDB status {status} for database `{database}`")]
    DatabaseStatus {
        database: String,
        status: StatusCode,
    },
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected CouchDB status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A stored document no longer matches the row model.
    #[error("CouchDB document `{path}` does not match its row model")]
    DeserializeValue {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
