use std::{env, time::Duration};

use super::error::{CouchDaoError, CouchResult};

/// Database used when `COUCH_DB` is unset.
pub const DEFAULT_COUCH_DB: &str = "ti_tracker";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the CouchDB backend.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    pub base_url: String,
    pub database: String,
    /// Basic-auth pair, only used when both halves are present.
    pub credentials: Option<(String, String)>,
    /// Per-request limit; a hung CouchDB must not stall a commit forever.
    pub request_timeout: Duration,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME`,
    /// `COUCH_PASSWORD` and `COUCH_TIMEOUT_MS`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(CouchDaoError::MissingEnvVar {
                var: "COUCH_BASE_URL",
            })?;
        let database = lookup("COUCH_DB")
            .filter(|db| !db.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COUCH_DB.into());
        let credentials = lookup("COUCH_USERNAME").zip(lookup("COUCH_PASSWORD"));
        let request_timeout = lookup("COUCH_TIMEOUT_MS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            database,
            credentials,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn base_url_is_required_and_the_rest_defaults() {
        assert!(matches!(
            CouchConfig::from_lookup(lookup(&[])),
            Err(CouchDaoError::MissingEnvVar { var: "COUCH_BASE_URL" })
        ));

        let config =
            CouchConfig::from_lookup(lookup(&[("COUCH_BASE_URL", "http://couch:5984/")])).unwrap();
        assert_eq!(config.base_url, "http://couch:5984");
        assert_eq!(config.database, DEFAULT_COUCH_DB);
        assert_eq!(config.credentials, None);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn credentials_need_both_halves() {
        let config = CouchConfig::from_lookup(lookup(&[
            ("COUCH_BASE_URL", "http://couch:5984"),
            ("COUCH_USERNAME", "admin"),
            ("COUCH_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.credentials, None);
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
    }
}
