use std::time::Duration;

use mongodb::{Client, Database, bson::doc};
use tokio::time::sleep;
use tracing::{debug, info};

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

const FIRST_RETRY: Duration = Duration::from_millis(250);
const LONGEST_RETRY: Duration = Duration::from_secs(2);

/// Open a client and wait until the server answers a ping.
///
/// The storage supervisor retries failed connections on its own schedule, so
/// this only absorbs the short hiccups of a server that is still starting.
pub async fn open_database(config: &MongoConfig) -> MongoResult<Database> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let attempts = config.connect_attempts.max(1);
    let mut attempt = 0;
    let mut delay = FIRST_RETRY;
    loop {
        attempt += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = %config.database_name, attempt, "MongoDB answered ping");
                return Ok(database);
            }
            Err(source) if attempt >= attempts => {
                return Err(MongoDaoError::InitialPing { attempts, source });
            }
            Err(err) => {
                debug!(attempt, ?delay, error = %err, "MongoDB ping failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(LONGEST_RETRY);
            }
        }
    }
}
