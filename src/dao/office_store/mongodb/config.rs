use std::{env, time::Duration};

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tracing::info;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "office_queue";
const APP_NAME: &str = "office-queue-back";
const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Where and how to reach MongoDB.
///
/// Connection attempts fail fast: the storage supervisor owns retries and backoff.
#[derive(Clone)]
pub struct MongoConfig {
    pub options: ClientOptions,
    pub database_name: String,
}

impl MongoConfig {
    /// Read `MONGO_URI`, `MONGO_DB` and `MONGO_SELECTION_TIMEOUT_MS`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = env::var("MONGO_URI")
            .map_err(|_| MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let database_name = env::var("MONGO_DB").unwrap_or_else(|_| DEFAULT_DATABASE.to_owned());
        let selection_timeout = env::var("MONGO_SELECTION_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SELECTION_TIMEOUT);

        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri { uri, source })?;
        options.app_name.get_or_insert_with(|| APP_NAME.to_owned());
        options.server_selection_timeout = Some(selection_timeout);
        options.connect_timeout = Some(selection_timeout);

        Ok(Self {
            options,
            database_name,
        })
    }

    /// Open a client and check the server answers a single ping.
    pub(super) async fn open_database(&self) -> MongoResult<Database> {
        let client = Client::with_options(self.options.clone())
            .map_err(|source| MongoDaoError::ClientConstruction { source })?;
        let database = client.database(&self.database_name);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::InitialPing {
                database: self.database_name.clone(),
                source,
            })?;
        info!(database = %self.database_name, "connected to MongoDB");
        Ok(database)
    }
}
