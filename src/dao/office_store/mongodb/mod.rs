mod error;
mod models;
pub mod config;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoOfficeStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateServedRecord { .. } | MongoDaoError::UnknownTicket { .. } => {
                StorageError::rejected(err.to_string())
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
