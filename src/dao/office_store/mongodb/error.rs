use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB database `{database}` did not answer the initial ping")]
    InitialPing {
        database: String,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to load service type `{id}`")]
    LoadServiceType {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list service types")]
    ListServiceTypes {
        #[source]
        source: MongoError,
    },
    #[error("failed to save service type `{id}`")]
    SaveServiceType {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load counter `{id}`")]
    LoadCounter {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save counter `{id}`")]
    SaveCounter {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load tickets for service `{service_id}`")]
    LoadLatestTicket {
        service_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to create ticket `{code}` for service `{service_id}`")]
    CreateTicket {
        service_id: Uuid,
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load ticket `{id}`")]
    LoadTicket {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to list unserved tickets")]
    ListUnserved {
        #[source]
        source: MongoError,
    },
    #[error("failed to save served record for ticket `{ticket_id}`")]
    SaveServedRecord {
        ticket_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("ticket `{ticket_id}` already has a served record")]
    DuplicateServedRecord { ticket_id: Uuid },
    #[error("ticket `{ticket_id}` does not exist")]
    UnknownTicket { ticket_id: Uuid },
    #[error("invalid document ID `{doc_id}` in collection `{collection}`")]
    InvalidDocId {
        collection: &'static str,
        doc_id: String,
    },
}
