/// Entities persisted by the storage collaborator.
pub mod models;
/// Storage abstraction over the service catalog, tickets and served history.
pub mod office_store;
/// Storage abstraction layer for database operations.
pub mod storage;
