pub mod memory;

use crate::domain::{Batch, QueryResult};

pub use memory::InMemoryStore;

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("database not found: {0}")]
    DatabaseNotFound(String),
    #[error("invalid point: {0}")]
    InvalidPoint(String),
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The operations the harness needs from a time-series store.
///
/// Implementations must accept batches in any order and from concurrent
/// callers.
#[async_trait::async_trait]
pub trait StorageSink: Send + Sync {
    /// Version string reported by the store.
    async fn ping(&self) -> Result<String, SinkError>;

    /// Creating an existing database is not an error.
    async fn create_database(&self, name: &str) -> Result<(), SinkError>;

    /// Deleting a missing database is not an error.
    async fn delete_database(&self, name: &str) -> Result<(), SinkError>;

    async fn list_databases(&self) -> Result<Vec<String>, SinkError>;

    async fn write(&self, batch: &Batch) -> Result<(), SinkError>;

    async fn query(&self, statement: &str, database: &str) -> Result<QueryResult, SinkError>;
}
