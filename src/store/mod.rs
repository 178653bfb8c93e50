//! Persistence seam: one object-safe trait, a PostgreSQL and an in-memory implementation.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

use crate::config::{Operation, ResolvedEntity};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// One record keyed by API (camelCase) field name.
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{}", record_not_found_message(.operation))]
    RecordNotFound { operation: Operation },
    #[error("{0}")]
    Constraint(String),
    #[error("{message}")]
    InvalidValue { column: String, message: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

fn record_not_found_message(operation: &Operation) -> &'static str {
    match operation {
        Operation::Delete => "Record to delete does not exist.",
        _ => "Record to update not found.",
    }
}

/// Storage operations used by the CRUD service. Every call is a single round-trip.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a fully prepared row and return it as stored.
    async fn insert(&self, entity: &ResolvedEntity, row: Row) -> Result<Row, StoreError>;

    /// `None` when no row has this id (including ids that are not UUIDs).
    async fn find_by_id(&self, entity: &ResolvedEntity, id: &str) -> Result<Option<Row>, StoreError>;

    /// Rows matching every `(field, value)` pair exactly, oldest first.
    async fn find_all(
        &self,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
    ) -> Result<Vec<Row>, StoreError>;

    /// Overwrite the given fields and return the full row.
    async fn update(&self, entity: &ResolvedEntity, id: &str, changes: Row) -> Result<Row, StoreError>;

    async fn delete(&self, entity: &ResolvedEntity, id: &str) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
