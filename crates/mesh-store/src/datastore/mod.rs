//! Transactional datastore seam
//!
//! The engine issues every write of a plan through one [`Transaction`]. A
//! plan either commits as a whole or is rolled back as a whole; the engine
//! never writes compensating records itself.

mod memory;

pub use memory::MemoryDatastore;

use crate::error::StoreError;
use mesh_core::Row;

/// Datastore holding canvas tables
#[async_trait::async_trait]
pub trait Datastore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError>;

    /// Read one committed record
    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError>;

    /// True when a committed record exists
    async fn exists(&self, table: &str, id: &str) -> Result<bool, StoreError> {
        Ok(self.get(table, id).await?.is_some())
    }
}

/// Open transaction
///
/// Dropping a transaction without committing discards its writes.
#[async_trait::async_trait]
pub trait Transaction: Send {
    /// Insert a new record; fails if the id already exists
    async fn insert(&mut self, table: &str, id: &str, row: Row) -> Result<(), StoreError>;

    /// Merge `fields` into an existing record
    async fn patch(&mut self, table: &str, id: &str, fields: Row) -> Result<(), StoreError>;

    /// Remove an existing record
    async fn delete(&mut self, table: &str, id: &str) -> Result<(), StoreError>;

    /// Make every write visible atomically
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every write
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
