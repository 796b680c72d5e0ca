//! In-memory datastore
//!
//! Writes are staged in a per-transaction overlay and applied under a single
//! write lock on commit, so readers never observe half a plan. Tables must be
//! registered up front; writes to any other table fail with
//! `StoreError::UnknownTable`.
//!
//! Test hooks: [`MemoryDatastore::fail_on`] injects a write failure for one
//! record, [`MemoryDatastore::fail_next_commit`] refuses the next commit, and
//! the `*_issued` counters act as a spy on everything the engine sent.

use super::{Datastore, Transaction};
use crate::error::StoreError;
use mesh_core::{Row, CANVAS_TABLES};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

type Table = BTreeMap<String, Row>;
type RecordKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    tables: RwLock<HashMap<String, Table>>,
    failures: Mutex<HashSet<RecordKey>>,
    fail_next_commit: AtomicBool,
    writes_issued: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

/// In-memory transactional datastore
#[derive(Debug, Clone, Default)]
pub struct MemoryDatastore {
    inner: Arc<Inner>,
}

impl MemoryDatastore {
    /// Create a datastore with the default canvas tables registered
    #[must_use]
    pub fn new() -> Self {
        Self::with_tables(CANVAS_TABLES.iter().copied())
    }

    /// Create a datastore with exactly these tables
    #[must_use]
    pub fn with_tables<'a>(tables: impl IntoIterator<Item = &'a str>) -> Self {
        let store = Self::default();
        {
            let mut guard = store.inner.tables.write();
            for table in tables {
                guard.entry(table.to_string()).or_default();
            }
        }
        store
    }

    /// Register another table (e.g. a protected one, to prove it stays untouched)
    pub fn register_table(&self, table: &str) {
        self.inner
            .tables
            .write()
            .entry(table.to_string())
            .or_default();
    }

    /// Write a committed record directly, bypassing transactions
    ///
    /// # Errors
    /// `StoreError::UnknownTable` if the table is not registered.
    pub fn seed(&self, table: &str, id: &str, row: Row) -> Result<(), StoreError> {
        let mut guard = self.inner.tables.write();
        let records = guard
            .get_mut(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        records.insert(id.to_string(), row);
        Ok(())
    }

    /// Committed records of a table, keyed by id
    #[must_use]
    pub fn snapshot(&self, table: &str) -> BTreeMap<String, Row> {
        self.inner
            .tables
            .read()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of committed records in a table
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.inner.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    /// Total committed records across all tables
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.inner.tables.read().values().map(BTreeMap::len).sum()
    }

    /// Make every write to `(table, id)` fail until [`Self::clear_failures`]
    pub fn fail_on(&self, table: &str, id: &str) {
        self.inner
            .failures
            .lock()
            .insert((table.to_string(), id.to_string()));
    }

    /// Refuse the next commit
    pub fn fail_next_commit(&self) {
        self.inner.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.inner.failures.lock().clear();
        self.inner.fail_next_commit.store(false, Ordering::SeqCst);
    }

    /// Writes issued through transactions, committed or not
    #[must_use]
    pub fn writes_issued(&self) -> usize {
        self.inner.writes_issued.load(Ordering::SeqCst)
    }

    /// Transactions committed
    #[must_use]
    pub fn commits(&self) -> usize {
        self.inner.commits.load(Ordering::SeqCst)
    }

    /// Transactions rolled back
    #[must_use]
    pub fn rollbacks(&self) -> usize {
        self.inner.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Datastore for MemoryDatastore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            overlay: HashMap::new(),
        }))
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        let guard = self.inner.tables.read();
        let records = guard
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(records.get(id).cloned())
    }
}

/// Staged writes of one transaction
///
/// `overlay` maps each touched record to its final state: `Some(row)` after an
/// insert or patch, `None` after a delete.
struct MemoryTransaction {
    inner: Arc<Inner>,
    overlay: HashMap<RecordKey, Option<Row>>,
}

impl MemoryTransaction {
    fn prepare(&self, table: &str, id: &str) -> Result<Option<Row>, StoreError> {
        self.inner.writes_issued.fetch_add(1, Ordering::SeqCst);

        let key = (table.to_string(), id.to_string());
        if self.inner.failures.lock().contains(&key) {
            return Err(StoreError::Injected {
                table: table.to_string(),
                id: id.to_string(),
            });
        }
        if let Some(staged) = self.overlay.get(&key) {
            return Ok(staged.clone());
        }

        let guard = self.inner.tables.read();
        let records = guard
            .get(table)
            .ok_or_else(|| StoreError::UnknownTable(table.to_string()))?;
        Ok(records.get(id).cloned())
    }

    fn stage(&mut self, table: &str, id: &str, state: Option<Row>) {
        self.overlay
            .insert((table.to_string(), id.to_string()), state);
    }
}

#[async_trait::async_trait]
impl Transaction for MemoryTransaction {
    async fn insert(&mut self, table: &str, id: &str, row: Row) -> Result<(), StoreError> {
        if self.prepare(table, id)?.is_some() {
            return Err(StoreError::already_exists(table, id));
        }
        self.stage(table, id, Some(row));
        Ok(())
    }

    async fn patch(&mut self, table: &str, id: &str, fields: Row) -> Result<(), StoreError> {
        let mut current = self
            .prepare(table, id)?
            .ok_or_else(|| StoreError::not_found(table, id))?;
        for (column, value) in fields {
            current.insert(column, value);
        }
        self.stage(table, id, Some(current));
        Ok(())
    }

    async fn delete(&mut self, table: &str, id: &str) -> Result<(), StoreError> {
        if self.prepare(table, id)?.is_none() {
            return Err(StoreError::not_found(table, id));
        }
        self.stage(table, id, None);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        if self.inner.fail_next_commit.swap(false, Ordering::SeqCst) {
            self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        let mut guard = self.inner.tables.write();
        for ((table, id), state) in self.overlay {
            let Some(records) = guard.get_mut(&table) else {
                continue;
            };
            match state {
                Some(row) => {
                    records.insert(id, row);
                }
                None => {
                    records.remove(&id);
                }
            }
        }
        drop(guard);

        self.inner.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.rollbacks.fetch_add(1, Ordering::SeqCst);
        tracing::debug!("Discarding {} staged writes", self.overlay.len());
        Ok(())
    }
}
