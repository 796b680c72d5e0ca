//! Execution history store
//!
//! Per-workspace, depth-bounded log of committed plans. The orchestrator is
//! the only writer (append) and the rollback engine the only product reader;
//! eviction of the oldest entry on overflow is the only deletion besides the
//! explicit debug `clear`.

use crate::error::StoreError;
use dashmap::DashMap;
use mesh_core::{StoredPlan, WorkspaceId, MAX_HISTORY_DEPTH};
use std::collections::VecDeque;

/// Bounded plan history
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a committed plan, evicting the oldest entry on overflow
    async fn append(&self, entry: StoredPlan) -> Result<(), StoreError>;

    /// Most recent entry for the workspace
    async fn latest(&self, workspace_id: &WorkspaceId) -> Result<Option<StoredPlan>, StoreError>;

    /// All entries for the workspace, oldest first
    async fn list(&self, workspace_id: &WorkspaceId) -> Result<Vec<StoredPlan>, StoreError>;

    /// Drop every entry for the workspace
    async fn clear(&self, workspace_id: &WorkspaceId) -> Result<(), StoreError>;
}

/// In-memory ring buffer per workspace
#[derive(Debug)]
pub struct MemoryHistoryStore {
    capacity: usize,
    entries: DashMap<WorkspaceId, VecDeque<StoredPlan>>,
}

impl MemoryHistoryStore {
    /// Create store keeping `capacity` entries per workspace
    ///
    /// Capacity is clamped to `1..=MAX_HISTORY_DEPTH`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.clamp(1, MAX_HISTORY_DEPTH),
            entries: DashMap::new(),
        }
    }

    /// Effective capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(MAX_HISTORY_DEPTH)
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, entry: StoredPlan) -> Result<(), StoreError> {
        let mut log = self
            .entries
            .entry(entry.workspace_id.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));
        log.push_back(entry);
        while log.len() > self.capacity {
            if let Some(evicted) = log.pop_front() {
                tracing::debug!(
                    "Evicted plan {} from history of {}",
                    evicted.plan.id,
                    evicted.workspace_id
                );
            }
        }
        Ok(())
    }

    async fn latest(&self, workspace_id: &WorkspaceId) -> Result<Option<StoredPlan>, StoreError> {
        Ok(self
            .entries
            .get(workspace_id)
            .and_then(|log| log.back().cloned()))
    }

    async fn list(&self, workspace_id: &WorkspaceId) -> Result<Vec<StoredPlan>, StoreError> {
        Ok(self
            .entries
            .get(workspace_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn clear(&self, workspace_id: &WorkspaceId) -> Result<(), StoreError> {
        self.entries.remove(workspace_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mesh_core::{ActorId, Plan};

    fn stored(ws: &str) -> StoredPlan {
        StoredPlan {
            plan: Plan::new(),
            workspace_id: WorkspaceId::new(ws),
            actor_id: ActorId::new("alice"),
            executed_at: Utc::now(),
            fully_reversible: true,
            irreversible: Vec::new(),
        }
    }

    #[tokio::test]
    async fn keeps_only_most_recent_entries() {
        let history = MemoryHistoryStore::default();
        let ws = WorkspaceId::new("ws");
        let mut ids = Vec::new();
        for _ in 0..5 {
            let entry = stored("ws");
            ids.push(entry.plan.id);
            history.append(entry).await.unwrap();
        }

        let kept: Vec<_> = history
            .list(&ws)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.plan.id)
            .collect();
        assert_eq!(kept, ids[2..].to_vec());
        assert_eq!(history.latest(&ws).await.unwrap().unwrap().plan.id, ids[4]);
    }

    #[tokio::test]
    async fn workspaces_are_independent() {
        let history = MemoryHistoryStore::new(1);
        history.append(stored("a")).await.unwrap();
        history.append(stored("b")).await.unwrap();

        assert_eq!(history.list(&WorkspaceId::new("a")).await.unwrap().len(), 1);
        history.clear(&WorkspaceId::new("a")).await.unwrap();
        assert!(history.latest(&WorkspaceId::new("a")).await.unwrap().is_none());
        assert!(history.latest(&WorkspaceId::new("b")).await.unwrap().is_some());
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(MemoryHistoryStore::new(0).capacity(), 1);
        assert_eq!(MemoryHistoryStore::new(10).capacity(), MAX_HISTORY_DEPTH);
    }
}
