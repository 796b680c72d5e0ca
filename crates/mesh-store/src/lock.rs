//! Canvas lock collaborator
//!
//! The engine only *reads* lock state. Acquisition, renewal and release
//! belong to the locking service; [`MemoryLockService`] is a reference
//! implementation used by tests and the CLI.

use crate::clock::Clock;
use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use mesh_core::{ActorId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Exclusive, time-bounded write permission on a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasLock {
    /// Locked workspace
    pub workspace_id: WorkspaceId,
    /// Actor holding the lock
    pub holder: ActorId,
    /// When the lock was taken (or last renewed)
    pub acquired_at: DateTime<Utc>,
    /// When the lock stops being valid
    pub expires_at: DateTime<Utc>,
}

impl CanvasLock {
    /// True once `now` has reached the expiry
    #[inline]
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// True when `actor` holds the lock
    #[inline]
    #[must_use]
    pub fn is_held_by(&self, actor: &ActorId) -> bool {
        &self.holder == actor
    }
}

/// Supplies current lock state
#[async_trait::async_trait]
pub trait LockProvider: Send + Sync {
    /// Lock currently recorded for the workspace, expired or not
    async fn current_lock(&self, workspace_id: &WorkspaceId)
        -> Result<Option<CanvasLock>, StoreError>;
}

/// In-memory locking service
#[derive(Debug)]
pub struct MemoryLockService {
    locks: DashMap<WorkspaceId, CanvasLock>,
    clock: Arc<dyn Clock>,
}

impl MemoryLockService {
    /// Create service reading time from `clock`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            locks: DashMap::new(),
            clock,
        }
    }

    /// Take the lock for `ttl`
    ///
    /// Succeeds when the workspace is unlocked, the previous lock expired, or
    /// `actor` already holds it (which renews it).
    ///
    /// # Errors
    /// `StoreError::LockHeld` when another actor holds an unexpired lock.
    pub fn acquire(
        &self,
        workspace_id: &WorkspaceId,
        actor: &ActorId,
        ttl: Duration,
    ) -> Result<CanvasLock, StoreError> {
        let now = self.clock.now();
        let mut entry = self
            .locks
            .entry(workspace_id.clone())
            .or_insert_with(|| CanvasLock {
                workspace_id: workspace_id.clone(),
                holder: actor.clone(),
                acquired_at: now,
                expires_at: now,
            });

        if !entry.is_held_by(actor) && !entry.is_expired_at(now) {
            return Err(StoreError::LockHeld {
                holder: entry.holder.clone(),
            });
        }

        *entry = CanvasLock {
            workspace_id: workspace_id.clone(),
            holder: actor.clone(),
            acquired_at: now,
            expires_at: now + ttl,
        };
        tracing::debug!("Lock on {} granted to {} for {}s", workspace_id, actor, ttl.num_seconds());
        Ok(entry.clone())
    }

    /// Extend a lock the actor already holds
    ///
    /// # Errors
    /// `StoreError::LockNotHeld` when the actor has no valid lock.
    pub fn renew(
        &self,
        workspace_id: &WorkspaceId,
        actor: &ActorId,
        ttl: Duration,
    ) -> Result<CanvasLock, StoreError> {
        let now = self.clock.now();
        let mut entry = self
            .locks
            .get_mut(workspace_id)
            .ok_or_else(|| StoreError::LockNotHeld(actor.clone()))?;
        if !entry.is_held_by(actor) || entry.is_expired_at(now) {
            return Err(StoreError::LockNotHeld(actor.clone()));
        }
        entry.expires_at = now + ttl;
        Ok(entry.clone())
    }

    /// Drop the lock if `actor` holds it
    ///
    /// # Errors
    /// `StoreError::LockNotHeld` when someone else holds it.
    pub fn release(&self, workspace_id: &WorkspaceId, actor: &ActorId) -> Result<(), StoreError> {
        match self.locks.remove_if(workspace_id, |_, lock| lock.is_held_by(actor)) {
            Some(_) => Ok(()),
            None if !self.locks.contains_key(workspace_id) => Ok(()),
            None => Err(StoreError::LockNotHeld(actor.clone())),
        }
    }

    /// Install an arbitrary lock record (tests, fixtures)
    pub fn install(&self, lock: CanvasLock) {
        self.locks.insert(lock.workspace_id.clone(), lock);
    }
}

#[async_trait::async_trait]
impl LockProvider for MemoryLockService {
    async fn current_lock(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Option<CanvasLock>, StoreError> {
        Ok(self.locks.get(workspace_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    fn service() -> (Arc<FixedClock>, MemoryLockService) {
        let clock = Arc::new(FixedClock::at(Utc::now()));
        let service = MemoryLockService::new(clock.clone());
        (clock, service)
    }

    #[tokio::test]
    async fn acquire_then_read_back() {
        let (_, locks) = service();
        let ws = WorkspaceId::new("ws");
        let alice = ActorId::new("alice");

        locks.acquire(&ws, &alice, Duration::minutes(5)).unwrap();
        let lock = locks.current_lock(&ws).await.unwrap().unwrap();
        assert!(lock.is_held_by(&alice));
    }

    #[test]
    fn second_actor_is_refused_until_expiry() {
        let (clock, locks) = service();
        let ws = WorkspaceId::new("ws");
        let alice = ActorId::new("alice");
        let bob = ActorId::new("bob");

        locks.acquire(&ws, &alice, Duration::seconds(30)).unwrap();
        assert!(matches!(
            locks.acquire(&ws, &bob, Duration::seconds(30)),
            Err(StoreError::LockHeld { .. })
        ));

        clock.advance(Duration::seconds(30));
        assert!(locks.acquire(&ws, &bob, Duration::seconds(30)).is_ok());
    }

    #[test]
    fn renew_requires_a_live_lock() {
        let (clock, locks) = service();
        let ws = WorkspaceId::new("ws");
        let alice = ActorId::new("alice");

        locks.acquire(&ws, &alice, Duration::seconds(10)).unwrap();
        clock.advance(Duration::seconds(5));
        let renewed = locks.renew(&ws, &alice, Duration::seconds(10)).unwrap();
        assert_eq!(renewed.expires_at, clock.now() + Duration::seconds(10));

        clock.advance(Duration::seconds(11));
        assert!(locks.renew(&ws, &alice, Duration::seconds(10)).is_err());
    }

    #[test]
    fn release_by_non_holder_fails() {
        let (_, locks) = service();
        let ws = WorkspaceId::new("ws");
        locks
            .acquire(&ws, &ActorId::new("alice"), Duration::seconds(10))
            .unwrap();

        assert!(locks.release(&ws, &ActorId::new("bob")).is_err());
        assert!(locks.release(&ws, &ActorId::new("alice")).is_ok());
        assert!(locks.release(&ws, &ActorId::new("bob")).is_ok());
    }
}
