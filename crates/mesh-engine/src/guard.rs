//! Guard layer
//!
//! Pure checks, no I/O and no side effects. Every write path runs
//! [`check_lock`] first and [`check_isolation`] second; [`check_repair`] runs
//! immediately before each individual repair.
//!
//! The isolation check consults [`CANVAS_TABLES`](mesh_core::CANVAS_TABLES)
//! on every call and has no switch to turn it off.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use mesh_core::{repair, tables, ActorId, Mutation, RepairRule, TableMap, WorkspaceId};
use mesh_store::CanvasLock;

/// Lock validity check
///
/// # Errors
/// - `EngineError::NoLock` when no lock is recorded
/// - `EngineError::LockHeldByOther` when another actor holds it
/// - `EngineError::LockExpired` when `now` is at or past the expiry
pub fn check_lock(
    lock: Option<&CanvasLock>,
    workspace_id: &WorkspaceId,
    actor_id: &ActorId,
    now: DateTime<Utc>,
) -> Result<(), EngineError> {
    let lock = lock
        .filter(|lock| &lock.workspace_id == workspace_id)
        .ok_or_else(|| EngineError::NoLock {
            workspace: workspace_id.clone(),
        })?;

    if !lock.is_held_by(actor_id) {
        return Err(EngineError::LockHeldByOther {
            workspace: workspace_id.clone(),
            holder: lock.holder.clone(),
            actor: actor_id.clone(),
        });
    }

    if lock.is_expired_at(now) {
        return Err(EngineError::LockExpired {
            workspace: workspace_id.clone(),
            actor: actor_id.clone(),
            expires_at: lock.expires_at,
        });
    }

    Ok(())
}

/// Physical table a mutation writes
#[inline]
#[must_use]
pub fn resolve_table<'t>(mutation: &Mutation, tables: &'t TableMap) -> &'t str {
    tables.table_for(mutation.entity())
}

/// Isolation check across a whole mutation list
///
/// # Errors
/// `EngineError::ForbiddenTable` for the first mutation whose table is not a
/// canvas table.
pub fn check_isolation(mutations: &[Mutation], tables: &TableMap) -> Result<(), EngineError> {
    for (index, mutation) in mutations.iter().enumerate() {
        ensure_canvas_table(index, mutation, tables)?;
    }
    Ok(())
}

/// Single-mutation form of [`check_isolation`]
///
/// # Errors
/// `EngineError::ForbiddenTable` when the table is not a canvas table.
pub fn ensure_canvas_table<'t>(
    index: usize,
    mutation: &Mutation,
    tables: &'t TableMap,
) -> Result<&'t str, EngineError> {
    let table = resolve_table(mutation, tables);
    if tables::is_canvas_table(table) {
        return Ok(table);
    }
    if tables::is_protected_table(table) {
        tracing::error!(
            "Blocked mutation #{} ({}) aimed at protected table '{}'",
            index,
            mutation,
            table
        );
    }
    Err(EngineError::ForbiddenTable {
        index,
        mutation: mutation.to_string(),
        table: table.to_string(),
    })
}

/// Repair whitelist check
///
/// # Errors
/// `EngineError::ForbiddenRepair` when `name` is not an approved repair.
pub fn check_repair(name: &str) -> Result<&'static RepairRule, EngineError> {
    repair::approved(name).ok_or_else(|| EngineError::ForbiddenRepair(name.to_string()))
}
