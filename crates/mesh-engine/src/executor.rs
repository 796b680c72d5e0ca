//! Mutation executor
//!
//! Translates one [`Mutation`] into datastore writes inside an open
//! transaction:
//! 1. payload validation
//! 2. configured repairs, each checked against the catalogue right before it
//!    is applied
//! 3. row serialization and the insert/patch/delete call
//!
//! Geometry is written exactly as the payload states it.

use crate::error::EngineError;
use crate::guard;
use chrono::{DateTime, Utc};
use mesh_core::{
    to_row, AppliedRepair, ContainerPatch, Mutation, NewContainer, NewNode, NodePatch, Operation,
    RepairKind, TableMap, WorkspaceId,
};
use mesh_store::Transaction;

/// Applies single mutations for one plan execution
#[derive(Debug, Clone, Copy)]
pub struct MutationExecutor<'a> {
    workspace_id: &'a WorkspaceId,
    tables: &'a TableMap,
    repairs: &'a [String],
    now: DateTime<Utc>,
}

impl<'a> MutationExecutor<'a> {
    /// Create executor
    ///
    /// `now` is the execution time stamped by timestamp repairs.
    #[must_use]
    pub fn new(
        workspace_id: &'a WorkspaceId,
        tables: &'a TableMap,
        repairs: &'a [String],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            workspace_id,
            tables,
            repairs,
            now,
        }
    }

    /// Apply mutation `index` through `tx`, returning the repairs it needed
    ///
    /// # Errors
    /// - `ValidationFailure` for a malformed payload
    /// - `ForbiddenRepair` when a configured repair is not approved (never for
    ///   deletes, which take no repairs)
    /// - `ForbiddenOperation` when the table is outside the canvas whitelist
    /// - `MutationFailure` when the datastore refuses the write
    pub async fn apply(
        &self,
        tx: &mut dyn Transaction,
        index: usize,
        mutation: &Mutation,
    ) -> Result<Vec<AppliedRepair>, EngineError> {
        self.validate(index, mutation)?;

        let mut mutation = mutation.clone();
        let mut applied = Vec::new();
        let repairs = match mutation.operation() {
            Operation::Delete => &[][..],
            Operation::Create | Operation::Update => self.repairs,
        };
        for name in repairs {
            if let Some(repair) = self.repair(&mut mutation, name)? {
                tracing::info!(
                    repair = repair.rule.name,
                    target = %repair.target_id,
                    "Applied repair: {}",
                    repair.rule.justification
                );
                applied.push(repair);
            }
        }

        let table = guard::ensure_canvas_table(index, &mutation, self.tables)?;
        let id = mutation.target_id().to_string();
        let write_failed = |source| EngineError::Mutation {
            index,
            mutation: mutation.to_string(),
            source,
        };

        let written = match &mutation {
            Mutation::CreateContainer(payload) => {
                let row = serialize(index, &mutation, payload)?;
                tx.insert(table, &id, row).await
            }
            Mutation::CreateNode(payload) => {
                let row = serialize(index, &mutation, payload)?;
                tx.insert(table, &id, row).await
            }
            Mutation::UpdateContainer(update) => {
                let row = serialize(index, &mutation, &update.patch)?;
                tx.patch(table, &id, row).await
            }
            Mutation::UpdateNode(update) => {
                let row = serialize(index, &mutation, &update.patch)?;
                tx.patch(table, &id, row).await
            }
            Mutation::UpdateWorkspaceFlags(update) => {
                let row = serialize(index, &mutation, &update.flags)?;
                tx.patch(table, &id, row).await
            }
            Mutation::DeleteContainer(_) | Mutation::DeleteNode(_) => tx.delete(table, &id).await,
        };
        written.map_err(write_failed)?;

        tracing::debug!("Applied mutation #{} ({}) to {}", index, mutation, table);
        Ok(applied)
    }

    /// Run one configured repair against the payload
    ///
    /// Returns `None` when the repair does not apply (wrong operation class,
    /// or the field is already present).
    fn repair(
        &self,
        mutation: &mut Mutation,
        name: &str,
    ) -> Result<Option<AppliedRepair>, EngineError> {
        let rule = guard::check_repair(name)?;
        if rule.applies_to != mutation.operation() {
            return Ok(None);
        }

        let stamped = match (rule.kind, &mut *mutation) {
            (RepairKind::DefaultCreatedAt, Mutation::CreateContainer(c)) => {
                stamp(&mut c.created_at, self.now)
            }
            (RepairKind::DefaultCreatedAt, Mutation::CreateNode(n)) => {
                stamp(&mut n.created_at, self.now)
            }
            (RepairKind::DefaultUpdatedAt, Mutation::UpdateContainer(u)) => {
                stamp(&mut u.patch.updated_at, self.now)
            }
            (RepairKind::DefaultUpdatedAt, Mutation::UpdateNode(u)) => {
                stamp(&mut u.patch.updated_at, self.now)
            }
            (RepairKind::DefaultUpdatedAt, Mutation::UpdateWorkspaceFlags(u)) => {
                stamp(&mut u.flags.updated_at, self.now)
            }
            _ => false,
        };

        Ok(stamped.then(|| AppliedRepair {
            rule,
            entity: mutation.entity(),
            target_id: mutation.target_id().to_string(),
        }))
    }

    /// Payload checks run before any repair or write
    ///
    /// # Errors
    /// `EngineError::InvalidMutation` describing the first problem found.
    pub fn validate(&self, index: usize, mutation: &Mutation) -> Result<(), EngineError> {
        let invalid = |reason: String| EngineError::InvalidMutation {
            index,
            mutation: mutation.to_string(),
            reason,
        };

        if mutation.target_id().trim().is_empty() {
            return Err(invalid("target id is empty".into()));
        }

        match mutation {
            Mutation::CreateContainer(c) => {
                self.check_workspace(&c.workspace_id).map_err(invalid)?;
                check_container(c).map_err(invalid)
            }
            Mutation::CreateNode(n) => {
                self.check_workspace(&n.workspace_id).map_err(invalid)?;
                check_node(n).map_err(invalid)
            }
            Mutation::UpdateContainer(u) => check_container_patch(&u.patch).map_err(invalid),
            Mutation::UpdateNode(u) => check_node_patch(&u.patch).map_err(invalid),
            Mutation::UpdateWorkspaceFlags(u) => {
                self.check_workspace(&u.workspace_id).map_err(invalid)?;
                if u.flags.is_empty() {
                    return Err(invalid("flags patch sets no field".into()));
                }
                Ok(())
            }
            Mutation::DeleteContainer(_) | Mutation::DeleteNode(_) => Ok(()),
        }
    }

    fn check_workspace(&self, workspace_id: &WorkspaceId) -> Result<(), String> {
        if workspace_id == self.workspace_id {
            Ok(())
        } else {
            Err(format!(
                "payload belongs to workspace {workspace_id}, plan executes against {}",
                self.workspace_id
            ))
        }
    }
}

fn stamp(field: &mut Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if field.is_some() {
        return false;
    }
    *field = Some(now);
    true
}

fn serialize<T: serde::Serialize>(
    index: usize,
    mutation: &Mutation,
    payload: &T,
) -> Result<mesh_core::Row, EngineError> {
    to_row(payload).map_err(|e| EngineError::InvalidMutation {
        index,
        mutation: mutation.to_string(),
        reason: e.to_string(),
    })
}

fn finite(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(format!("{field} must be a finite number"))
    }
}

fn extent(field: &str, value: f64) -> Result<(), String> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(format!("{field} must not be negative"));
    }
    Ok(())
}

fn check_container(c: &NewContainer) -> Result<(), String> {
    finite("x", c.x)?;
    finite("y", c.y)?;
    extent("width", c.width)?;
    extent("height", c.height)
}

fn check_node(n: &NewNode) -> Result<(), String> {
    if n.container_id.as_ref().is_some_and(|c| c.is_blank()) {
        return Err("container_id is empty".into());
    }
    finite("x", n.x)?;
    finite("y", n.y)
}

fn check_container_patch(patch: &ContainerPatch) -> Result<(), String> {
    if patch.is_empty() {
        return Err("patch sets no field".into());
    }
    if let Some(x) = patch.x {
        finite("x", x)?;
    }
    if let Some(y) = patch.y {
        finite("y", y)?;
    }
    if let Some(width) = patch.width {
        extent("width", width)?;
    }
    if let Some(height) = patch.height {
        extent("height", height)?;
    }
    Ok(())
}

fn check_node_patch(patch: &NodePatch) -> Result<(), String> {
    if patch.is_empty() {
        return Err("patch sets no field".into());
    }
    if patch.container_id.as_ref().is_some_and(|c| c.is_blank()) {
        return Err("container_id is empty".into());
    }
    if let Some(x) = patch.x {
        finite("x", x)?;
    }
    if let Some(y) = patch.y {
        finite("y", y)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::{repair, FailureCategory, NodeUpdate, Row};
    use mesh_store::{Datastore, MemoryDatastore};
    use pretty_assertions::assert_eq;

    fn repairs() -> Vec<String> {
        repair::approved_names()
    }

    #[tokio::test]
    async fn create_is_inserted_with_payload_geometry() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        let names = repairs();
        let now = Utc::now();
        let executor = MutationExecutor::new(&ws, &tables, &names, now);

        let mutation = Mutation::CreateContainer(
            NewContainer::new("A", "ws", "Ideas").with_geometry(10.0, 20.0, 300.0, 200.0),
        );
        let mut tx = store.begin().await.unwrap();
        let applied = executor.apply(tx.as_mut(), 0, &mutation).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].rule.name, repair::DEFAULT_CREATED_AT);

        let row: Row = store.get(&tables.containers, "A").await.unwrap().unwrap();
        assert_eq!(row["x"], 10.0);
        assert_eq!(row["width"], 300.0);
        assert_eq!(row["created_at"], serde_json::to_value(now).unwrap());
    }

    #[tokio::test]
    async fn present_timestamp_is_not_repaired() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        let names = repairs();
        let executor = MutationExecutor::new(&ws, &tables, &names, Utc::now());

        let mut node = NewNode::new("B", "ws", "Node");
        node.created_at = Some(Utc::now());
        let mutation = Mutation::CreateNode(node);
        let mut tx = store.begin().await.unwrap();
        let applied = executor.apply(tx.as_mut(), 0, &mutation).await.unwrap();
        assert!(applied.is_empty());
    }

    #[tokio::test]
    async fn unapproved_repair_halts_before_any_write() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        let names = vec!["auto_layout_position".to_string()];
        let executor = MutationExecutor::new(&ws, &tables, &names, Utc::now());

        let mutation = Mutation::CreateNode(NewNode::new("B", "ws", "Node"));
        let mut tx = store.begin().await.unwrap();
        let err = executor.apply(tx.as_mut(), 0, &mutation).await.unwrap_err();
        assert_eq!(err.category(), FailureCategory::ForbiddenRepair);
        assert_eq!(store.writes_issued(), 0);
    }

    #[tokio::test]
    async fn delete_ignores_configured_repairs() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        store.seed(&tables.nodes, "B", Row::new()).unwrap();
        let names = vec!["infer_parent_container".to_string()];
        let executor = MutationExecutor::new(&ws, &tables, &names, Utc::now());

        let mut tx = store.begin().await.unwrap();
        let applied = executor
            .apply(tx.as_mut(), 0, &Mutation::delete_node("B"))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(applied.is_empty());
        assert!(store.get(&tables.nodes, "B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalid_payloads_are_rejected() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        let names = repairs();
        let executor = MutationExecutor::new(&ws, &tables, &names, Utc::now());
        let mut tx = store.begin().await.unwrap();

        let cases = vec![
            Mutation::CreateContainer(NewContainer::new("A", "other-ws", "A")),
            Mutation::CreateContainer(
                NewContainer::new("A", "ws", "A").with_geometry(0.0, 0.0, -1.0, 5.0),
            ),
            Mutation::CreateNode(NewNode::new("B", "ws", "B").at(f64::NAN, 0.0)),
            Mutation::UpdateNode(NodeUpdate {
                id: "B".into(),
                patch: NodePatch::default(),
            }),
            Mutation::delete_node(""),
        ];
        for mutation in &cases {
            let err = executor.apply(tx.as_mut(), 0, mutation).await.unwrap_err();
            assert_eq!(
                err.category(),
                FailureCategory::ValidationFailure,
                "{mutation}"
            );
        }
        assert_eq!(store.writes_issued(), 0);
    }

    #[tokio::test]
    async fn store_refusal_becomes_mutation_failure() {
        let store = MemoryDatastore::new();
        let ws = WorkspaceId::new("ws");
        let tables = TableMap::default();
        let names = repairs();
        let executor = MutationExecutor::new(&ws, &tables, &names, Utc::now());

        let mut tx = store.begin().await.unwrap();
        let err = executor
            .apply(tx.as_mut(), 3, &Mutation::delete_container("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), FailureCategory::MutationFailure);
        assert!(err.to_string().contains("mutation #3 (delete_container missing)"));
    }
}
