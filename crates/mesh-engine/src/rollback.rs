//! Rollback engine
//!
//! Undoes the most recent committed plan of a workspace by deriving inverse
//! mutations and running them through the plan runner:
//!
//! | committed         | inverse            |
//! |-------------------|--------------------|
//! | `create_container`| `delete_container` |
//! | `create_node`     | `delete_node`      |
//! | `update_*`        | none, irreversible |
//! | `delete_*`        | none, irreversible |
//!
//! Irreversible mutations are reported as warnings and skipped; the rest of
//! the inverse plan still runs. A create whose record the same plan deleted
//! later gets no inverse. Rollback holds no event or telemetry sink.

use crate::context::{catch_panics, EngineContext};
use crate::error::EngineError;
use crate::guard;
use mesh_core::{
    ActorId, ExecutionError, ExecutionResult, IrreversibleMutation, Mutation, Operation,
    WorkspaceId, DELETE_NOT_REVERSIBLE, UPDATE_NOT_REVERSIBLE,
};
use std::fmt;
use tracing::Instrument;

/// Inverse of a committed mutation list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InversePlan {
    /// Deletes to run, in reverse declared order
    pub mutations: Vec<Mutation>,
    /// Mutations that cannot be undone, in declared order
    pub irreversible: Vec<IrreversibleMutation>,
}

/// Mutations of a committed list that have no inverse, in declared order
#[must_use]
pub fn assess_reversibility(mutations: &[Mutation]) -> Vec<IrreversibleMutation> {
    mutations
        .iter()
        .enumerate()
        .filter_map(|(index, mutation)| {
            let reason = match mutation.operation() {
                Operation::Create => return None,
                Operation::Update => UPDATE_NOT_REVERSIBLE,
                Operation::Delete => DELETE_NOT_REVERSIBLE,
            };
            Some(IrreversibleMutation {
                index,
                kind: mutation.kind(),
                target_id: mutation.target_id().to_string(),
                reason: reason.to_string(),
            })
        })
        .collect()
}

/// Derive inverse mutations for a committed list
///
/// A create whose record the same list deleted later has no inverse; the
/// delete is already flagged irreversible.
#[must_use]
pub fn derive_inverse(mutations: &[Mutation]) -> InversePlan {
    let inverse = mutations
        .iter()
        .enumerate()
        .rev()
        .filter(|(index, mutation)| !deleted_later(mutation, &mutations[index + 1..]))
        .filter_map(|(_, mutation)| match mutation {
            Mutation::CreateContainer(c) => Some(Mutation::delete_container(c.id.clone())),
            Mutation::CreateNode(n) => Some(Mutation::delete_node(n.id.clone())),
            Mutation::UpdateContainer(_)
            | Mutation::DeleteContainer(_)
            | Mutation::UpdateNode(_)
            | Mutation::DeleteNode(_)
            | Mutation::UpdateWorkspaceFlags(_) => None,
        })
        .collect();

    InversePlan {
        mutations: inverse,
        irreversible: assess_reversibility(mutations),
    }
}

fn deleted_later(created: &Mutation, rest: &[Mutation]) -> bool {
    rest.iter().any(|later| {
        later.operation() == Operation::Delete
            && later.entity() == created.entity()
            && later.target_id() == created.target_id()
    })
}

/// Best-effort undo of the latest committed plan
pub struct RollbackEngine {
    ctx: EngineContext,
}

impl RollbackEngine {
    pub(crate) fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Roll back the most recent plan executed against `workspace_id`
    ///
    /// Only one step back is possible: the history entry is kept, so a
    /// second call targets the same plan and fails on the now-missing
    /// records.
    pub async fn rollback_last_plan(
        &self,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> ExecutionResult {
        let span = tracing::info_span!("rollback_last_plan", workspace = %workspace_id);
        catch_panics("rollback_last_plan", self.rollback(workspace_id, actor_id))
            .instrument(span)
            .await
    }

    async fn rollback(&self, workspace_id: &WorkspaceId, actor_id: &ActorId) -> ExecutionResult {
        let now = match self.ctx.authorize(workspace_id, actor_id).await {
            Ok(now) => now,
            Err(err) => return reject(&err),
        };

        let latest = match self.ctx.history.latest(workspace_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return reject(&EngineError::NothingToRollBack(workspace_id.clone())),
            Err(e) => {
                return reject(&EngineError::collaborator("reading execution history", e));
            }
        };
        let plan_id = latest.plan.id;

        let inverse = derive_inverse(&latest.plan.mutations);
        let warnings: Vec<String> = inverse.irreversible.iter().map(ToString::to_string).collect();
        for irreversible in &inverse.irreversible {
            tracing::warn!("Cannot roll back {}", irreversible);
        }

        if let Err(err) = guard::check_isolation(&inverse.mutations, &self.ctx.config.tables) {
            return reject(&err).with_warnings(warnings);
        }

        tracing::info!(
            "Rolling back plan {} ({} inverse mutations, {} irreversible)",
            plan_id,
            inverse.mutations.len(),
            inverse.irreversible.len()
        );
        let outcome = self
            .ctx
            .runner(workspace_id, &[], now)
            .run(&inverse.mutations)
            .await;

        if !outcome.is_success() {
            let errors = outcome
                .errors
                .iter()
                .map(|err| {
                    ExecutionError::from(EngineError::Rollback {
                        plan: plan_id,
                        reason: err.to_string(),
                    })
                })
                .collect();
            return ExecutionResult::failed_with(errors, Vec::new()).with_warnings(warnings);
        }

        tracing::info!("Plan {} rolled back", plan_id);
        ExecutionResult::succeeded(Vec::new()).with_warnings(warnings)
    }
}

impl fmt::Debug for RollbackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackEngine")
            .field("ctx", &self.ctx)
            .finish()
    }
}

fn reject(err: &EngineError) -> ExecutionResult {
    tracing::warn!("Rollback rejected: {}", err);
    ExecutionResult::failed_with(vec![err.into()], Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::{
        MutationKind, NewContainer, NewNode, NodePatch, NodeUpdate, WorkspaceFlagsPatch,
        WorkspaceFlagsUpdate,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn creates_invert_to_deletes_in_reverse_order() {
        let inverse = derive_inverse(&[
            Mutation::CreateContainer(NewContainer::new("A", "ws", "A")),
            Mutation::CreateNode(NewNode::new("B", "ws", "B").in_container("A")),
        ]);
        assert_eq!(
            inverse.mutations,
            vec![Mutation::delete_node("B"), Mutation::delete_container("A")]
        );
        assert!(inverse.irreversible.is_empty());
    }

    #[test]
    fn updates_and_deletes_are_flagged_not_dropped() {
        let mutations = vec![
            Mutation::CreateNode(NewNode::new("B", "ws", "B")),
            Mutation::UpdateNode(NodeUpdate {
                id: "C".into(),
                patch: NodePatch {
                    label: Some("renamed".into()),
                    ..NodePatch::default()
                },
            }),
            Mutation::delete_node("D"),
            Mutation::UpdateWorkspaceFlags(WorkspaceFlagsUpdate {
                workspace_id: "ws".into(),
                flags: WorkspaceFlagsPatch {
                    grid_visible: Some(true),
                    ..WorkspaceFlagsPatch::default()
                },
            }),
        ];
        let inverse = derive_inverse(&mutations);

        assert_eq!(inverse.mutations, vec![Mutation::delete_node("B")]);
        let flagged: Vec<_> = inverse
            .irreversible
            .iter()
            .map(|m| (m.index, m.kind, m.target_id.as_str()))
            .collect();
        assert_eq!(
            flagged,
            vec![
                (1, MutationKind::UpdateNode, "C"),
                (2, MutationKind::DeleteNode, "D"),
                (3, MutationKind::UpdateWorkspaceFlags, "ws"),
            ]
        );
        assert!(inverse.irreversible[1].to_string().contains("data lost, cannot restore"));
    }

    #[test]
    fn create_deleted_later_in_plan_has_no_inverse() {
        let mutations = vec![
            Mutation::CreateContainer(NewContainer::new("A", "ws", "A")),
            Mutation::CreateNode(NewNode::new("A", "ws", "A")),
            Mutation::delete_container("A"),
        ];
        let inverse = derive_inverse(&mutations);

        assert_eq!(inverse.mutations, vec![Mutation::delete_node("A")]);
        assert_eq!(inverse.irreversible.len(), 1);
        assert_eq!(inverse.irreversible[0].kind, MutationKind::DeleteContainer);
    }

    #[test]
    fn creates_only_plan_is_fully_reversible() {
        let mutations = vec![Mutation::CreateContainer(NewContainer::new("A", "ws", "A"))];
        assert!(assess_reversibility(&mutations).is_empty());
    }
}
