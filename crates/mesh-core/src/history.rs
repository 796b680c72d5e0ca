//! Stored plans (execution history entries)

use crate::ids::{ActorId, WorkspaceId};
use crate::mutation::MutationKind;
use crate::plan::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason recorded for deletes during rollback
pub const DELETE_NOT_REVERSIBLE: &str =
    "data lost, cannot restore (the deleted record's prior state was not captured)";

/// Reason recorded for updates during rollback
pub const UPDATE_NOT_REVERSIBLE: &str =
    "previous field values were not captured, cannot restore";

/// A mutation that rollback cannot undo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrreversibleMutation {
    /// Position in the plan
    pub index: usize,
    /// Mutation kind
    pub kind: MutationKind,
    /// Record the mutation wrote
    pub target_id: String,
    /// Why it cannot be undone
    pub reason: String,
}

impl fmt::Display for IrreversibleMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mutation #{} {} {}: {}",
            self.index, self.kind, self.target_id, self.reason
        )
    }
}

/// A plan that committed, plus what rollback needs to know about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlan {
    /// The committed plan
    pub plan: Plan,
    /// Workspace it ran against
    pub workspace_id: WorkspaceId,
    /// Actor that held the lock
    pub actor_id: ActorId,
    /// Commit time
    pub executed_at: DateTime<Utc>,
    /// True when every mutation has an inverse
    pub fully_reversible: bool,
    /// Mutations without an inverse
    pub irreversible: Vec<IrreversibleMutation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irreversible_display_names_target_and_reason() {
        let entry = IrreversibleMutation {
            index: 2,
            kind: MutationKind::DeleteNode,
            target_id: "B".into(),
            reason: DELETE_NOT_REVERSIBLE.into(),
        };
        let line = entry.to_string();
        assert!(line.contains("delete_node B"));
        assert!(line.contains("data lost, cannot restore"));
    }
}
