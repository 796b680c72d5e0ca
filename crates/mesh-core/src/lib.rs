//! Mind Mesh core model
//!
//! Types shared by the plan engine and its collaborators:
//! - Identifiers for workspaces, actors, canvas entities and plans
//! - The closed set of seven canvas mutations and the plans grouping them
//! - The canvas table whitelist guarding the protected project/task domain
//! - The approved repair catalogue
//! - Execution results and the failure taxonomy
//! - Engine configuration
//!
//! # Example
//!
//! ```rust
//! use mesh_core::{Mutation, NewContainer, NewNode, Plan, Precondition};
//!
//! let plan = Plan::new()
//!     .with_precondition(Precondition::WorkspaceExists)
//!     .with_mutation(Mutation::CreateContainer(NewContainer::new("A", "ws-1", "Ideas")))
//!     .with_mutation(Mutation::CreateNode(NewNode::new("B", "ws-1", "First").in_container("A")))
//!     .with_event("mindmesh.canvas.updated");
//!
//! assert_eq!(plan.len(), 2);
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod history;
pub mod ids;
pub mod mutation;
pub mod plan;
pub mod repair;
pub mod result;
pub mod row;
pub mod tables;

pub use config::{EngineConfig, MAX_HISTORY_DEPTH};
pub use error::CoreError;
pub use history::{IrreversibleMutation, StoredPlan, DELETE_NOT_REVERSIBLE, UPDATE_NOT_REVERSIBLE};
pub use ids::{ActorId, ContainerId, NodeId, PlanId, WorkspaceId};
pub use mutation::{
    ContainerDelete, ContainerPatch, ContainerUpdate, Mutation, MutationKind, NewContainer,
    NewNode, NodeDelete, NodePatch, NodeUpdate, Operation, WorkspaceFlagsPatch,
    WorkspaceFlagsUpdate,
};
pub use plan::{Plan, Precondition};
pub use repair::{AppliedRepair, RepairKind, RepairRule, APPROVED_REPAIRS};
pub use result::{ExecutionError, ExecutionResult, FailureCategory};
pub use row::{to_row, Row};
pub use tables::{EntityKind, TableMap, CANVAS_TABLES, PROTECTED_TABLES};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
