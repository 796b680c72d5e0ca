//! Engine error type
//!
//! Every variant maps onto exactly one [`FailureCategory`]. Public entry
//! points never return these directly; they fold them into an
//! [`ExecutionResult`](mesh_core::ExecutionResult).

use chrono::{DateTime, Utc};
use mesh_core::{ActorId, ExecutionError, FailureCategory, PlanId, WorkspaceId};
use mesh_store::StoreError;

/// Engine failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No lock recorded for the workspace
    #[error("workspace {workspace} is not locked; acquire the canvas lock before writing")]
    NoLock {
        /// Workspace
        workspace: WorkspaceId,
    },

    /// Lock belongs to another actor
    #[error("canvas lock on {workspace} is held by {holder}, not {actor}")]
    LockHeldByOther {
        /// Workspace
        workspace: WorkspaceId,
        /// Current holder
        holder: ActorId,
        /// Requesting actor
        actor: ActorId,
    },

    /// Lock has expired
    #[error("canvas lock on {workspace} held by {actor} expired at {expires_at}")]
    LockExpired {
        /// Workspace
        workspace: WorkspaceId,
        /// Requesting actor (and former holder)
        actor: ActorId,
        /// Expiry
        expires_at: DateTime<Utc>,
    },

    /// Mutation resolves to a table outside the canvas whitelist
    #[error("mutation #{index} ({mutation}) targets table '{table}', which is outside the canvas whitelist")]
    ForbiddenTable {
        /// Position in the plan
        index: usize,
        /// Mutation summary
        mutation: String,
        /// Resolved table
        table: String,
    },

    /// Precondition read would touch a table outside the canvas whitelist
    #[error("precondition '{precondition}' reads table '{table}', which is outside the canvas whitelist")]
    ForbiddenRead {
        /// Precondition summary
        precondition: String,
        /// Resolved table
        table: String,
    },

    /// Repair name not in the approved catalogue
    #[error("repair '{0}' is not an approved repair")]
    ForbiddenRepair(String),

    /// Declared precondition does not hold
    #[error("precondition not satisfied: {0}")]
    PreconditionFailed(String),

    /// No stored plan to roll back
    #[error("no executed plan recorded for workspace {0}; nothing to roll back")]
    NothingToRollBack(WorkspaceId),

    /// Malformed mutation payload
    #[error("invalid mutation #{index} ({mutation}): {reason}")]
    InvalidMutation {
        /// Position in the plan
        index: usize,
        /// Mutation summary
        mutation: String,
        /// What is wrong
        reason: String,
    },

    /// Plan exceeds the configured size limit
    #[error("plan has {count} mutations; the configured limit is {limit}")]
    PlanTooLarge {
        /// Mutations in the plan
        count: usize,
        /// Configured limit
        limit: usize,
    },

    /// Datastore refused a write
    #[error("failed to apply mutation #{index} ({mutation}): {source}")]
    Mutation {
        /// Position in the plan
        index: usize,
        /// Mutation summary
        mutation: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Datastore could not open or commit the transaction
    #[error("failed to {stage} transaction: {source}")]
    Transaction {
        /// `begin` or `commit`
        stage: &'static str,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Inverse mutations could not be applied
    #[error("rollback of plan {plan} failed: {reason}")]
    Rollback {
        /// Plan being rolled back
        plan: PlanId,
        /// Underlying failure
        reason: String,
    },

    /// Lock, history or datastore read infrastructure failed
    #[error("{context}: {source}")]
    Collaborator {
        /// What the engine was doing
        context: &'static str,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// Panic or other unexpected condition
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Failure category reported to callers
    #[must_use]
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::NoLock { .. } | Self::LockHeldByOther { .. } | Self::LockExpired { .. } => {
                FailureCategory::LockViolation
            }
            Self::ForbiddenTable { .. } | Self::ForbiddenRead { .. } => {
                FailureCategory::ForbiddenOperation
            }
            Self::ForbiddenRepair(_) => FailureCategory::ForbiddenRepair,
            Self::PreconditionFailed(_) | Self::NothingToRollBack(_) => {
                FailureCategory::PreconditionFailure
            }
            Self::InvalidMutation { .. } | Self::PlanTooLarge { .. } => {
                FailureCategory::ValidationFailure
            }
            Self::Mutation { .. } | Self::Transaction { .. } => FailureCategory::MutationFailure,
            Self::Rollback { .. } => FailureCategory::RollbackFailure,
            Self::Collaborator { .. } | Self::Internal(_) => FailureCategory::Unknown,
        }
    }

    /// Create collaborator error
    #[inline]
    pub fn collaborator(context: &'static str, source: StoreError) -> Self {
        Self::Collaborator { context, source }
    }
}

impl From<&EngineError> for ExecutionError {
    fn from(err: &EngineError) -> Self {
        ExecutionError::new(err.category(), err.to_string())
    }
}

impl From<EngineError> for ExecutionError {
    fn from(err: EngineError) -> Self {
        Self::from(&err)
    }
}
