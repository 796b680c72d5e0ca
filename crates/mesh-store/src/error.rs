//! Error types for the datastore, lock and history collaborators

use mesh_core::ActorId;

/// Collaborator errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Patch or delete of a missing record
    #[error("record '{id}' not found in {table}")]
    NotFound {
        /// Table name
        table: String,
        /// Record id
        id: String,
    },

    /// Insert of an id that already exists
    #[error("record '{id}' already exists in {table}")]
    AlreadyExists {
        /// Table name
        table: String,
        /// Record id
        id: String,
    },

    /// Table is not known to the backend
    #[error("unknown table {0}")]
    UnknownTable(String),

    /// Failure injected by a test harness
    #[error("injected failure writing '{id}' in {table}")]
    Injected {
        /// Table name
        table: String,
        /// Record id
        id: String,
    },

    /// Commit was refused by the backend
    #[error("commit refused: {0}")]
    CommitFailed(String),

    /// Canvas lock is held by someone else
    #[error("canvas lock is held by {holder}")]
    LockHeld {
        /// Current holder
        holder: ActorId,
    },

    /// Actor does not hold the canvas lock
    #[error("canvas lock is not held by {0}")]
    LockNotHeld(ActorId),

    /// Backend infrastructure error
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Create not-found error
    pub fn not_found(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.into(),
        }
    }

    /// Create already-exists error
    pub fn already_exists(table: impl Into<String>, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            table: table.into(),
            id: id.into(),
        }
    }

    /// True when the error describes the data rather than the infrastructure
    #[inline]
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::AlreadyExists { .. }
                | Self::Injected { .. }
                | Self::CommitFailed(_)
        )
    }
}
