//! Collaborators shared by the orchestrator and the rollback engine

use crate::error::EngineError;
use crate::executor::MutationExecutor;
use crate::guard;
use crate::runner::PlanRunner;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use mesh_core::{
    tables, ActorId, EngineConfig, EntityKind, ExecutionResult, Precondition, WorkspaceId,
};
use mesh_store::{Clock, Datastore, HistoryStore, LockProvider};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Datastore, lock, history, clock and configuration handles
#[derive(Clone)]
pub(crate) struct EngineContext {
    pub(crate) datastore: Arc<dyn Datastore>,
    pub(crate) locks: Arc<dyn LockProvider>,
    pub(crate) history: Arc<dyn HistoryStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: Arc<EngineConfig>,
}

impl EngineContext {
    /// Read the lock and validate it for `actor_id`; returns the check time
    pub(crate) async fn authorize(
        &self,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> Result<DateTime<Utc>, EngineError> {
        let lock = self
            .locks
            .current_lock(workspace_id)
            .await
            .map_err(|e| EngineError::collaborator("reading canvas lock", e))?;
        let now = self.clock.now();
        guard::check_lock(lock.as_ref(), workspace_id, actor_id, now)?;
        Ok(now)
    }

    /// Runner bound to one workspace and execution time
    pub(crate) fn runner<'a>(
        &'a self,
        workspace_id: &'a WorkspaceId,
        repairs: &'a [String],
        now: DateTime<Utc>,
    ) -> PlanRunner<'a> {
        PlanRunner::new(
            self.datastore.as_ref(),
            MutationExecutor::new(workspace_id, &self.config.tables, repairs, now),
        )
    }

    /// Evaluate preconditions against committed state, read-only
    pub(crate) async fn check_preconditions(
        &self,
        preconditions: &[Precondition],
        workspace_id: &WorkspaceId,
    ) -> Result<(), EngineError> {
        for precondition in preconditions {
            let (kind, id, expected) = match precondition {
                Precondition::WorkspaceExists => (EntityKind::Workspace, workspace_id.as_str(), true),
                Precondition::ContainerExists { id } => (EntityKind::Container, id.as_str(), true),
                Precondition::ContainerAbsent { id } => (EntityKind::Container, id.as_str(), false),
                Precondition::NodeExists { id } => (EntityKind::Node, id.as_str(), true),
                Precondition::NodeAbsent { id } => (EntityKind::Node, id.as_str(), false),
            };

            let table = self.config.tables.table_for(kind);
            if !tables::is_canvas_table(table) {
                return Err(EngineError::ForbiddenRead {
                    precondition: precondition.to_string(),
                    table: table.to_string(),
                });
            }

            let found = self
                .datastore
                .exists(table, id)
                .await
                .map_err(|e| EngineError::collaborator("evaluating preconditions", e))?;
            if found != expected {
                return Err(EngineError::PreconditionFailed(precondition.to_string()));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineContext")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Run an entry point, turning a panic into an `unknown` failure
pub(crate) async fn catch_panics<F>(operation: &'static str, entry: F) -> ExecutionResult
where
    F: Future<Output = ExecutionResult>,
{
    match AssertUnwindSafe(entry).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!("{} panicked: {}", operation, detail);
            let err = EngineError::Internal(format!("{operation} panicked: {detail}"));
            ExecutionResult::failed_with(vec![err.into()], Vec::new())
        }
    }
}
