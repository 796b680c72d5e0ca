//! Engine facade and builder

use crate::context::EngineContext;
use crate::orchestrator::Orchestrator;
use crate::rollback::RollbackEngine;
use crate::telemetry::{EventSink, TelemetrySink, TracingSink};
use mesh_core::{ActorId, CoreError, EngineConfig, ExecutionResult, Plan, StoredPlan, WorkspaceId};
use mesh_store::{
    Clock, Datastore, HistoryStore, LockProvider, MemoryHistoryStore, StoreError, SystemClock,
};
use std::sync::Arc;

/// Plan execution and rollback over shared collaborators
///
/// Stateless between calls; safe to share across tasks behind an `Arc`.
#[derive(Debug)]
pub struct MeshEngine {
    ctx: EngineContext,
    orchestrator: Orchestrator,
    rollback: RollbackEngine,
}

impl MeshEngine {
    /// Start building an engine
    #[must_use]
    pub fn builder() -> MeshEngineBuilder {
        MeshEngineBuilder::default()
    }

    /// Execute a plan; see [`Orchestrator::execute_plan`]
    pub async fn execute_plan(
        &self,
        plan: Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> ExecutionResult {
        self.orchestrator
            .execute_plan(plan, workspace_id, actor_id)
            .await
    }

    /// Roll back the latest plan; see [`RollbackEngine::rollback_last_plan`]
    pub async fn rollback_last_plan(
        &self,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> ExecutionResult {
        self.rollback
            .rollback_last_plan(workspace_id, actor_id)
            .await
    }

    /// Stored plans for a workspace, oldest first (debugging aid)
    ///
    /// # Errors
    /// Propagates history store failures.
    pub async fn get_execution_history(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<StoredPlan>, StoreError> {
        self.ctx.history.list(workspace_id).await
    }

    /// Forget every stored plan for a workspace (debugging aid)
    ///
    /// # Errors
    /// Propagates history store failures.
    pub async fn clear_execution_history(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<(), StoreError> {
        tracing::debug!("Clearing execution history of {}", workspace_id);
        self.ctx.history.clear(workspace_id).await
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }
}

/// Builder for [`MeshEngine`]
///
/// Datastore and lock provider are required. History defaults to an
/// in-memory store of the configured depth, the clock to the system clock
/// and both sinks to [`TracingSink`].
#[derive(Default)]
pub struct MeshEngineBuilder {
    config: EngineConfig,
    datastore: Option<Arc<dyn Datastore>>,
    locks: Option<Arc<dyn LockProvider>>,
    history: Option<Arc<dyn HistoryStore>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<Arc<dyn EventSink>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl MeshEngineBuilder {
    /// With configuration
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// With datastore
    #[must_use]
    pub fn datastore(mut self, datastore: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(datastore);
        self
    }

    /// With lock provider
    #[must_use]
    pub fn locks(mut self, locks: Arc<dyn LockProvider>) -> Self {
        self.locks = Some(locks);
        self
    }

    /// With history store
    #[must_use]
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// With clock
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// With event sink
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// With telemetry sink
    #[must_use]
    pub fn telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Validate configuration and assemble the engine
    ///
    /// # Errors
    /// `CoreError::Config` for an invalid configuration or a missing
    /// datastore/lock provider.
    pub fn build(self) -> Result<MeshEngine, CoreError> {
        self.config.validate()?;
        let datastore = self
            .datastore
            .ok_or_else(|| CoreError::Config("a datastore is required".to_string()))?;
        let locks = self
            .locks
            .ok_or_else(|| CoreError::Config("a lock provider is required".to_string()))?;
        let depth = self.config.history_depth;

        let ctx = EngineContext {
            datastore,
            locks,
            history: self
                .history
                .unwrap_or_else(|| Arc::new(MemoryHistoryStore::new(depth))),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            config: Arc::new(self.config),
        };
        let orchestrator = Orchestrator::new(
            ctx.clone(),
            self.events.unwrap_or_else(|| Arc::new(TracingSink)),
            self.telemetry.unwrap_or_else(|| Arc::new(TracingSink)),
        );
        let rollback = RollbackEngine::new(ctx.clone());

        tracing::debug!(
            "Engine ready (history depth {}, repairs {:?})",
            depth,
            ctx.config.repairs
        );
        Ok(MeshEngine {
            ctx,
            orchestrator,
            rollback,
        })
    }
}
