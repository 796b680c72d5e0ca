//! Execution orchestrator
//!
//! Gates, in order: lock, isolation, plan size, preconditions, then the
//! transactional run. Events, telemetry and the history entry follow a
//! successful commit and nothing else.

use crate::context::{catch_panics, EngineContext};
use crate::error::EngineError;
use crate::guard;
use crate::rollback::assess_reversibility;
use crate::runner::RunOutcome;
use crate::telemetry::{DomainEvent, EventSink, TelemetryRecord, TelemetrySink};
use chrono::{DateTime, Utc};
use mesh_core::{ActorId, ExecutionError, ExecutionResult, Plan, StoredPlan, WorkspaceId};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Plan execution entry point
pub struct Orchestrator {
    ctx: EngineContext,
    events: Arc<dyn EventSink>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Orchestrator {
    pub(crate) fn new(
        ctx: EngineContext,
        events: Arc<dyn EventSink>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            ctx,
            events,
            telemetry,
        }
    }

    /// Execute `plan` against `workspace_id` on behalf of `actor_id`
    ///
    /// Never fails outright: every error, including a panic inside the
    /// pipeline, comes back as a failed [`ExecutionResult`].
    pub async fn execute_plan(
        &self,
        plan: Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> ExecutionResult {
        let span = tracing::info_span!("execute_plan", plan = %plan.id, workspace = %workspace_id);
        catch_panics("execute_plan", self.execute(plan, workspace_id, actor_id))
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        plan: Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> ExecutionResult {
        tracing::info!(
            "Executing plan {} ({} mutations) for {}",
            plan.id,
            plan.len(),
            actor_id
        );

        let now = match self.admit(&plan, workspace_id, actor_id).await {
            Ok(now) => now,
            Err(err) => {
                tracing::warn!("Plan {} rejected: {}", plan.id, err);
                return ExecutionResult::failed_with(vec![err.into()], Vec::new());
            }
        };

        let outcome = self
            .ctx
            .runner(workspace_id, &self.ctx.config.repairs, now)
            .run(&plan.mutations)
            .await;
        let repairs = outcome.repair_trail();
        if !outcome.is_success() {
            let errors: Vec<ExecutionError> = outcome.errors.iter().map(Into::into).collect();
            return ExecutionResult::failed_with(errors, repairs);
        }
        tracing::info!(
            "Plan {} committed ({} mutations, {} repairs)",
            plan.id,
            outcome.applied,
            outcome.repairs.len()
        );

        let telemetry = self.publish(&plan, workspace_id, actor_id, &outcome);
        let mut result =
            ExecutionResult::succeeded(repairs).with_emissions(plan.events.clone(), telemetry);

        if let Err(err) = self.remember(plan, workspace_id, actor_id, now).await {
            tracing::warn!("Committed plan not recorded in history: {}", err);
            result = result.with_warnings(vec![format!(
                "plan committed but could not be recorded; it cannot be rolled back: {err}"
            )]);
        }
        result
    }

    /// Every gate that must pass before a write
    async fn admit(
        &self,
        plan: &Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
    ) -> Result<DateTime<Utc>, EngineError> {
        let now = self.ctx.authorize(workspace_id, actor_id).await?;
        guard::check_isolation(&plan.mutations, &self.ctx.config.tables)?;

        let limit = self.ctx.config.max_plan_mutations;
        if plan.len() > limit {
            return Err(EngineError::PlanTooLarge {
                count: plan.len(),
                limit,
            });
        }

        self.ctx
            .check_preconditions(&plan.preconditions, workspace_id)
            .await?;
        Ok(now)
    }

    /// Emit declared events, one telemetry record each; returns the record count
    fn publish(
        &self,
        plan: &Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
        outcome: &RunOutcome,
    ) -> usize {
        let now = self.ctx.clock.now();
        let mut recorded = 0;
        for name in &plan.events {
            self.events.emit(&DomainEvent {
                name: name.clone(),
                workspace_id: workspace_id.clone(),
                plan_id: plan.id,
                actor_id: actor_id.clone(),
                emitted_at: now,
            });
            self.telemetry.record(&TelemetryRecord {
                source: self.ctx.config.telemetry_source.clone(),
                event: name.clone(),
                workspace_id: workspace_id.clone(),
                plan_id: plan.id,
                mutation_count: outcome.applied,
                repair_count: outcome.repairs.len(),
                recorded_at: now,
            });
            recorded += 1;
        }
        recorded
    }

    async fn remember(
        &self,
        plan: Plan,
        workspace_id: &WorkspaceId,
        actor_id: &ActorId,
        executed_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let irreversible = assess_reversibility(&plan.mutations);
        let entry = StoredPlan {
            fully_reversible: irreversible.is_empty(),
            irreversible,
            plan,
            workspace_id: workspace_id.clone(),
            actor_id: actor_id.clone(),
            executed_at,
        };
        self.ctx
            .history
            .append(entry)
            .await
            .map_err(|e| EngineError::collaborator("recording execution history", e))
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
