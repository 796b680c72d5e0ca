//! Domain events and telemetry
//!
//! Both are emitted by the orchestrator only after a plan commits. The
//! rollback engine holds no sink at all.

use chrono::{DateTime, Utc};
use mesh_core::{ActorId, PlanId, WorkspaceId};
use parking_lot::Mutex;
use serde::Serialize;

/// Tracing target for telemetry records
pub const TELEMETRY_TARGET: &str = "mindmesh::telemetry";

/// Tracing target for domain events
pub const EVENT_TARGET: &str = "mindmesh::events";

/// Domain event published after commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainEvent {
    /// Event name, as declared by the plan
    pub name: String,
    /// Workspace the plan ran against
    pub workspace_id: WorkspaceId,
    /// Committed plan
    pub plan_id: PlanId,
    /// Actor holding the lock
    pub actor_id: ActorId,
    /// Emission time
    pub emitted_at: DateTime<Utc>,
}

/// Telemetry record, one per emitted domain event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryRecord {
    /// Source label from configuration
    pub source: String,
    /// Domain event this record accompanies
    pub event: String,
    /// Workspace
    pub workspace_id: WorkspaceId,
    /// Committed plan
    pub plan_id: PlanId,
    /// Mutations committed
    pub mutation_count: usize,
    /// Repairs applied
    pub repair_count: usize,
    /// Record time
    pub recorded_at: DateTime<Utc>,
}

/// Receives domain events
pub trait EventSink: Send + Sync {
    /// Publish one event
    fn emit(&self, event: &DomainEvent);
}

/// Receives telemetry records
pub trait TelemetrySink: Send + Sync {
    /// Record one telemetry entry
    fn record(&self, record: &TelemetryRecord);
}

/// Sink that writes events and telemetry to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &DomainEvent) {
        tracing::info!(
            target: EVENT_TARGET,
            event = %event.name,
            workspace = %event.workspace_id,
            plan = %event.plan_id,
            actor = %event.actor_id,
            "Domain event emitted"
        );
    }
}

impl TelemetrySink for TracingSink {
    fn record(&self, record: &TelemetryRecord) {
        tracing::info!(
            target: TELEMETRY_TARGET,
            source = %record.source,
            event = %record.event,
            workspace = %record.workspace_id,
            plan = %record.plan_id,
            mutations = record.mutation_count,
            repairs = record.repair_count,
            "Telemetry recorded"
        );
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DomainEvent>>,
    records: Mutex<Vec<TelemetryRecord>>,
}

impl RecordingSink {
    /// Create empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far
    #[must_use]
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    /// Telemetry received so far
    #[must_use]
    pub fn telemetry(&self) -> Vec<TelemetryRecord> {
        self.records.lock().clone()
    }

    /// Events plus telemetry records received
    #[must_use]
    pub fn total(&self) -> usize {
        self.events.lock().len() + self.records.lock().len()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &DomainEvent) {
        self.events.lock().push(event.clone());
    }
}

impl TelemetrySink for RecordingSink {
    fn record(&self, record: &TelemetryRecord) {
        self.records.lock().push(record.clone());
    }
}
