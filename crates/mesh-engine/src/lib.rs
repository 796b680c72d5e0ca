//! Mind Mesh plan execution and rollback engine
//!
//! Turns fully formed plans into committed canvas changes:
//! 1. **Guards**: canvas lock, table isolation, repair whitelist
//! 2. **Execution**: ordered mutations inside one transaction, all or nothing
//! 3. **After commit**: declared events, telemetry, bounded history
//! 4. **Rollback**: one-step best-effort undo of the latest plan
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mesh_engine::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryDatastore::new());
//! let locks = Arc::new(MemoryLockService::new(Arc::new(SystemClock)));
//! let engine = MeshEngine::builder()
//!     .datastore(store)
//!     .locks(locks.clone())
//!     .build()?;
//!
//! let ws = WorkspaceId::new("ws-1");
//! let actor = ActorId::new("alice");
//! locks.acquire(&ws, &actor, chrono::Duration::minutes(5))?;
//!
//! let plan = Plan::new()
//!     .with_mutation(Mutation::CreateContainer(NewContainer::new("A", "ws-1", "Ideas")))
//!     .with_event("mindmesh.canvas.updated");
//! let result = engine.execute_plan(plan, &ws, &actor).await;
//! assert!(result.success);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

mod context;

pub mod check;
pub mod engine;
pub mod error;
pub mod executor;
pub mod guard;
pub mod orchestrator;
pub mod rollback;
pub mod runner;
pub mod telemetry;

pub use check::check_plan;
pub use engine::{MeshEngine, MeshEngineBuilder};
pub use error::EngineError;
pub use orchestrator::Orchestrator;
pub use rollback::{assess_reversibility, derive_inverse, InversePlan, RollbackEngine};
pub use telemetry::{
    DomainEvent, EventSink, RecordingSink, TelemetryRecord, TelemetrySink, TracingSink,
};

/// Common imports for embedding the engine
pub mod prelude {
    pub use crate::engine::{MeshEngine, MeshEngineBuilder};
    pub use crate::telemetry::{EventSink, RecordingSink, TelemetrySink, TracingSink};
    pub use mesh_core::{
        ActorId, EngineConfig, ExecutionResult, FailureCategory, Mutation, NewContainer, NewNode,
        Plan, Precondition, WorkspaceId,
    };
    pub use mesh_store::{
        Clock, Datastore, FixedClock, HistoryStore, LockProvider, MemoryDatastore,
        MemoryHistoryStore, MemoryLockService, SystemClock,
    };
}
