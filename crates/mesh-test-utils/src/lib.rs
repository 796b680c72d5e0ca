//! Testing utilities for the Mind Mesh workspace
//!
//! Shared fixtures: an engine wired to in-memory collaborators with a fixed
//! clock, a seeded workspace and a held lock, plus mutation shorthands.

#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use mesh_core::{
    ActorId, ContainerPatch, ContainerUpdate, EngineConfig, ExecutionResult, Mutation,
    NewContainer, NewNode, NodePatch, NodeUpdate, Plan, Row, WorkspaceId,
};
use mesh_engine::{MeshEngine, RecordingSink};
use mesh_store::{Clock, Datastore, FixedClock, MemoryDatastore, MemoryLockService};
use serde_json::json;
use std::sync::Arc;

pub const WORKSPACE: &str = "ws-test";
pub const ACTOR: &str = "alice";
pub const OTHER_ACTOR: &str = "bob";
pub const CANVAS_EVENT: &str = "mindmesh.canvas.updated";

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

pub fn workspace_row(workspace_id: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".to_string(), json!(workspace_id));
    row.insert("grid_visible".to_string(), json!(true));
    row.insert("read_only".to_string(), json!(false));
    row
}

pub fn container(id: &str) -> Mutation {
    Mutation::CreateContainer(
        NewContainer::new(id, WORKSPACE, format!("Container {id}"))
            .with_geometry(10.0, 20.0, 320.0, 240.0),
    )
}

pub fn node(id: &str) -> Mutation {
    Mutation::CreateNode(NewNode::new(id, WORKSPACE, format!("Node {id}")).at(40.0, 60.0))
}

pub fn node_in(id: &str, container_id: &str) -> Mutation {
    Mutation::CreateNode(
        NewNode::new(id, WORKSPACE, format!("Node {id}"))
            .in_container(container_id)
            .at(40.0, 60.0),
    )
}

pub fn rename_node(id: &str, label: &str) -> Mutation {
    Mutation::UpdateNode(NodeUpdate {
        id: id.into(),
        patch: NodePatch {
            label: Some(label.to_string()),
            ..NodePatch::default()
        },
    })
}

pub fn collapse_container(id: &str) -> Mutation {
    Mutation::UpdateContainer(ContainerUpdate {
        id: id.into(),
        patch: ContainerPatch {
            collapsed: Some(true),
            ..ContainerPatch::default()
        },
    })
}

/// Plan declaring the standard canvas event
pub fn plan_of(mutations: impl IntoIterator<Item = Mutation>) -> Plan {
    Plan::new()
        .with_mutations(mutations)
        .with_event(CANVAS_EVENT)
}

/// Engine over in-memory collaborators
pub struct TestHarness {
    pub engine: MeshEngine,
    pub store: MemoryDatastore,
    pub locks: Arc<MemoryLockService>,
    pub clock: Arc<FixedClock>,
    pub sink: Arc<RecordingSink>,
    pub workspace: WorkspaceId,
    pub actor: ActorId,
    pub config: EngineConfig,
}

impl TestHarness {
    /// Default config, workspace seeded, lock held by [`ACTOR`]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let harness = Self::unlocked(config);
        harness.lock_for(ACTOR, Duration::minutes(5));
        harness
    }

    /// Workspace seeded, no lock taken
    pub fn unlocked(config: EngineConfig) -> Self {
        let clock = Arc::new(FixedClock::at(fixed_time()));
        let store = MemoryDatastore::new();
        for table in [
            &config.tables.containers,
            &config.tables.nodes,
            &config.tables.workspaces,
        ] {
            store.register_table(table);
        }
        store
            .seed(&config.tables.workspaces, WORKSPACE, workspace_row(WORKSPACE))
            .unwrap();

        let locks = Arc::new(MemoryLockService::new(clock.clone()));
        let sink = Arc::new(RecordingSink::new());
        let engine = MeshEngine::builder()
            .config(config.clone())
            .datastore(Arc::new(store.clone()))
            .locks(locks.clone())
            .clock(clock.clone())
            .events(sink.clone())
            .telemetry(sink.clone())
            .build()
            .unwrap();

        Self {
            engine,
            store,
            locks,
            clock,
            sink,
            workspace: WorkspaceId::new(WORKSPACE),
            actor: ActorId::new(ACTOR),
            config,
        }
    }

    pub fn lock_for(&self, actor: &str, ttl: Duration) {
        self.locks
            .acquire(&self.workspace, &ActorId::new(actor), ttl)
            .unwrap();
    }

    pub async fn execute(&self, plan: Plan) -> ExecutionResult {
        self.engine
            .execute_plan(plan, &self.workspace, &self.actor)
            .await
    }

    pub async fn execute_as(&self, plan: Plan, actor: &str) -> ExecutionResult {
        self.engine
            .execute_plan(plan, &self.workspace, &ActorId::new(actor))
            .await
    }

    pub async fn rollback(&self) -> ExecutionResult {
        self.engine
            .rollback_last_plan(&self.workspace, &self.actor)
            .await
    }

    pub async fn container_row(&self, id: &str) -> Option<Row> {
        self.store
            .get(&self.config.tables.containers, id)
            .await
            .unwrap()
    }

    pub async fn node_row(&self, id: &str) -> Option<Row> {
        self.store.get(&self.config.tables.nodes, id).await.unwrap()
    }

    /// Canvas rows excluding the seeded workspace
    pub fn entity_rows(&self) -> usize {
        self.store.row_count(&self.config.tables.containers)
            + self.store.row_count(&self.config.tables.nodes)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
