//! Canvas table whitelist
//!
//! Every mutation resolves to exactly one physical table. Only the tables in
//! [`CANVAS_TABLES`] may ever be written; the project/task tables in
//! [`PROTECTED_TABLES`] belong to the adjacent domain and are off limits.
//!
//! The constants are cross-checked at compile time below, and the engine
//! re-checks each resolved table against the whitelist on every call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default physical table for containers
pub const CONTAINER_TABLE: &str = "mindmesh_containers";
/// Default physical table for nodes
pub const NODE_TABLE: &str = "mindmesh_nodes";
/// Default physical table for workspaces (display flags)
pub const WORKSPACE_TABLE: &str = "mindmesh_workspaces";

/// Tables the engine is allowed to write
pub const CANVAS_TABLES: &[&str] = &[CONTAINER_TABLE, NODE_TABLE, WORKSPACE_TABLE];

/// Tables owned by the protected project/task domain
pub const PROTECTED_TABLES: &[&str] = &[
    "projects",
    "project_members",
    "project_tracks",
    "roadmap_items",
    "tasks",
    "task_dependencies",
    "task_assignments",
    "milestones",
];

const fn str_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut i = 0;
    while i < a.len() {
        if a[i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

const fn contains(set: &[&str], name: &str) -> bool {
    let mut i = 0;
    while i < set.len() {
        if str_eq(set[i], name) {
            return true;
        }
        i += 1;
    }
    false
}

const fn disjoint(a: &[&str], b: &[&str]) -> bool {
    let mut i = 0;
    while i < a.len() {
        if contains(b, a[i]) {
            return false;
        }
        i += 1;
    }
    true
}

const _: () = assert!(disjoint(CANVAS_TABLES, PROTECTED_TABLES));
const _: () = assert!(contains(CANVAS_TABLES, CONTAINER_TABLE));
const _: () = assert!(contains(CANVAS_TABLES, NODE_TABLE));
const _: () = assert!(contains(CANVAS_TABLES, WORKSPACE_TABLE));

/// True when `table` is one of the canvas-only tables
#[inline]
#[must_use]
pub fn is_canvas_table(table: &str) -> bool {
    contains(CANVAS_TABLES, table)
}

/// True when `table` belongs to the protected domain
#[inline]
#[must_use]
pub fn is_protected_table(table: &str) -> bool {
    contains(PROTECTED_TABLES, table)
}

/// Kind of canvas entity a mutation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Container (group/frame on the canvas)
    Container,
    /// Node (card on the canvas)
    Node,
    /// The workspace row itself
    Workspace,
}

impl EntityKind {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Node => "node",
            Self::Workspace => "workspace",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical table names per entity kind
///
/// Deployments may rename tables. A mapping onto a table outside
/// [`CANVAS_TABLES`] is not rejected here; the isolation guard refuses every
/// plan that would touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableMap {
    /// Table holding containers
    pub containers: String,
    /// Table holding nodes
    pub nodes: String,
    /// Table holding workspace rows
    pub workspaces: String,
}

impl TableMap {
    /// Resolve the table for an entity kind
    #[inline]
    #[must_use]
    pub fn table_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Container => &self.containers,
            EntityKind::Node => &self.nodes,
            EntityKind::Workspace => &self.workspaces,
        }
    }
}

impl Default for TableMap {
    fn default() -> Self {
        Self {
            containers: CONTAINER_TABLE.to_string(),
            nodes: NODE_TABLE.to_string(),
            workspaces: WORKSPACE_TABLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_map_resolves_to_canvas_tables() {
        let map = TableMap::default();
        for kind in [EntityKind::Container, EntityKind::Node, EntityKind::Workspace] {
            assert!(is_canvas_table(map.table_for(kind)));
        }
    }

    #[test]
    fn protected_tables_are_not_canvas_tables() {
        for table in PROTECTED_TABLES {
            assert!(!is_canvas_table(table));
            assert!(is_protected_table(table));
        }
    }

    #[test]
    fn lookalike_names_are_rejected() {
        assert!(!is_canvas_table("mindmesh_nodes "));
        assert!(!is_canvas_table("MINDMESH_NODES"));
        assert!(!is_canvas_table(""));
    }
}
