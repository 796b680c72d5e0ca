//! Mutation model
//!
//! A [`Mutation`] is one atomic structural change to the canvas. The variant
//! set is closed at seven kinds; every consumer matches on it exhaustively, so
//! adding a kind is a compile-visible change everywhere it matters.
//!
//! Geometry (`x`, `y`, `width`, `height`) is always taken verbatim from the
//! payload. Nothing in the engine computes or adjusts positions.

use crate::ids::{ContainerId, NodeId, WorkspaceId};
use crate::tables::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Atomic canvas mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutation {
    /// Insert a new container
    CreateContainer(NewContainer),
    /// Patch an existing container
    UpdateContainer(ContainerUpdate),
    /// Remove a container
    DeleteContainer(ContainerDelete),
    /// Insert a new node
    CreateNode(NewNode),
    /// Patch an existing node
    UpdateNode(NodeUpdate),
    /// Remove a node
    DeleteNode(NodeDelete),
    /// Patch the workspace display flags
    UpdateWorkspaceFlags(WorkspaceFlagsUpdate),
}

impl Mutation {
    /// Mutation kind tag
    #[must_use]
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::CreateContainer(_) => MutationKind::CreateContainer,
            Self::UpdateContainer(_) => MutationKind::UpdateContainer,
            Self::DeleteContainer(_) => MutationKind::DeleteContainer,
            Self::CreateNode(_) => MutationKind::CreateNode,
            Self::UpdateNode(_) => MutationKind::UpdateNode,
            Self::DeleteNode(_) => MutationKind::DeleteNode,
            Self::UpdateWorkspaceFlags(_) => MutationKind::UpdateWorkspaceFlags,
        }
    }

    /// Entity kind this mutation touches
    #[inline]
    #[must_use]
    pub fn entity(&self) -> EntityKind {
        self.kind().entity()
    }

    /// Operation class (create/update/delete)
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.kind().operation()
    }

    /// Identifier of the record this mutation writes
    #[must_use]
    pub fn target_id(&self) -> &str {
        match self {
            Self::CreateContainer(m) => m.id.as_str(),
            Self::UpdateContainer(m) => m.id.as_str(),
            Self::DeleteContainer(m) => m.id.as_str(),
            Self::CreateNode(m) => m.id.as_str(),
            Self::UpdateNode(m) => m.id.as_str(),
            Self::DeleteNode(m) => m.id.as_str(),
            Self::UpdateWorkspaceFlags(m) => m.workspace_id.as_str(),
        }
    }

    /// Shorthand constructor for deleting a container
    #[inline]
    #[must_use]
    pub fn delete_container(id: impl Into<ContainerId>) -> Self {
        Self::DeleteContainer(ContainerDelete { id: id.into() })
    }

    /// Shorthand constructor for deleting a node
    #[inline]
    #[must_use]
    pub fn delete_node(id: impl Into<NodeId>) -> Self {
        Self::DeleteNode(NodeDelete { id: id.into() })
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.target_id())
    }
}

/// Flat tag for the seven mutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// See [`Mutation::CreateContainer`]
    CreateContainer,
    /// See [`Mutation::UpdateContainer`]
    UpdateContainer,
    /// See [`Mutation::DeleteContainer`]
    DeleteContainer,
    /// See [`Mutation::CreateNode`]
    CreateNode,
    /// See [`Mutation::UpdateNode`]
    UpdateNode,
    /// See [`Mutation::DeleteNode`]
    DeleteNode,
    /// See [`Mutation::UpdateWorkspaceFlags`]
    UpdateWorkspaceFlags,
}

impl MutationKind {
    /// All kinds, in declaration order
    pub const ALL: [MutationKind; 7] = [
        Self::CreateContainer,
        Self::UpdateContainer,
        Self::DeleteContainer,
        Self::CreateNode,
        Self::UpdateNode,
        Self::DeleteNode,
        Self::UpdateWorkspaceFlags,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateContainer => "create_container",
            Self::UpdateContainer => "update_container",
            Self::DeleteContainer => "delete_container",
            Self::CreateNode => "create_node",
            Self::UpdateNode => "update_node",
            Self::DeleteNode => "delete_node",
            Self::UpdateWorkspaceFlags => "update_workspace_flags",
        }
    }

    /// Entity kind touched
    #[must_use]
    pub fn entity(self) -> EntityKind {
        match self {
            Self::CreateContainer | Self::UpdateContainer | Self::DeleteContainer => {
                EntityKind::Container
            }
            Self::CreateNode | Self::UpdateNode | Self::DeleteNode => EntityKind::Node,
            Self::UpdateWorkspaceFlags => EntityKind::Workspace,
        }
    }

    /// Operation class
    #[must_use]
    pub fn operation(self) -> Operation {
        match self {
            Self::CreateContainer | Self::CreateNode => Operation::Create,
            Self::UpdateContainer | Self::UpdateNode | Self::UpdateWorkspaceFlags => {
                Operation::Update
            }
            Self::DeleteContainer | Self::DeleteNode => Operation::Delete,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation class of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Insert
    Create,
    /// Patch by id
    Update,
    /// Remove by id
    Delete,
}

/// Full field set for a new container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContainer {
    /// Container id
    pub id: ContainerId,
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Title shown in the container header
    pub title: String,
    /// Optional body text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
    /// Collapsed state
    #[serde(default)]
    pub collapsed: bool,
    /// Creation timestamp; stamped by repair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewContainer {
    /// Create a container payload with zeroed geometry
    #[must_use]
    pub fn new(
        id: impl Into<ContainerId>,
        workspace_id: impl Into<WorkspaceId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            title: title.into(),
            body: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            collapsed: false,
            created_at: None,
        }
    }

    /// With explicit geometry
    #[inline]
    #[must_use]
    pub fn with_geometry(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.x = x;
        self.y = y;
        self.width = width;
        self.height = height;
        self
    }

    /// With explicit creation time
    #[inline]
    #[must_use]
    pub fn with_created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// Partial container fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// New left edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New top edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// New width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// New height
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// New collapsed state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    /// Update timestamp; stamped by repair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ContainerPatch {
    /// True when no content field is set (`updated_at` does not count)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.collapsed.is_none()
    }
}

/// Update of one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerUpdate {
    /// Target container
    pub id: ContainerId,
    /// Fields to change
    pub patch: ContainerPatch,
}

/// Removal of one container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDelete {
    /// Target container
    pub id: ContainerId,
}

/// Full field set for a new node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    /// Node id
    pub id: NodeId,
    /// Owning workspace
    pub workspace_id: WorkspaceId,
    /// Parent container, when the planner placed the node inside one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    /// Free-form node kind (e.g. `note`, `idea`)
    #[serde(default = "default_node_kind")]
    pub kind: String,
    /// Visible label
    pub label: String,
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Creation timestamp; stamped by repair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_node_kind() -> String {
    "note".to_string()
}

impl NewNode {
    /// Create a node payload at the origin
    #[must_use]
    pub fn new(
        id: impl Into<NodeId>,
        workspace_id: impl Into<WorkspaceId>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workspace_id: workspace_id.into(),
            container_id: None,
            kind: default_node_kind(),
            label: label.into(),
            x: 0.0,
            y: 0.0,
            created_at: None,
        }
    }

    /// Inside a container
    #[inline]
    #[must_use]
    pub fn in_container(mut self, container_id: impl Into<ContainerId>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// At a position
    #[inline]
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}

/// Partial node fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    /// New parent container
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    /// New kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// New label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// New left edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    /// New top edge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    /// Update timestamp; stamped by repair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl NodePatch {
    /// True when no content field is set (`updated_at` does not count)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.container_id.is_none()
            && self.kind.is_none()
            && self.label.is_none()
            && self.x.is_none()
            && self.y.is_none()
    }
}

/// Update of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpdate {
    /// Target node
    pub id: NodeId,
    /// Fields to change
    pub patch: NodePatch,
}

/// Removal of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDelete {
    /// Target node
    pub id: NodeId,
}

/// Partial workspace display flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFlagsPatch {
    /// Show the background grid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_visible: Option<bool>,
    /// Snap dragged elements to the grid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_to_grid: Option<bool>,
    /// Show the minimap overlay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_minimap: Option<bool>,
    /// Present the canvas read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    /// Update timestamp; stamped by repair when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkspaceFlagsPatch {
    /// True when no flag is set (`updated_at` does not count)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid_visible.is_none()
            && self.snap_to_grid.is_none()
            && self.show_minimap.is_none()
            && self.read_only.is_none()
    }
}

/// Update of the workspace display flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFlagsUpdate {
    /// Target workspace
    pub workspace_id: WorkspaceId,
    /// Flags to change
    pub flags: WorkspaceFlagsPatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kinds_cover_every_operation_and_entity() {
        let creates = MutationKind::ALL
            .iter()
            .filter(|k| k.operation() == Operation::Create)
            .count();
        let deletes = MutationKind::ALL
            .iter()
            .filter(|k| k.operation() == Operation::Delete)
            .count();
        assert_eq!(creates, 2);
        assert_eq!(deletes, 2);
        assert_eq!(
            MutationKind::UpdateWorkspaceFlags.entity(),
            EntityKind::Workspace
        );
    }

    #[test]
    fn mutation_json_uses_snake_case_tag() {
        let m = Mutation::CreateNode(NewNode::new("n1", "ws", "Idea").in_container("c1"));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["type"], "create_node");
        assert_eq!(json["container_id"], "c1");
        assert!(json.get("created_at").is_none());

        let back: Mutation = serde_json::from_value(json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn node_kind_defaults_to_note() {
        let json = serde_json::json!({
            "type": "create_node",
            "id": "n1",
            "workspace_id": "ws",
            "label": "L",
            "x": 1.0,
            "y": 2.0
        });
        let Mutation::CreateNode(node) = serde_json::from_value(json).unwrap() else {
            panic!("expected create_node");
        };
        assert_eq!(node.kind, "note");
    }

    #[test]
    fn timestamp_alone_does_not_make_a_patch_non_empty() {
        let patch = NodePatch {
            updated_at: Some(Utc::now()),
            ..NodePatch::default()
        };
        assert!(patch.is_empty());
        assert!(!ContainerPatch {
            collapsed: Some(true),
            ..ContainerPatch::default()
        }
        .is_empty());
    }

    #[test]
    fn workspace_flags_target_is_workspace_id() {
        let m = Mutation::UpdateWorkspaceFlags(WorkspaceFlagsUpdate {
            workspace_id: WorkspaceId::new("ws-9"),
            flags: WorkspaceFlagsPatch::default(),
        });
        assert_eq!(m.target_id(), "ws-9");
        assert_eq!(m.to_string(), "update_workspace_flags ws-9");
    }
}
