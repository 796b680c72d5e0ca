//! Plans: the unit of atomicity and of rollback
//!
//! Plans arrive fully formed from the planning component. The engine never
//! builds one on its own; the builder methods here exist for callers and
//! tests.

use crate::ids::{ContainerId, NodeId, PlanId};
use crate::mutation::Mutation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered batch of mutations with preconditions and declared events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Plan identifier
    #[serde(default)]
    pub id: PlanId,
    /// Mutations, applied strictly in this order
    pub mutations: Vec<Mutation>,
    /// Facts that must hold before any mutation runs
    #[serde(default)]
    pub preconditions: Vec<Precondition>,
    /// Events emitted (once each) after a successful commit
    #[serde(default)]
    pub events: Vec<String>,
}

impl Plan {
    /// Create an empty plan with a fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: PlanId::new(),
            mutations: Vec::new(),
            preconditions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Append a mutation
    #[inline]
    #[must_use]
    pub fn with_mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    /// Append several mutations
    #[inline]
    #[must_use]
    pub fn with_mutations(mut self, mutations: impl IntoIterator<Item = Mutation>) -> Self {
        self.mutations.extend(mutations);
        self
    }

    /// Append a precondition
    #[inline]
    #[must_use]
    pub fn with_precondition(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Declare an event
    #[inline]
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.push(event.into());
        self
    }

    /// Number of mutations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// True when the plan has no mutations
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only fact checked before a plan runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Precondition {
    /// The executing workspace row exists
    WorkspaceExists,
    /// A container with this id exists
    ContainerExists {
        /// Container id
        id: ContainerId,
    },
    /// No container with this id exists
    ContainerAbsent {
        /// Container id
        id: ContainerId,
    },
    /// A node with this id exists
    NodeExists {
        /// Node id
        id: NodeId,
    },
    /// No node with this id exists
    NodeAbsent {
        /// Node id
        id: NodeId,
    },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkspaceExists => f.write_str("workspace exists"),
            Self::ContainerExists { id } => write!(f, "container {id} exists"),
            Self::ContainerAbsent { id } => write!(f, "container {id} is absent"),
            Self::NodeExists { id } => write!(f, "node {id} exists"),
            Self::NodeAbsent { id } => write!(f, "node {id} is absent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutation::NewContainer;

    #[test]
    fn plan_builder_keeps_declared_order() {
        let plan = Plan::new()
            .with_mutation(Mutation::delete_node("n1"))
            .with_mutation(Mutation::CreateContainer(NewContainer::new("c1", "ws", "A")))
            .with_event("canvas.updated");

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.mutations[0].target_id(), "n1");
        assert_eq!(plan.mutations[1].target_id(), "c1");
        assert_eq!(plan.events, vec!["canvas.updated".to_string()]);
    }

    #[test]
    fn plan_json_without_id_gets_one() {
        let plan: Plan = serde_json::from_str(r#"{"mutations": []}"#).unwrap();
        assert!(plan.is_empty());
        assert!(plan.preconditions.is_empty());
    }

    #[test]
    fn precondition_display_names_the_target() {
        let p = Precondition::NodeAbsent { id: NodeId::new("n7") };
        assert_eq!(p.to_string(), "node n7 is absent");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "node_absent");
    }
}
