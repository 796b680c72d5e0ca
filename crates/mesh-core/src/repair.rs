//! Approved repair catalogue
//!
//! A repair is a structurally trivial correction applied to a mutation payload
//! just before it is persisted. The catalogue below is the complete set; a
//! name that is not listed here can never be applied, whatever configuration
//! asks for it. No repair may infer hierarchy, position or meaning.

use crate::mutation::Operation;
use crate::tables::EntityKind;
use serde::Serialize;
use std::fmt;

/// Name of the creation-timestamp repair
pub const DEFAULT_CREATED_AT: &str = "default_created_at";
/// Name of the update-timestamp repair
pub const DEFAULT_UPDATED_AT: &str = "default_updated_at";

/// Identity of an approved repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairKind {
    /// Stamp `created_at` with the engine clock when a create omits it
    DefaultCreatedAt,
    /// Stamp `updated_at` with the engine clock when an update omits it
    DefaultUpdatedAt,
}

/// Catalogue entry for an approved repair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairRule {
    /// Repair identity
    pub kind: RepairKind,
    /// Configured name
    pub name: &'static str,
    /// Operation class the repair can touch
    pub applies_to: Operation,
    /// Logged with every application
    pub justification: &'static str,
}

/// Every repair the engine may ever apply
pub const APPROVED_REPAIRS: &[RepairRule] = &[
    RepairRule {
        kind: RepairKind::DefaultCreatedAt,
        name: DEFAULT_CREATED_AT,
        applies_to: Operation::Create,
        justification: "created_at was absent; stamped with the execution time",
    },
    RepairRule {
        kind: RepairKind::DefaultUpdatedAt,
        name: DEFAULT_UPDATED_AT,
        applies_to: Operation::Update,
        justification: "updated_at was absent; stamped with the execution time",
    },
];

/// Look up an approved repair by name
#[must_use]
pub fn approved(name: &str) -> Option<&'static RepairRule> {
    APPROVED_REPAIRS.iter().find(|rule| rule.name == name)
}

/// Names of all approved repairs, in catalogue order
#[must_use]
pub fn approved_names() -> Vec<String> {
    APPROVED_REPAIRS.iter().map(|r| r.name.to_string()).collect()
}

/// Record of one applied repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRepair {
    /// Repair that ran
    pub rule: &'static RepairRule,
    /// Entity kind repaired
    pub entity: EntityKind,
    /// Record repaired
    pub target_id: String,
}

impl fmt::Display for AppliedRepair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {}: {}",
            self.rule.name, self.entity, self.target_id, self.rule.justification
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_names_are_unique() {
        let mut names: Vec<_> = APPROVED_REPAIRS.iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), APPROVED_REPAIRS.len());
    }

    #[test]
    fn unknown_names_are_not_approved() {
        assert!(approved(DEFAULT_CREATED_AT).is_some());
        assert!(approved("infer_parent_container").is_none());
        assert!(approved("DEFAULT_CREATED_AT").is_none());
    }

    #[test]
    fn applied_repair_renders_trail_entry() {
        let applied = AppliedRepair {
            rule: approved(DEFAULT_CREATED_AT).unwrap(),
            entity: EntityKind::Container,
            target_id: "A".into(),
        };
        let line = applied.to_string();
        assert!(line.starts_with("default_created_at: container A:"));
        assert!(line.contains("stamped"));
    }
}
