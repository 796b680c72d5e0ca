//! Dry validation of a plan without touching any store

use crate::error::EngineError;
use crate::executor::MutationExecutor;
use crate::guard;
use chrono::Utc;
use mesh_core::{EngineConfig, Plan, WorkspaceId};

/// Every isolation, size and payload problem in `plan`
///
/// Unlike execution, which stops at the first failure, this reports all of
/// them. Lock state and preconditions are not checked.
#[must_use]
pub fn check_plan(
    plan: &Plan,
    workspace_id: &WorkspaceId,
    config: &EngineConfig,
) -> Vec<EngineError> {
    let mut problems = Vec::new();

    if plan.len() > config.max_plan_mutations {
        problems.push(EngineError::PlanTooLarge {
            count: plan.len(),
            limit: config.max_plan_mutations,
        });
    }

    let executor =
        MutationExecutor::new(workspace_id, &config.tables, &config.repairs, Utc::now());
    for (index, mutation) in plan.mutations.iter().enumerate() {
        if let Err(err) = guard::ensure_canvas_table(index, mutation, &config.tables) {
            problems.push(err);
        }
        if let Err(err) = executor.validate(index, mutation) {
            problems.push(err);
        }
    }

    for name in &config.repairs {
        if let Err(err) = guard::check_repair(name) {
            problems.push(err);
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_core::{FailureCategory, Mutation, NewContainer, NewNode, TableMap};

    #[test]
    fn clean_plan_has_no_problems() {
        let plan = Plan::new()
            .with_mutation(Mutation::CreateContainer(NewContainer::new("A", "ws", "A")))
            .with_mutation(Mutation::CreateNode(NewNode::new("B", "ws", "B")));
        assert!(check_plan(&plan, &"ws".into(), &EngineConfig::default()).is_empty());
    }

    #[test]
    fn reports_every_problem() {
        let config = EngineConfig::default()
            .with_tables(TableMap {
                containers: "projects".to_string(),
                ..TableMap::default()
            })
            .with_repairs(["default_created_at", "auto_layout_position"]);
        let plan = Plan::new()
            .with_mutation(Mutation::CreateContainer(NewContainer::new("A", "ws", "A")))
            .with_mutation(Mutation::CreateNode(NewNode::new("B", "elsewhere", "B")));

        let categories: Vec<_> = check_plan(&plan, &"ws".into(), &config)
            .iter()
            .map(EngineError::category)
            .collect();
        assert_eq!(
            categories,
            vec![
                FailureCategory::ForbiddenOperation,
                FailureCategory::ValidationFailure,
                FailureCategory::ForbiddenRepair,
            ]
        );
    }
}
