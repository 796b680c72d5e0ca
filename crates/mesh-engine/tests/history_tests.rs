use mesh_core::{EngineConfig, PlanId, MAX_HISTORY_DEPTH};
use mesh_test_utils::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[tokio::test]
async fn test_five_plans_keep_three_most_recent() {
    let harness = TestHarness::new();
    let mut ids: Vec<PlanId> = Vec::new();
    for i in 0..5 {
        let plan = plan_of([node(&format!("n{i}"))]);
        ids.push(plan.id);
        assert!(harness.execute(plan).await.success);
    }

    let kept: Vec<_> = harness
        .engine
        .get_execution_history(&harness.workspace)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.plan.id)
        .collect();

    assert_eq!(kept, ids[2..].to_vec());
}

#[tokio::test]
async fn test_clear_history_disables_rollback() {
    let harness = TestHarness::new();
    harness.execute(plan_of([container("A")])).await;

    harness
        .engine
        .clear_execution_history(&harness.workspace)
        .await
        .unwrap();

    assert!(!harness.rollback().await.success);
    assert!(harness.container_row("A").await.is_some());
}

#[tokio::test]
async fn test_history_records_actor_and_reversibility() {
    let harness = TestHarness::new();
    harness
        .execute(plan_of([node("B"), rename_node("B", "Renamed")]))
        .await;

    let history = harness
        .engine
        .get_execution_history(&harness.workspace)
        .await
        .unwrap();

    assert_eq!(history[0].actor_id.as_str(), ACTOR);
    assert_eq!(history[0].executed_at, fixed_time());
    assert!(!history[0].fully_reversible);
    assert_eq!(history[0].irreversible[0].index, 1);
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_history_never_exceeds_depth(plans in 1..10usize, depth in 1..=MAX_HISTORY_DEPTH) {
        let harness = TestHarness::with_config(EngineConfig::default().with_history_depth(depth));
        let rt = runtime();
        let mut ids = Vec::new();
        for i in 0..plans {
            let plan = plan_of([node(&format!("n{i}"))]);
            ids.push(plan.id);
            rt.block_on(harness.execute(plan));
        }

        let kept: Vec<_> = rt
            .block_on(harness.engine.get_execution_history(&harness.workspace))
            .unwrap()
            .into_iter()
            .map(|entry| entry.plan.id)
            .collect();

        let expected = ids[plans.saturating_sub(depth)..].to_vec();
        prop_assert_eq!(kept, expected);
    }
}
