use chrono::Duration;
use mesh_core::{EngineConfig, FailureCategory, Mutation, DELETE_NOT_REVERSIBLE};
use mesh_test_utils::*;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_end_to_end_create_then_rollback() {
    let harness = TestHarness::new();

    let executed = harness
        .execute(plan_of([container("A"), node_in("B", "A")]))
        .await;

    assert!(executed.success, "{executed:?}");
    assert_eq!(executed.repairs.len(), 2);
    assert!(executed.telemetry_events_emitted >= 1);
    assert_eq!(executed.events_emitted, vec![CANVAS_EVENT.to_string()]);
    assert!(harness.container_row("A").await.is_some());
    assert!(harness.node_row("B").await.is_some());

    let history = harness
        .engine
        .get_execution_history(&harness.workspace)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].fully_reversible);

    let rolled_back = harness.rollback().await;

    assert!(rolled_back.success, "{rolled_back:?}");
    assert!(rolled_back.warnings.is_empty());
    assert!(rolled_back.repairs.is_empty());
    assert!(harness.container_row("A").await.is_none());
    assert!(harness.node_row("B").await.is_none());
}

#[tokio::test]
async fn test_rollback_flags_deleted_node() {
    let harness = TestHarness::new();
    harness.execute(plan_of([node("N")])).await;

    let executed = harness
        .execute(plan_of([container("C"), Mutation::delete_node("N")]))
        .await;
    assert!(executed.success);

    let rolled_back = harness.rollback().await;

    assert!(rolled_back.success, "{rolled_back:?}");
    assert_eq!(rolled_back.warnings.len(), 1);
    let warning = &rolled_back.warnings[0];
    assert!(warning.contains("delete_node N"));
    assert!(warning.contains("data lost, cannot restore"));
    assert!(warning.contains(DELETE_NOT_REVERSIBLE));
    assert!(harness.container_row("C").await.is_none());
    // the deleted node stays deleted
    assert!(harness.node_row("N").await.is_none());
}

#[tokio::test]
async fn test_create_then_delete_in_one_plan_still_rolls_back() {
    let harness = TestHarness::new();
    let executed = harness
        .execute(plan_of([
            container("A"),
            node("B"),
            Mutation::delete_container("A"),
        ]))
        .await;
    assert!(executed.success, "{executed:?}");

    let rolled_back = harness.rollback().await;

    assert!(rolled_back.success, "{rolled_back:?}");
    assert_eq!(rolled_back.warnings.len(), 1);
    assert!(rolled_back.warnings[0].contains("delete_container A"));
    assert!(harness.node_row("B").await.is_none());
    assert!(harness.container_row("A").await.is_none());
}

#[tokio::test]
async fn test_updates_only_plan_rolls_back_with_warnings_and_no_writes() {
    let harness = TestHarness::new();
    harness.execute(plan_of([container("A"), node("B")])).await;
    harness
        .execute(plan_of([rename_node("B", "Renamed"), collapse_container("A")]))
        .await;
    let writes_before = harness.store.writes_issued();

    let rolled_back = harness.rollback().await;

    assert!(rolled_back.success);
    assert_eq!(rolled_back.warnings.len(), 2);
    assert!(rolled_back.warnings[0].contains("previous field values were not captured"));
    assert_eq!(harness.store.writes_issued(), writes_before);
    assert_eq!(harness.node_row("B").await.unwrap()["label"], "Renamed");
}

#[tokio::test]
async fn test_rollback_is_silent() {
    let harness = TestHarness::new();
    harness.execute(plan_of([container("A")])).await;
    let events = harness.sink.events().len();
    let telemetry = harness.sink.telemetry().len();

    let succeeded = harness.rollback().await;
    let failed = harness.rollback().await;

    assert!(succeeded.success);
    assert!(!failed.success);
    for result in [&succeeded, &failed] {
        assert!(result.events_emitted.is_empty());
        assert_eq!(result.telemetry_events_emitted, 0);
    }
    assert_eq!(harness.sink.events().len(), events);
    assert_eq!(harness.sink.telemetry().len(), telemetry);
}

#[tokio::test]
async fn test_second_rollback_is_rollback_failure() {
    let harness = TestHarness::new();
    harness.execute(plan_of([container("A")])).await;
    harness.execute(plan_of([container("B")])).await;

    assert!(harness.rollback().await.success);
    let again = harness.rollback().await;

    assert!(!again.success);
    assert_eq!(again.category(), Some(FailureCategory::RollbackFailure));
    // only one step back: the older plan is untouched
    assert!(harness.container_row("A").await.is_some());
}

#[tokio::test]
async fn test_nothing_to_roll_back() {
    let harness = TestHarness::new();

    let result = harness.rollback().await;

    assert_eq!(result.category(), Some(FailureCategory::PreconditionFailure));
    assert!(result.errors[0].message.contains("nothing to roll back"));
}

#[tokio::test]
async fn test_rollback_requires_the_lock() {
    let harness = TestHarness::new();
    harness.execute(plan_of([container("A")])).await;
    harness.clock.advance(Duration::minutes(10));

    let result = harness.rollback().await;

    assert_eq!(result.category(), Some(FailureCategory::LockViolation));
    assert!(harness.container_row("A").await.is_some());
}

#[tokio::test]
async fn test_rollback_failure_keeps_everything() {
    let harness = TestHarness::new();
    harness
        .execute(plan_of([container("A"), node_in("B", "A")]))
        .await;
    harness
        .store
        .fail_on(&harness.config.tables.containers, "A");

    let result = harness.rollback().await;

    assert_eq!(result.category(), Some(FailureCategory::RollbackFailure));
    assert!(result.errors[0].message.contains("rollback of plan"));
    // the node delete ran first but was discarded with the transaction
    assert!(harness.node_row("B").await.is_some());
    assert!(harness.container_row("A").await.is_some());
}

#[tokio::test]
async fn test_failed_plan_is_not_rollback_target() {
    let harness = TestHarness::with_config(EngineConfig::default());
    harness.execute(plan_of([container("A")])).await;
    let failed = harness
        .execute(plan_of([container("B"), container("A")]))
        .await;
    assert!(!failed.success);

    let rolled_back = harness.rollback().await;

    assert!(rolled_back.success);
    assert!(harness.container_row("A").await.is_none());
}
