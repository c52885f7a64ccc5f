use mcp_gateway::models::status::ChildState;
use mcp_gateway::orchestrator::status_tracker::StatusTracker;

#[tokio::test]
async fn untouched_child_reads_not_started() {
    let tracker = StatusTracker::new();
    assert_eq!(tracker.get("ghost").await.status, ChildState::NotStarted);
}

#[tokio::test]
async fn successful_start_stamps_time() {
    let tracker = StatusTracker::new();
    assert!(tracker.mark_starting("a").await);
    assert!(tracker.mark_running("a").await);

    let status = tracker.get("a").await;
    assert_eq!(status.status, ChildState::Running);
    assert!(status.started_at.is_some());
    assert!(status.error.is_none());
}

#[tokio::test]
async fn failure_is_recorded_then_cleared_by_next_attempt() {
    let tracker = StatusTracker::new();
    tracker.mark_starting("a").await;
    tracker.mark_failed("a", "boom".into()).await;

    let failed = tracker.get("a").await;
    assert_eq!(failed.status, ChildState::FailedStart);
    assert_eq!(failed.error.as_deref(), Some("boom"));

    assert!(tracker.mark_starting("a").await);
    let retrying = tracker.get("a").await;
    assert_eq!(retrying.status, ChildState::Starting);
    assert!(retrying.error.is_none());
}

#[tokio::test]
async fn stop_keeps_history() {
    let tracker = StatusTracker::new();
    tracker.mark_starting("a").await;
    tracker.mark_failed("a", "boom".into()).await;
    tracker.mark_stopped("a").await;

    let status = tracker.get("a").await;
    assert_eq!(status.status, ChildState::Stopped);
    assert_eq!(status.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn invalid_transition_is_rejected() {
    let tracker = StatusTracker::new();
    assert!(!tracker.mark_running("a").await);
    assert_eq!(tracker.get("a").await.status, ChildState::NotStarted);
}

#[tokio::test]
async fn snapshot_follows_requested_order() {
    let tracker = StatusTracker::new();
    tracker.mark_starting("b").await;

    let snapshot = tracker.snapshot(["c", "b", "a"]).await;
    let names: Vec<&str> = snapshot.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["c", "b", "a"]);
    assert_eq!(snapshot[1].1.status, ChildState::Starting);
    assert_eq!(snapshot[0].1.status, ChildState::NotStarted);
}
