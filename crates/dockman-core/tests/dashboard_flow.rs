//! Reconciler and controller working together against the mock runtime.

use dockman_core::test_support::{mock_summary, shared, MockRuntime};
use dockman_core::{Controller, Poller, ReconcileOutcome, Reconciler, StatusClass, UNCATEGORIZED};
use dockman_provider::ContainerId;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

fn compose_host() -> MockRuntime {
    MockRuntime::new()
        .with_container(mock_summary("aaa", "shop-web-1", "nginx", "Up 2 hours", Some("shop")))
        .with_container(mock_summary("bbb", "shop-db-1", "postgres", "Up 2 hours", Some("shop")))
        .with_container(mock_summary("ccc", "scratch", "alpine", "Exited (0) 3 days ago", None))
}

#[tokio::test]
async fn test_stop_then_poll_updates_status_in_place() {
    let (mock, runtime) = shared(compose_host());
    let controller = Controller::new(runtime.clone(), TIMEOUT, None);
    let mut reconciler = Reconciler::new();

    let outcome = reconciler.poll_once(runtime.as_ref(), TIMEOUT).await;
    assert_eq!(outcome, ReconcileOutcome::Rebuilt { added: 3, removed: 0 });
    let groups = reconciler.current_groups();
    assert_eq!(groups[0].name, "shop");
    assert_eq!(groups[0].running(), 2);
    assert_eq!(groups[1].name, UNCATEGORIZED);

    controller.stop(&ContainerId::new("bbb")).await.unwrap();
    let outcome = reconciler.poll_once(runtime.as_ref(), TIMEOUT).await;
    assert_eq!(outcome, ReconcileOutcome::StatusOnly { changed: 1 });
    assert_eq!(reconciler.rebuild_count(), 1);
    assert_eq!(
        reconciler.record("bbb").unwrap().status_class,
        StatusClass::Exited
    );
    assert!(!mock.is_running("bbb"));
}

#[tokio::test]
async fn test_remove_then_poll_rebuilds_and_moves_focus() {
    let (_mock, runtime) = shared(compose_host());
    let controller = Controller::new(runtime.clone(), TIMEOUT, None);
    let mut reconciler = Reconciler::new();
    reconciler.poll_once(runtime.as_ref(), TIMEOUT).await;
    assert!(reconciler.set_focus("aaa"));

    controller.remove(&ContainerId::new("aaa"), true).await.unwrap();
    let outcome = reconciler.poll_once(runtime.as_ref(), TIMEOUT).await;
    assert_eq!(outcome, ReconcileOutcome::Rebuilt { added: 0, removed: 1 });
    assert_eq!(reconciler.focused_id(), Some("bbb"));
    assert_eq!(reconciler.record("bbb").unwrap().display_index, 1);
}

#[tokio::test]
async fn test_project_scenario_through_poller() {
    let (mock, runtime) = shared(MockRuntime::new());
    mock.push_list_result(Ok(vec![
        mock_summary("aaa", "a", "img", "Up", Some("P")),
        mock_summary("bbb", "b", "img", "Up", Some("P")),
    ]));
    mock.push_list_result(Ok(vec![
        mock_summary("aaa", "a", "img", "Up", Some("P")),
        mock_summary("ccc", "c", "img", "Up", Some("P")),
    ]));
    let (poller, mut rx) = Poller::new(runtime, TIMEOUT);
    let mut reconciler = Reconciler::new();

    assert!(poller.dispatch(&mut reconciler));
    reconciler.complete_pass(rx.recv().await.unwrap());
    let a = reconciler.record("aaa").unwrap().serial();

    assert!(poller.dispatch(&mut reconciler));
    reconciler.complete_pass(rx.recv().await.unwrap());

    let groups = reconciler.current_groups();
    let ids: Vec<&str> = groups[0].containers.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["aaa", "ccc"]);
    assert_eq!(reconciler.record("aaa").unwrap().serial(), a);
    assert!(reconciler.record("bbb").is_none());
}
