//! Session manager tests against the mock runtime.
//!
//! Pumps run as real tokio tasks; each test drives the event channel the way
//! the dashboard's event loop does.

use dockman_core::session::{
    LogSession, SessionEvent, SessionKey, SessionKind, SessionManager, SessionSettings, ShellState,
    StreamState, SubmitOutcome,
};
use dockman_core::test_support::{framed_lines, mock_summary, shared, MockCall, MockRuntime};
use dockman_core::CoreError;
use dockman_provider::ContainerId;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::sync::mpsc::UnboundedReceiver;

const WAIT: Duration = Duration::from_secs(2);

fn settings() -> SessionSettings {
    SessionSettings {
        call_timeout: Duration::from_secs(2),
        ..SessionSettings::default()
    }
}

fn running_web() -> MockRuntime {
    MockRuntime::new().with_container(mock_summary("web1", "web", "nginx", "Up 5 minutes", None))
}

async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("session channel closed")
}

/// Apply events until the log stream reports its end
async fn pump_logs_to_end(manager: &mut SessionManager, rx: &mut UnboundedReceiver<SessionEvent>) {
    loop {
        let event = next_event(rx).await;
        let ended = matches!(event, SessionEvent::LogEnded { .. });
        manager.apply(event);
        if ended {
            return;
        }
    }
}

async fn read_exactly(end: &mut DuplexStream, n: usize) -> String {
    let mut buf = vec![0u8; n];
    tokio::time::timeout(WAIT, end.read_exact(&mut buf))
        .await
        .expect("timed out reading shell input")
        .expect("shell input closed");
    String::from_utf8(buf).unwrap()
}

fn log_session<'a>(manager: &'a SessionManager, key: &SessionKey) -> &'a LogSession {
    manager.log_session(key).expect("log session should be open")
}

#[tokio::test]
async fn test_log_stream_fills_buffer_and_filters() {
    let (mock, runtime) = shared(running_web());
    mock.set_logs("web1", framed_lines(&["a error", "b", "a info error"]));
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());

    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Logs);
    pump_logs_to_end(&mut manager, &mut rx).await;

    let logs = log_session(&manager, &key);
    assert_eq!(logs.state(), &StreamState::Ended);
    assert_eq!(logs.line(0), Some("a error"));
    assert_eq!(logs.line(2), Some("a info error"));
    assert!(mock.was_called(&MockCall::Logs {
        id: "web1".to_string(),
        tail: "100".to_string()
    }));

    let logs = manager.log_session_mut(&key).unwrap();
    logs.set_filter("ERROR");
    assert_eq!(logs.match_count(), 2);
    let start = logs.current_match();
    logs.next_match();
    logs.prev_match();
    assert_eq!(logs.current_match(), start);
}

#[tokio::test]
async fn test_log_stream_error_is_inline() {
    let (mock, runtime) = shared(running_web());
    *mock.log_error.lock().unwrap() = Some(dockman_provider::ProviderError::Transport(
        "connection reset".to_string(),
    ));
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Logs);
    pump_logs_to_end(&mut manager, &mut rx).await;

    let snapshot = manager.buffer_snapshot(&key);
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].contains("connection reset"));
    assert!(matches!(log_session(&manager, &key).state(), StreamState::Failed(_)));
}

#[tokio::test]
async fn test_second_open_reuses_live_pump() {
    let (mock, runtime) = shared(running_web());
    *mock.log_follow.lock().unwrap() = true;
    mock.set_logs("web1", framed_lines(&["first"]));
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let id = ContainerId::new("web1");

    let key = manager.open(&id, "web", SessionKind::Logs);
    let event = next_event(&mut rx).await;
    manager.apply(event);
    assert_eq!(manager.open(&id, "web", SessionKind::Logs), key);
    assert!(manager.has_running_pump(&key));

    let mut writer = mock.take_log_end(0).expect("followed stream");
    writer
        .write_all(&framed_lines(&["second"]))
        .await
        .unwrap();
    let event = next_event(&mut rx).await;
    manager.apply(event);

    assert_eq!(manager.buffer_snapshot(&key), vec!["first", "second"]);
    assert_eq!(mock.count_calls(|c| matches!(c, MockCall::Logs { .. })), 1);
    assert_eq!(manager.session_count(), 1);
}

#[tokio::test]
async fn test_finished_pump_superseded_and_stale_events_dropped() {
    let (mock, runtime) = shared(running_web());
    mock.set_logs("web1", framed_lines(&["one"]));
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let id = ContainerId::new("web1");

    let key = manager.open(&id, "web", SessionKind::Logs);
    let mut stale = Vec::new();
    loop {
        let event = next_event(&mut rx).await;
        let ended = matches!(event, SessionEvent::LogEnded { .. });
        stale.push(event);
        if ended {
            break;
        }
    }
    while manager.has_running_pump(&key) {
        tokio::task::yield_now().await;
    }

    mock.set_logs("web1", framed_lines(&["two"]));
    manager.open(&id, "web", SessionKind::Logs);
    for event in stale {
        assert!(!manager.apply(event));
    }
    pump_logs_to_end(&mut manager, &mut rx).await;

    let lines = manager.buffer_snapshot(&key);
    assert_eq!(lines[0], "two");
    assert!(!lines.iter().any(|l| l == "one"));
    assert_eq!(mock.count_calls(|c| matches!(c, MockCall::Logs { .. })), 2);
}

#[tokio::test]
async fn test_close_stops_pump_and_drops_buffer() {
    let (mock, runtime) = shared(running_web());
    *mock.log_follow.lock().unwrap() = true;
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Logs);

    manager.close(&key);
    assert!(!manager.is_open(&key));
    assert!(!manager.has_running_pump(&key));
    assert!(manager.buffer_snapshot(&key).is_empty());

    // a pump that never ran sends nothing once stopped
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
    assert!(mock.take_log_end(0).is_none());
}

#[tokio::test]
async fn test_shell_connect_send_and_render_output() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    assert_eq!(manager.shell_session(&key).unwrap().state(), &ShellState::Disconnected);

    manager.ensure_connected(&key).await.unwrap();
    manager.ensure_connected(&key).await.unwrap();
    assert_eq!(mock.shell_sessions_opened(), 1);
    assert_eq!(manager.shell_session(&key).unwrap().shell(), Some("/bin/sh"));

    let mut end = mock.take_shell_end(0).unwrap();
    assert_eq!(
        manager.submit_input(&key, "  ls  ").await.unwrap(),
        SubmitOutcome::Sent
    );
    assert_eq!(read_exactly(&mut end, 3).await, "ls\n");

    end.write_all(b"ls\r\nREADME.md\r\n$ ").await.unwrap();
    let event = next_event(&mut rx).await;
    manager.apply(event);

    let lines = manager.buffer_snapshot(&key);
    assert!(lines.contains(&"README.md".to_string()));
    assert_eq!(lines.iter().filter(|l| l.ends_with("ls")).count(), 1);
    assert_eq!(lines.last().map(String::as_str), Some("$ "));
}

#[tokio::test]
async fn test_shell_reconnects_when_writer_dropped() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    manager.ensure_connected(&key).await.unwrap();

    let mut end = mock.take_shell_end(0).unwrap();
    manager.submit_input(&key, "ls").await.unwrap();
    assert_eq!(read_exactly(&mut end, 3).await, "ls\n");

    // the container side goes away before the event loop notices
    drop(end);
    let outcome = manager.submit_input(&key, "pwd").await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Reconnected);
    assert_eq!(mock.shell_sessions_opened(), 2);

    let mut end = mock.take_shell_end(1).unwrap();
    assert_eq!(read_exactly(&mut end, 4).await, "pwd\n");

    // the old pump's close notice carries a stale epoch
    while let Ok(event) = rx.try_recv() {
        manager.apply(event);
    }
    let shell = manager.shell_session(&key).unwrap();
    assert_eq!(shell.state(), &ShellState::Connected);
    assert!(shell.is_connected());
    assert_eq!(shell.history().entries(), &["ls".to_string(), "pwd".to_string()]);
}

#[tokio::test]
async fn test_shell_reconnects_after_stream_closed() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    manager.ensure_connected(&key).await.unwrap();

    drop(mock.take_shell_end(0));
    let event = next_event(&mut rx).await;
    assert!(matches!(event, SessionEvent::ShellClosed { .. }));
    assert!(manager.apply(event));
    assert_eq!(manager.shell_session(&key).unwrap().state(), &ShellState::Disconnected);

    let outcome = manager.submit_input(&key, "whoami").await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Reconnected);
    let mut end = mock.take_shell_end(1).unwrap();
    assert_eq!(read_exactly(&mut end, 7).await, "whoami\n");
    let shell = manager.shell_session(&key).unwrap();
    assert_eq!(shell.state(), &ShellState::Connected);
    assert!(shell.render_lines()[0].contains("Reconnected to web"));
}

#[tokio::test]
async fn test_exit_closes_without_sending() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, _rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    manager.ensure_connected(&key).await.unwrap();
    let mut end = mock.take_shell_end(0).unwrap();

    assert_eq!(
        manager.submit_input(&key, "exit").await.unwrap(),
        SubmitOutcome::Closed
    );
    assert_eq!(manager.shell_session(&key).unwrap().state(), &ShellState::Disconnected);
    assert!(!manager.has_running_pump(&key));

    let mut rest = Vec::new();
    let read = tokio::time::timeout(WAIT, end.read_to_end(&mut rest)).await;
    assert!(matches!(read, Ok(Ok(0))));

    assert_eq!(
        manager.submit_input(&key, "").await.unwrap(),
        SubmitOutcome::Ignored
    );
}

#[tokio::test]
async fn test_stopped_container_shell_unavailable() {
    let (mock, runtime) = shared(
        MockRuntime::new().with_container(mock_summary("db1", "db", "postgres", "Exited (0) 1 hour ago", None)),
    );
    let (mut manager, _rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("db1"), "db", SessionKind::Shell);

    let err = manager.ensure_connected(&key).await.unwrap_err();
    assert!(matches!(err, CoreError::ShellUnavailable(_)));
    assert!(manager.shell_session(&key).unwrap().is_unavailable());
    assert!(matches!(
        manager.submit_input(&key, "ls").await,
        Err(CoreError::ShellUnavailable(_))
    ));
    assert_eq!(mock.shell_sessions_opened(), 0);

    // reopening the view starts over
    manager.close(&key);
    manager.open(&ContainerId::new("db1"), "db", SessionKind::Shell);
    assert_eq!(manager.shell_session(&key).unwrap().state(), &ShellState::Disconnected);
}

#[tokio::test]
async fn test_no_usable_shell_is_unavailable() {
    let (mock, runtime) = shared(running_web());
    mock.shells.lock().unwrap().clear();
    let (mut manager, _rx) = SessionManager::new(runtime, settings());
    let key = SessionKey::shell(ContainerId::new("web1"));
    manager.open(&key.container_id, "web", SessionKind::Shell);

    assert!(manager.ensure_connected(&key).await.is_err());
    let shell = manager.shell_session(&key).unwrap();
    assert!(shell.is_unavailable());
    assert!(shell.render_lines().iter().any(|l| l.contains("Shell unavailable")));
    // every candidate was probed in order
    let probed: Vec<String> = mock
        .get_calls()
        .into_iter()
        .filter_map(|c| match c {
            MockCall::Exec { cmd, .. } => cmd.first().cloned(),
            _ => None,
        })
        .collect();
    assert_eq!(probed, vec!["/bin/bash", "/bin/sh", "/busybox/sh"]);
}

#[tokio::test]
async fn test_bash_preferred_when_present() {
    let (mock, runtime) = shared(running_web());
    mock.shells.lock().unwrap().insert("/bin/bash".to_string(), 0);
    let (mut manager, _rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    manager.ensure_connected(&key).await.unwrap();
    assert_eq!(manager.shell_session(&key).unwrap().shell(), Some("/bin/bash"));
}

/// Apply events until a background connect lands
async fn apply_until_connected(manager: &mut SessionManager, rx: &mut UnboundedReceiver<SessionEvent>) {
    loop {
        let event = next_event(rx).await;
        let connected = matches!(event, SessionEvent::ShellConnected { .. });
        manager.apply(event);
        if connected {
            return;
        }
    }
}

#[tokio::test]
async fn test_background_connect_sends_queued_command() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);

    assert!(manager.connect(&key).unwrap());
    assert!(!manager.connect(&key).unwrap());
    assert_eq!(manager.shell_session(&key).unwrap().state(), &ShellState::Connecting);

    assert_eq!(
        manager.submit_or_queue(&key, "ls").await.unwrap(),
        SubmitOutcome::Queued
    );
    assert!(manager.has_queued_input(&key));

    apply_until_connected(&mut manager, &mut rx).await;
    assert!(manager.shell_session(&key).unwrap().is_connected());
    assert_eq!(mock.shell_sessions_opened(), 1);

    assert_eq!(
        manager.flush_queued(&key).await.unwrap(),
        Some(SubmitOutcome::Reconnected)
    );
    let mut end = mock.take_shell_end(0).unwrap();
    assert_eq!(read_exactly(&mut end, 3).await, "ls\n");
    assert_eq!(manager.shell_session(&key).unwrap().history().entries(), &["ls".to_string()]);
    assert_eq!(manager.flush_queued(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_write_queues_retry_without_blocking() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);
    manager.ensure_connected(&key).await.unwrap();

    drop(mock.take_shell_end(0));
    assert_eq!(
        manager.submit_or_queue(&key, "pwd").await.unwrap(),
        SubmitOutcome::Queued
    );

    apply_until_connected(&mut manager, &mut rx).await;
    manager.flush_queued(&key).await.unwrap();
    let mut end = mock.take_shell_end(1).unwrap();
    assert_eq!(read_exactly(&mut end, 4).await, "pwd\n");

    let shell = manager.shell_session(&key).unwrap();
    assert_eq!(shell.state(), &ShellState::Connected);
    assert_eq!(shell.history().entries(), &["pwd".to_string()]);
}

#[tokio::test]
async fn test_background_connect_to_stopped_container() {
    let (mock, runtime) = shared(
        MockRuntime::new().with_container(mock_summary("db1", "db", "postgres", "Exited (0) 1 hour ago", None)),
    );
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("db1"), "db", SessionKind::Shell);

    assert!(manager.connect(&key).unwrap());
    apply_until_connected(&mut manager, &mut rx).await;
    assert!(manager.shell_session(&key).unwrap().is_unavailable());
    assert!(matches!(
        manager.submit_or_queue(&key, "ls").await,
        Err(CoreError::ShellUnavailable(_))
    ));
    assert_eq!(mock.shell_sessions_opened(), 0);
}

#[tokio::test]
async fn test_closing_cancels_background_connect() {
    let (mock, runtime) = shared(running_web());
    let (mut manager, mut rx) = SessionManager::new(runtime, settings());
    let key = manager.open(&ContainerId::new("web1"), "web", SessionKind::Shell);

    assert!(manager.connect(&key).unwrap());
    manager.close(&key);
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());
    assert_eq!(mock.shell_sessions_opened(), 0);
}
