//! Rendering tests against ratatui's TestBackend

mod helpers;

use crossterm::event::{KeyCode, KeyModifiers};
use dockman_config::GlobalConfig;
use dockman_core::test_support::{framed_lines, shared, MockRuntime};
use dockman_provider::ProviderError;
use dockman_tui::App;
use helpers::{app_with, compose_host, render_app};
use ratatui::{backend::TestBackend, style::Modifier, Terminal};
use std::time::Duration;

async fn press(app: &mut App, code: KeyCode) {
    app.send_key(code, KeyModifiers::NONE).await.unwrap();
}

async fn settle_sessions(app: &mut App) {
    while let Ok(Some(_)) = tokio::time::timeout(Duration::from_millis(200), app.next_session_event()).await {}
}

#[tokio::test]
async fn test_dashboard_shows_groups_in_order() {
    let (_mock, mut app) = app_with(compose_host()).await;
    let screen = render_app(&mut app, 140, 20);

    assert!(screen.contains("shop (2/2 running)"));
    assert!(screen.contains("Uncategorized (0/1 running)"));
    assert!(screen.contains("shop-web-1"));
    assert!(screen.contains("scratch"));
    assert!(screen.contains("3 containers"));

    let shop = screen.find("shop (2/2").unwrap();
    let uncategorized = screen.find("Uncategorized").unwrap();
    assert!(shop < uncategorized);
}

#[tokio::test]
async fn test_footer_follows_focused_status() {
    let (_mock, mut app) = app_with(compose_host()).await;
    let screen = render_app(&mut app, 200, 20);
    assert!(screen.contains("x: Stop"));
    assert!(screen.contains("S/X/R/D: Project"));

    press(&mut app, KeyCode::Char('G')).await;
    let screen = render_app(&mut app, 200, 20);
    assert!(screen.contains("s: Start"));
    assert!(!screen.contains("x: Stop"));
    assert!(!screen.contains("S/X/R/D"));
}

#[tokio::test]
async fn test_error_group_replaces_dashboard() {
    let mock = MockRuntime::new();
    mock.push_list_result(Err(ProviderError::ConnectionFailed(
        "socket missing".to_string(),
    )));
    let (_mock, runtime) = shared(mock);
    let mut app = App::new(runtime, GlobalConfig::default());
    app.refresh().await;

    let screen = render_app(&mut app, 100, 20);
    assert!(screen.contains("Error"));
    assert!(screen.contains("socket missing"));
    assert!(screen.contains("Runtime unreachable"));

    // recovers on the next successful poll
    app.refresh().await;
    let screen = render_app(&mut app, 100, 20);
    assert!(!screen.contains("socket missing"));
    assert!(screen.contains("No containers found"));
}

#[tokio::test]
async fn test_confirm_dialog_renders() {
    let (_mock, mut app) = app_with(compose_host()).await;
    press(&mut app, KeyCode::Char('d')).await;

    let screen = render_app(&mut app, 120, 30);
    assert!(screen.contains("Delete container 'shop-web-1'?"));
    assert!(screen.contains("Yes"));
    assert!(screen.contains("No"));
}

#[tokio::test]
async fn test_logs_pane_highlights_current_match() {
    let mock = compose_host();
    mock.set_logs("web1", framed_lines(&["boot ok", "disk error here"]));
    let (_mock, mut app) = app_with(mock).await;
    press(&mut app, KeyCode::Char('l')).await;
    settle_sessions(&mut app).await;
    press(&mut app, KeyCode::Char('/')).await;
    for c in "error".chars() {
        press(&mut app, KeyCode::Char(c)).await;
    }
    press(&mut app, KeyCode::Enter).await;

    let backend = TestBackend::new(80, 20);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| dockman_tui::ui::draw(frame, &mut app))
        .unwrap();
    let buffer = terminal.backend().buffer().clone();
    let screen = helpers::buffer_to_string(&buffer);
    assert!(screen.contains("Logs: shop-web-1"));
    assert!(screen.contains("/error 1/1"));

    // Find the match on screen and check its style
    let (row, line) = screen
        .lines()
        .enumerate()
        .find(|(_, l)| l.contains("disk error here"))
        .unwrap();
    let col = line.find("error").unwrap();
    let x = line[..col].chars().count() as u16;
    let cell = buffer.get(x, row as u16);
    assert!(cell.modifier.contains(Modifier::REVERSED));
    assert_eq!(cell.fg, ratatui::style::Color::Red);
}

#[tokio::test]
async fn test_shell_pane_shows_state_and_output() {
    let (mock, mut app) = app_with(compose_host()).await;
    press(&mut app, KeyCode::Char('e')).await;
    settle_sessions(&mut app).await;

    let mut end = mock.take_shell_end(0).unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut end, b"\x1b[32mready\x1b[0m\r\n$ ")
        .await
        .unwrap();
    settle_sessions(&mut app).await;

    let screen = render_app(&mut app, 80, 20);
    assert!(screen.contains("Shell: shop-web-1 [/bin/sh] connected"));
    assert!(screen.contains("ready"));
    assert!(!screen.contains("[32m"));
    assert!(screen.contains("$ "));
}

#[tokio::test]
async fn test_unavailable_shell_shows_reason() {
    let (_mock, mut app) = app_with(compose_host()).await;
    press(&mut app, KeyCode::Char('G')).await;
    press(&mut app, KeyCode::Char('e')).await;
    settle_sessions(&mut app).await;

    let screen = render_app(&mut app, 100, 20);
    assert!(screen.contains("unavailable"));
    assert!(screen.contains("No shell available"));
}

#[tokio::test]
async fn test_info_pane_lists_details() {
    let (_mock, mut app) = app_with(compose_host()).await;
    press(&mut app, KeyCode::Enter).await;
    let screen = render_app(&mut app, 100, 30);
    assert!(screen.contains("Loading..."));
    assert!(screen.contains("Inspecting shop-web-1..."));

    app.wait_for_task().await;
    let screen = render_app(&mut app, 100, 30);
    assert!(screen.contains("Info: shop-web-1"));
    assert!(screen.contains("nginx"));
    assert!(screen.contains("running"));
}

#[tokio::test(start_paused = true)]
async fn test_footer_shows_running_action() {
    let mock = compose_host();
    *mock.action_delay.lock().unwrap() = Some(Duration::from_secs(15));
    let (_mock, mut app) = app_with(mock).await;
    press(&mut app, KeyCode::Char('x')).await;
    press(&mut app, KeyCode::Char('y')).await;

    let screen = render_app(&mut app, 120, 20);
    assert!(screen.contains("Stopping shop-web-1..."));

    app.wait_for_task().await;
    let screen = render_app(&mut app, 120, 20);
    assert!(screen.contains("shop-web-1: stop done"));
    assert!(!screen.contains("Stopping"));
}

#[tokio::test]
async fn test_help_overlay() {
    let (_mock, mut app) = app_with(compose_host()).await;
    press(&mut app, KeyCode::Char('?')).await;
    let screen = render_app(&mut app, 100, 40);
    assert!(screen.contains("Help"));
    assert!(screen.contains("Next / previous match"));
}
