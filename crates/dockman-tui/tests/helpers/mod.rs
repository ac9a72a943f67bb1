use dockman_config::GlobalConfig;
use dockman_core::test_support::{mock_summary, shared, MockRuntime};
use dockman_tui::App;
use ratatui::{backend::TestBackend, Terminal};
use std::sync::Arc;

/// Two containers in project "shop" and one without a project
#[allow(dead_code)]
pub fn compose_host() -> MockRuntime {
    MockRuntime::new()
        .with_container(mock_summary("web1", "shop-web-1", "nginx", "Up 2 hours", Some("shop")))
        .with_container(mock_summary("db1", "shop-db-1", "postgres", "Up 2 hours", Some("shop")))
        .with_container(mock_summary("solo1", "scratch", "alpine", "Exited (0) 3 days ago", None))
}

/// App over `mock` with one poll already applied
#[allow(dead_code)]
pub async fn app_with(mock: MockRuntime) -> (Arc<MockRuntime>, App) {
    let (mock, runtime) = shared(mock);
    let mut app = App::new(runtime, GlobalConfig::default());
    app.refresh().await;
    (mock, app)
}

/// Render the app to a TestBackend and capture output as a string
#[allow(dead_code)]
pub fn render_app(app: &mut App, width: u16, height: u16) -> String {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| dockman_tui::ui::draw(frame, app))
        .unwrap();
    let buffer = terminal.backend().buffer().clone();
    buffer_to_string(&buffer)
}

/// Convert a ratatui buffer to a string representation
#[allow(dead_code)]
pub fn buffer_to_string(buffer: &ratatui::buffer::Buffer) -> String {
    let mut output = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            let cell = buffer.get(x, y);
            output.push_str(cell.symbol());
        }
        output.push('\n');
    }
    output
}
