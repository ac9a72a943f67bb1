//! Terminal dashboard for dockman
//!
//! Built with Ratatui. The event loop lives in [`App::run`]; rendering is in
//! [`ui`]; every key binding is in [`keymap`].

pub mod app;
mod event;
pub mod keymap;
pub mod ui;
pub mod widgets;

pub use app::{App, AppError, AppResult, ConfirmAction, InfoState, Target};
pub use event::{Event, EventHandler};
pub use keymap::{Action, LifecycleOp, Pane, UiMode};
pub use widgets::DialogFocus;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dockman_config::GlobalConfig;
use dockman_provider::ContainerRuntime;
use ratatui::prelude::*;
use std::io;
use std::sync::Arc;

/// Run the dashboard until the user quits
pub async fn run(runtime: Arc<dyn ContainerRuntime>, config: GlobalConfig) -> AppResult<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(runtime, config);
    let res = app.run(&mut terminal).await;

    // Restore the terminal even if the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
