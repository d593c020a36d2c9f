//! Terminal result viewer built on [ratatui](https://github.com/ratatui-org/ratatui).
//!
//! The UI is organized into three layers:
//!
//! - **[`app`]**: viewer state, keyboard event loop and pane focus
//! - **[`panes`]**: stateless render functions for each visible pane (source,
//!   diagnostics, console, status bar)
//! - **[`theme`]**: centralized color palette used by all panes
//!
//! [`show_result`] takes over the terminal, runs the event loop and restores
//! the terminal on every exit path.

pub mod app;
pub mod panes;
pub mod theme;

pub use app::App;

use crate::model::CompileRunResult;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;

/// Show `result` for `source` until the user quits.
pub fn show_result(source: String, result: CompileRunResult) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err);
    }

    let outcome = Terminal::new(CrosstermBackend::new(io::stdout())).and_then(|mut terminal| {
        let res = App::new(source, result).run(&mut terminal);
        terminal.show_cursor()?;
        res
    });

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    outcome
}
