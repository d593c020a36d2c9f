//! Result viewer state and event loop

use crate::model::CompileRunResult;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

/// Lines of context kept above a diagnostic when jumping to it
const JUMP_CONTEXT: usize = 3;

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Diagnostics,
    Console,
}

impl FocusedPane {
    /// Move focus to the next pane (source -> console -> diagnostics)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Console,
            FocusedPane::Console => FocusedPane::Diagnostics,
            FocusedPane::Diagnostics => FocusedPane::Source,
        }
    }
}

/// The viewer's state
pub struct App {
    pub source_code: String,
    pub result: CompileRunResult,
    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub source_scroll: usize,
    pub diagnostics_scroll: usize,
    pub console_scroll: usize,

    /// Index into `result.diagnostics`
    pub selected: Option<usize>,
    pub should_quit: bool,
    pub status_message: String,
}

impl App {
    pub fn new(source_code: String, result: CompileRunResult) -> Self {
        let mut app = App {
            source_code,
            result,
            focused_pane: FocusedPane::Source,
            source_scroll: 0,
            diagnostics_scroll: 0,
            console_scroll: 0,
            selected: None,
            should_quit: false,
            status_message: String::new(),
        };
        if app.result.diagnostics.is_empty() {
            app.focused_pane = FocusedPane::Console;
        } else {
            app.select(0);
        }
        app
    }

    /// Run the viewer until the user quits
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        // Source on the left; diagnostics over console on the right
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(columns[1]);

        let selected_line = self.selected_line();
        super::panes::render_source_pane(
            frame,
            columns[0],
            &self.source_code,
            &self.result.diagnostics,
            selected_line,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );
        super::panes::render_diagnostics_pane(
            frame,
            right_rows[0],
            &self.result.diagnostics,
            self.selected,
            self.focused_pane == FocusedPane::Diagnostics,
            &mut self.diagnostics_scroll,
        );
        super::panes::render_console_pane(
            frame,
            right_rows[1],
            &self.result,
            self.focused_pane == FocusedPane::Console,
            &mut self.console_scroll,
        );
        super::panes::render_status_bar(frame, main_chunks[1], &self.result, &self.status_message);
    }

    fn selected_line(&self) -> Option<usize> {
        self.selected
            .and_then(|i| self.result.diagnostics.get(i))
            .map(|d| d.line)
    }

    /// Select diagnostic `index` and scroll the source to its line.
    fn select(&mut self, index: usize) {
        let Some(diag) = self.result.diagnostics.get(index) else {
            return;
        };
        self.selected = Some(index);
        self.source_scroll = diag.line.saturating_sub(1 + JUMP_CONTEXT);
        self.status_message = format!(
            "diagnostic {}/{} at line {}",
            index + 1,
            self.result.diagnostics.len(),
            diag.line
        );
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) {
        let count = self.result.diagnostics.len();
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Char('n') if count > 0 => {
                let next = self.selected.map_or(0, |i| (i + 1) % count);
                self.select(next);
            }
            KeyCode::Char('p') if count > 0 => {
                let prev = self.selected.map_or(count - 1, |i| (i + count - 1) % count);
                self.select(prev);
            }
            KeyCode::Char('n') | KeyCode::Char('p') => {
                self.status_message = "no diagnostics".to_string();
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => self.source_scroll = self.source_scroll.saturating_sub(1),
                FocusedPane::Diagnostics => {
                    if let Some(i) = self.selected.filter(|i| *i > 0) {
                        self.select(i - 1);
                    }
                }
                FocusedPane::Console => self.console_scroll = self.console_scroll.saturating_sub(1),
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => self.source_scroll = self.source_scroll.saturating_add(1),
                FocusedPane::Diagnostics => {
                    if let Some(i) = self.selected.filter(|i| i + 1 < count) {
                        self.select(i + 1);
                    }
                }
                FocusedPane::Console => self.console_scroll = self.console_scroll.saturating_add(1),
            },
            KeyCode::Home => match self.focused_pane {
                FocusedPane::Source => self.source_scroll = 0,
                FocusedPane::Diagnostics => self.select(0),
                FocusedPane::Console => self.console_scroll = 0,
            },
            KeyCode::End => match self.focused_pane {
                FocusedPane::Source => self.source_scroll = usize::MAX,
                FocusedPane::Diagnostics => self.select(count.saturating_sub(1)),
                FocusedPane::Console => self.console_scroll = usize::MAX,
            },
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Diagnostic;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn failed_build() -> App {
        let source = (1..=40).map(|i| format!("int v{i} = {i};")).collect::<Vec<_>>().join("\n");
        let result = CompileRunResult::compile_failure("gcc", "gcc", "Compilation failed").with_diagnostics(vec![
            Diagnostic::error(5, 1, "first"),
            Diagnostic::error(30, 2, "second"),
        ]);
        App::new(source, result)
    }

    #[test]
    fn test_diagnostic_navigation_wraps() {
        let mut app = failed_build();
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.source_scroll, 1);

        app.handle_key_event(key(KeyCode::Char('n')));
        assert_eq!(app.selected, Some(1));
        assert_eq!(app.source_scroll, 26);

        app.handle_key_event(key(KeyCode::Char('n')));
        assert_eq!(app.selected, Some(0));
        app.handle_key_event(key(KeyCode::Char('p')));
        assert_eq!(app.selected, Some(1));
    }

    #[test]
    fn test_focus_cycle_and_quit() {
        let mut app = failed_build();
        assert_eq!(app.focused_pane, FocusedPane::Source);
        app.handle_key_event(key(KeyCode::Tab));
        assert_eq!(app.focused_pane, FocusedPane::Console);
        app.handle_key_event(key(KeyCode::Tab));
        assert_eq!(app.focused_pane, FocusedPane::Diagnostics);
        app.handle_key_event(key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_clean_run_focuses_console() {
        let mut result = CompileRunResult::run_phase("inbuilt-mini-c", "inbuilt");
        result.success = true;
        result.output = "hello\n".to_string();
        let mut app = App::new("int main() {}".to_string(), result);
        assert_eq!(app.focused_pane, FocusedPane::Console);
        app.handle_key_event(key(KeyCode::Char('n')));
        assert_eq!(app.selected, None);
        assert_eq!(app.status_message, "no diagnostics");
    }

    #[test]
    fn test_renders_all_panes() {
        let mut app = failed_build();
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Source Code"));
        assert!(text.contains("Diagnostics (2)"));
        assert!(text.contains("Console"));
        assert!(text.contains("COMPILE FAILED"));
        // Offset clamped to the last full page
        assert!(app.source_scroll <= 40);
    }
}
