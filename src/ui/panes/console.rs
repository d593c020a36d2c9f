//! Console pane: program output, then compiler output and the error message

use crate::model::{CompileRunResult, Phase};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

/// Lines shown in the console, styled by where they came from.
pub fn console_lines(result: &CompileRunResult) -> Vec<Line<'_>> {
    let mut lines: Vec<Line> = Vec::new();
    let plain = Style::default().fg(DEFAULT_THEME.fg);
    let muted = Style::default().fg(DEFAULT_THEME.comment);

    // Compiler output only for failed builds
    if result.phase == Phase::Compile && !result.compile_output.is_empty() {
        lines.extend(result.compile_output.lines().map(|l| Line::styled(l, muted)));
    }
    lines.extend(result.output.lines().map(|l| Line::styled(l, plain)));
    if result.output_truncated {
        lines.push(Line::styled(
            "[output truncated]",
            Style::default().fg(DEFAULT_THEME.warning),
        ));
    }
    if let Some(error) = &result.error {
        let style = Style::default()
            .fg(DEFAULT_THEME.error)
            .add_modifier(Modifier::BOLD);
        lines.extend(error.lines().map(|l| Line::styled(l, style)));
    }
    lines
}

/// Render the console pane
pub fn render_console_pane(
    frame: &mut Frame,
    area: Rect,
    result: &CompileRunResult,
    is_focused: bool,
    scroll: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };
    let block = Block::default()
        .title(" Console ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines = console_lines(result);
    if lines.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = (*scroll).min(lines.len().saturating_sub(visible_height));
    let visible: Vec<Line> = lines.into_iter().skip(*scroll).take(visible_height).collect();

    let block = block.padding(Padding::new(1, 0, 0, 0));
    frame.render_widget(Paragraph::new(visible).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_shows_output_then_error() {
        let mut result = CompileRunResult::run_phase("gcc", "gcc");
        result.output = "one\ntwo\n".to_string();
        result.output_truncated = true;
        result.error = Some("Runtime error: boom".to_string());
        result.compile_output = "warning noise".to_string();

        let text: Vec<String> = console_lines(&result)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["one", "two", "[output truncated]", "Runtime error: boom"]);
    }
}
