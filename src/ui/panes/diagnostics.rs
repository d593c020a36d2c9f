//! Diagnostics list pane

use crate::model::{Diagnostic, Severity};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render one row per diagnostic, highlighting `selected`.
pub fn render_diagnostics_pane(
    frame: &mut Frame,
    area: Rect,
    diagnostics: &[Diagnostic],
    selected: Option<usize>,
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
        .title(format!(" Diagnostics ({}) ", diagnostics.len()))
        .borders(Borders::ALL)
        .border_style(border_style);

    if diagnostics.is_empty() {
        let paragraph = Paragraph::new("(no diagnostics)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    // Keep the selection on screen
    if let Some(sel) = selected {
        if sel < *scroll {
            *scroll = sel;
        } else if sel >= *scroll + visible_height {
            *scroll = sel + 1 - visible_height;
        }
    }
    *scroll = (*scroll).min(diagnostics.len().saturating_sub(visible_height));

    let items: Vec<ListItem> = diagnostics
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, diag)| {
            let (label, color) = match diag.severity {
                Severity::Error => ("error", DEFAULT_THEME.error),
                Severity::Warning => ("warning", DEFAULT_THEME.warning),
            };
            let mut spans = vec![
                Span::styled(format!("{:>4}:{:<3} ", diag.line, diag.col), Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(format!("{label} "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
            ];
            if !diag.code.is_empty() {
                spans.push(Span::styled(format!("[{}] ", diag.code), Style::default().fg(DEFAULT_THEME.comment)));
            }
            spans.push(Span::styled(diag.message.as_str(), Style::default().fg(DEFAULT_THEME.fg)));

            let item = ListItem::new(Line::from(spans));
            if selected == Some(idx) {
                item.style(Style::default().bg(DEFAULT_THEME.current_line_bg).fg(Color::White))
            } else {
                item
            }
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}
