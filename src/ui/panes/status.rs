//! Status bar rendering with the outcome summary and keybindings

use crate::model::{CompileRunResult, Phase};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Short outcome label and its badge color.
pub fn outcome_badge(result: &CompileRunResult) -> (String, Color) {
    if result.success {
        (" OK ".to_string(), DEFAULT_THEME.success)
    } else if result.timed_out {
        (" TIMEOUT ".to_string(), DEFAULT_THEME.warning)
    } else {
        match result.phase {
            Phase::Compile => (" COMPILE FAILED ".to_string(), DEFAULT_THEME.error),
            Phase::Run => (" RUN FAILED ".to_string(), DEFAULT_THEME.error),
        }
    }
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, result: &CompileRunResult, message: &str) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let bar = Style::default().bg(DEFAULT_THEME.current_line_bg);
    let sep_style = bar.fg(DEFAULT_THEME.comment);
    let (badge, badge_color) = outcome_badge(result);

    let mut left_spans = vec![
        Span::styled(
            badge,
            Style::default()
                .bg(badge_color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", result.compiler), bar.fg(DEFAULT_THEME.fg)),
        Span::styled("│", sep_style),
        Span::styled(format!(" {} ", result.phase), bar.fg(DEFAULT_THEME.fg)),
    ];
    if let Some(code) = result.exit_code {
        left_spans.push(Span::styled("│", sep_style));
        left_spans.push(Span::styled(format!(" exit {code} "), bar.fg(DEFAULT_THEME.fg)));
    }
    if result.output_truncated {
        left_spans.push(Span::styled("│", sep_style));
        left_spans.push(Span::styled(" truncated ", bar.fg(DEFAULT_THEME.warning)));
    }
    if !message.is_empty() {
        left_spans.push(Span::styled("│", sep_style));
        left_spans.push(Span::styled(format!(" {message} "), bar.fg(DEFAULT_THEME.comment)));
    }

    let left = Paragraph::new(Line::from(left_spans))
        .style(bar)
        .alignment(Alignment::Left);
    frame.render_widget(left, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar.fg(DEFAULT_THEME.fg);
    let right_spans = vec![
        Span::styled(" ⇥ ", key_style),
        Span::styled(" focus ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" ↑/↓ ", key_style),
        Span::styled(" scroll ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" n/p ", key_style),
        Span::styled(" diagnostic ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" q ", key_style),
        Span::styled(" quit ", desc_style),
    ];
    let right = Paragraph::new(Line::from(right_spans))
        .style(bar)
        .alignment(Alignment::Right);
    frame.render_widget(right, layout[1]);
}
