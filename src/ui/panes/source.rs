//! Source code pane rendering with syntax highlighting
//!
//! Lines that carry a diagnostic get a tinted background and a marker in
//! the gutter; the selected diagnostic's line is drawn in full error colors.
//!
//! Highlighting uses a character-by-character scan rather than the inbuilt
//! lexer, so it still works on programs the lexer rejects.

use crate::model::{Diagnostic, Severity};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Simple syntax highlighting for C and C++ lines
fn highlight_source_code(line: &str) -> Line<'_> {
    if line.trim_start().starts_with('#') {
        return Line::from(Span::styled(line, Style::default().fg(DEFAULT_THEME.preprocessor)));
    }

    let mut spans = Vec::new();
    let mut current_word = String::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c == '/' && chars.get(i + 1).is_some_and(|(_, n)| *n == '/') {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            spans.push(Span::styled(&line[pos..], Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '"' || c == '\'' {
            if !current_word.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_word)));
            }
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != c {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let stop = chars.get(end).map_or(line.len(), |(p, _)| *p);
            spans.push(Span::styled(&line[pos..stop], Style::default().fg(DEFAULT_THEME.string)));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            if !current_word.is_empty() {
                let style = word_style(&current_word, c == '(');
                spans.push(Span::styled(std::mem::take(&mut current_word), style));
            }
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    if !current_word.is_empty() {
        let style = word_style(&current_word, false);
        spans.push(Span::styled(current_word, style));
    }

    Line::from(spans)
}

fn word_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "char" | "void" | "bool" | "float" | "double" | "long" | "short" | "unsigned"
        | "signed" | "const" | "static" | "auto" | "string" | "size_t" | "FILE" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        "return" | "if" | "else" | "while" | "for" | "do" | "switch" | "case" | "default"
        | "break" | "continue" | "sizeof" | "using" | "namespace" | "struct" | "class" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "NULL" | "nullptr" | "true" | "false" | "endl" => Style::default().fg(DEFAULT_THEME.number),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => Style::default().fg(DEFAULT_THEME.number),
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Worst severity reported on `line`, if any.
fn line_severity(diagnostics: &[Diagnostic], line: usize) -> Option<Severity> {
    diagnostics.iter().filter(|d| d.line == line).map(|d| d.severity).min()
}

/// Render the source code pane
///
/// `scroll` is clamped in place so the caller's offset never runs past the
/// end of the file.
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    diagnostics: &[Diagnostic],
    selected_line: Option<usize>,
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
        .title(" Source Code ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let lines: Vec<&str> = source_code.lines().collect();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll = (*scroll).min(lines.len().saturating_sub(visible_height));

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let severity = line_severity(diagnostics, line_num);
            let marker = match severity {
                Some(Severity::Error) => "✗",
                Some(Severity::Warning) => "!",
                None => " ",
            };
            let gutter = format!("{:4}{} ", line_num, marker);

            let mut content = highlight_source_code(line);
            let num_style = if selected_line == Some(line_num) {
                for span in &mut content.spans {
                    span.style = Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD);
                }
                Style::default()
                    .fg(DEFAULT_THEME.error)
                    .add_modifier(Modifier::BOLD)
            } else if let Some(severity) = severity {
                for span in &mut content.spans {
                    span.style = span.style.bg(DEFAULT_THEME.diagnostic_line_bg);
                }
                Style::default().fg(match severity {
                    Severity::Error => DEFAULT_THEME.error,
                    Severity::Warning => DEFAULT_THEME.warning,
                })
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut spans = vec![Span::styled(gutter, num_style)];
            spans.extend(content.spans);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlight_preserves_text() {
        let src = r#"  printf("%d\n", x); // done"#;
        assert_eq!(text_of(&highlight_source_code(src)), src);
        let src = "char c = '\\''; int é = 1;";
        assert_eq!(text_of(&highlight_source_code(src)), src);
    }

    #[test]
    fn test_line_severity_prefers_errors() {
        let mut warning = Diagnostic::error(3, 1, "unused");
        warning.severity = Severity::Warning;
        let diagnostics = vec![warning, Diagnostic::error(3, 5, "boom")];
        assert_eq!(line_severity(&diagnostics, 3), Some(Severity::Error));
        assert_eq!(line_severity(&diagnostics, 4), None);
    }
}
