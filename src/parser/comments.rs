//! Position-preserving comment removal
//!
//! Comment bodies are replaced by spaces (newlines inside block comments are
//! kept) so every remaining character stays on its original line and column.
//! String and character literals are copied through untouched.

use crate::parser::ast::SourceLocation;
use crate::parser::CompileError;

/// Replace every comment in `source` with whitespace of the same shape.
pub fn strip_comments(source: &str) -> Result<String, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;
    let mut line = 1;
    let mut column = 1;

    let advance_pos = |c: char, line: &mut usize, column: &mut usize| {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '/' if next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    // A backslash-newline continues a line comment.
                    if chars[i] == '\\' && chars.get(i + 1) == Some(&'\n') {
                        out.push(' ');
                        out.push('\n');
                        line += 1;
                        column = 1;
                        i += 2;
                        continue;
                    }
                    out.push(' ');
                    column += 1;
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                let start = SourceLocation::new(line, column);
                out.push_str("  ");
                column += 2;
                i += 2;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(CompileError::new("Unterminated block comment", start));
                        }
                        Some('*') if chars.get(i + 1) == Some(&'/') => {
                            out.push_str("  ");
                            column += 2;
                            i += 2;
                            break;
                        }
                        Some('\n') => {
                            out.push('\n');
                            line += 1;
                            column = 1;
                            i += 1;
                        }
                        Some(_) => {
                            out.push(' ');
                            column += 1;
                            i += 1;
                        }
                    }
                }
            }
            '"' | '\'' => {
                let quote = c;
                out.push(c);
                advance_pos(c, &mut line, &mut column);
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    out.push(ch);
                    advance_pos(ch, &mut line, &mut column);
                    i += 1;
                    if ch == '\\' {
                        if let Some(&escaped) = chars.get(i) {
                            out.push(escaped);
                            advance_pos(escaped, &mut line, &mut column);
                            i += 1;
                        }
                    } else if ch == quote || ch == '\n' {
                        break;
                    }
                }
            }
            _ => {
                out.push(c);
                advance_pos(c, &mut line, &mut column);
                i += 1;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positions_preserved() {
        let src = "int a; // note\nint /* x\ny */ b;";
        let out = strip_comments(src).unwrap();
        assert_eq!(out.len(), src.len());
        assert_eq!(out.lines().count(), src.lines().count());
        assert_eq!(out.find('b'), src.rfind('b'));
        assert!(!out.contains("note"));
    }

    #[test]
    fn test_literals_untouched() {
        let src = r#"printf("// not a comment /* nor this */"); char c = '/';"#;
        assert_eq!(strip_comments(src).unwrap(), src);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let err = strip_comments("int x;\n/* open").unwrap_err();
        assert_eq!(err.location.line, 2);
    }
}
