//! Single-file preprocessor
//!
//! Supports object-like `#define`/`#undef`, the `#if` family with a small
//! constant-expression evaluator, and `#error`. `#include`, `#pragma` and
//! `#line` are dropped. Output has exactly one line per input line: directive
//! lines and lines in inactive branches become empty.

use crate::parser::ast::SourceLocation;
use crate::parser::{CompileError, Dialect};
use rustc_hash::{FxHashMap, FxHashSet};

struct CondFrame {
    /// This branch is being emitted.
    active: bool,
    /// Some branch of this group has already been taken.
    taken: bool,
    parent_active: bool,
    seen_else: bool,
    opened_at: usize,
}

pub struct Preprocessor {
    macros: FxHashMap<String, String>,
    conditions: Vec<CondFrame>,
}

impl Preprocessor {
    pub fn new(dialect: Dialect) -> Self {
        let mut macros = FxHashMap::default();
        macros.insert("__STDC__".to_string(), "1".to_string());
        match dialect {
            Dialect::C => {
                macros.insert("__STDC_VERSION__".to_string(), "201112L".to_string());
            }
            Dialect::Cpp => {
                macros.insert("__cplusplus".to_string(), "201703L".to_string());
            }
        }
        Preprocessor {
            macros,
            conditions: Vec::new(),
        }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    fn active(&self) -> bool {
        self.conditions.last().map(|c| c.active).unwrap_or(true)
    }

    /// Preprocess comment-free source text.
    pub fn process(&mut self, source: &str) -> Result<String, CompileError> {
        let lines: Vec<&str> = source.split('\n').collect();
        let mut out: Vec<String> = Vec::with_capacity(lines.len());
        let mut index = 0;

        while index < lines.len() {
            let line_no = index + 1;
            let mut logical = lines[index].trim_end_matches('\r').to_string();
            let mut consumed = 1;
            // Splice backslash-continued directive lines; keep line count.
            if logical.trim_start().starts_with('#') {
                while logical.ends_with('\\') && index + consumed < lines.len() {
                    logical.pop();
                    logical.push(' ');
                    logical.push_str(lines[index + consumed].trim_end_matches('\r'));
                    consumed += 1;
                }
            }

            let trimmed = logical.trim_start();
            if let Some(directive) = trimmed.strip_prefix('#') {
                let column = logical.len() - trimmed.len() + 1;
                self.directive(directive.trim(), SourceLocation::new(line_no, column))?;
                for _ in 0..consumed {
                    out.push(String::new());
                }
            } else if self.active() {
                out.push(self.expand_line(&logical));
            } else {
                out.push(String::new());
            }
            index += consumed;
        }

        if let Some(open) = self.conditions.last() {
            return Err(CompileError::new(
                "Unterminated conditional directive (missing #endif)",
                SourceLocation::new(open.opened_at, 1),
            ));
        }

        Ok(out.join("\n"))
    }

    fn directive(&mut self, text: &str, loc: SourceLocation) -> Result<(), CompileError> {
        let name_len = text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(text.len());
        let (name, rest) = text.split_at(name_len);
        let rest = rest.trim();

        match name {
            "if" => {
                let value = if self.active() { self.evaluate(rest, loc)? != 0 } else { false };
                self.push_condition(value, loc);
            }
            "ifdef" | "ifndef" => {
                let ident = first_identifier(rest).ok_or_else(|| {
                    CompileError::new(format!("#{name} expects a macro name"), loc)
                })?;
                let defined = self.is_defined(ident);
                let value = if name == "ifdef" { defined } else { !defined };
                let value = self.active() && value;
                self.push_condition(value, loc);
            }
            "elif" => {
                let frame_state = match self.conditions.last() {
                    Some(frame) if frame.seen_else => {
                        return Err(CompileError::new("#elif after #else", loc));
                    }
                    Some(frame) => (frame.parent_active, frame.taken),
                    None => return Err(CompileError::new("#elif without #if", loc)),
                };
                let (parent_active, taken) = frame_state;
                let value = parent_active && !taken && self.evaluate(rest, loc)? != 0;
                if let Some(frame) = self.conditions.last_mut() {
                    frame.active = value;
                    frame.taken |= value;
                }
            }
            "else" => match self.conditions.last_mut() {
                Some(frame) if frame.seen_else => {
                    return Err(CompileError::new("#else after #else", loc));
                }
                Some(frame) => {
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                    frame.seen_else = true;
                }
                None => return Err(CompileError::new("#else without #if", loc)),
            },
            "endif" => {
                if self.conditions.pop().is_none() {
                    return Err(CompileError::new("#endif without #if", loc));
                }
            }
            _ if !self.active() => {}
            "define" => self.define(rest, loc)?,
            "undef" => {
                if let Some(ident) = first_identifier(rest) {
                    self.macros.remove(ident);
                }
            }
            "error" => {
                let message = if rest.is_empty() { "#error" } else { rest };
                return Err(CompileError::new(format!("#error {message}"), loc));
            }
            "include" | "pragma" | "line" | "warning" | "" => {}
            other => {
                return Err(CompileError::new(
                    format!("Unsupported preprocessor directive #{other}"),
                    loc,
                ));
            }
        }
        Ok(())
    }

    fn push_condition(&mut self, value: bool, loc: SourceLocation) {
        let parent_active = self.active();
        self.conditions.push(CondFrame {
            active: parent_active && value,
            taken: value,
            parent_active,
            seen_else: false,
            opened_at: loc.line,
        });
    }

    fn define(&mut self, rest: &str, loc: SourceLocation) -> Result<(), CompileError> {
        let name = first_identifier(rest)
            .ok_or_else(|| CompileError::new("#define expects a macro name", loc))?;
        let after = &rest[name.len()..];
        if after.starts_with('(') {
            return Err(CompileError::new(
                format!("Function-like macro '{name}' is not supported"),
                loc,
            ));
        }
        self.macros.insert(name.to_string(), after.trim().to_string());
        Ok(())
    }

    /// Expand object-like macros outside string and character literals.
    pub fn expand_line(&self, line: &str) -> String {
        let mut active = FxHashSet::default();
        self.expand(line, &mut active)
    }

    fn expand(&self, text: &str, expanding: &mut FxHashSet<String>) -> String {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '"' || c == '\'' {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    let ch = chars[i];
                    out.push(ch);
                    i += 1;
                    if ch == '\\' {
                        if let Some(&esc) = chars.get(i) {
                            out.push(esc);
                            i += 1;
                        }
                    } else if ch == quote {
                        break;
                    }
                }
            } else if c.is_ascii_alphabetic() || c == '_' {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                match self.macros.get(&ident) {
                    Some(body) if !expanding.contains(&ident) => {
                        expanding.insert(ident.clone());
                        let expanded = self.expand(body, expanding);
                        expanding.remove(&ident);
                        out.push_str(&expanded);
                    }
                    _ => out.push_str(&ident),
                }
            } else if c.is_ascii_digit() {
                // pp-numbers such as 1e10 or 0x1F must not have their tail expanded
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.' || chars[i] == '_') {
                    out.push(chars[i]);
                    i += 1;
                }
            } else {
                out.push(c);
                i += 1;
            }
        }
        out
    }

    /// Evaluate a `#if`/`#elif` expression.
    fn evaluate(&self, expr: &str, loc: SourceLocation) -> Result<i64, CompileError> {
        let tokens = self.condition_tokens(expr, loc)?;
        if tokens.is_empty() {
            return Err(CompileError::new("#if with no expression", loc));
        }
        let mut parser = CondParser {
            tokens: &tokens,
            pos: 0,
            loc,
        };
        let value = parser.ternary()?;
        if parser.pos != tokens.len() {
            return Err(CompileError::new(
                format!("Unexpected token in #if expression: {:?}", tokens[parser.pos]),
                loc,
            ));
        }
        Ok(value)
    }

    /// Tokenize a condition: resolve `defined`, expand macros once, then map
    /// any identifier left over to 0 (`true` to 1).
    fn condition_tokens(&self, expr: &str, loc: SourceLocation) -> Result<Vec<CondToken>, CompileError> {
        let raw = self.resolve_defined(lex_condition(expr, loc)?, loc)?;
        let text = raw.iter().map(CondToken::spelling).collect::<Vec<_>>().join(" ");
        let expanded = self.resolve_defined(lex_condition(&self.expand_line(&text), loc)?, loc)?;
        Ok(expanded
            .into_iter()
            .map(|token| match token {
                CondToken::Ident(name) => CondToken::Num((name == "true") as i64),
                other => other,
            })
            .collect())
    }

    fn resolve_defined(&self, raw: Vec<CondToken>, loc: SourceLocation) -> Result<Vec<CondToken>, CompileError> {
        let mut resolved = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            match &raw[i] {
                CondToken::Ident(name) if name == "defined" => {
                    let (ident, used) = match (raw.get(i + 1), raw.get(i + 2), raw.get(i + 3)) {
                        (Some(CondToken::Op("(")), Some(CondToken::Ident(id)), Some(CondToken::Op(")"))) => {
                            (id, 4)
                        }
                        (Some(CondToken::Ident(id)), _, _) => (id, 2),
                        _ => return Err(CompileError::new("Malformed defined() in #if", loc)),
                    };
                    resolved.push(CondToken::Num(self.is_defined(ident) as i64));
                    i += used;
                }
                other => {
                    resolved.push(other.clone());
                    i += 1;
                }
            }
        }
        Ok(resolved)
    }
}

fn first_identifier(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let ident = &text[..end];
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        None
    } else {
        Some(ident)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CondToken {
    Num(i64),
    Ident(String),
    Op(&'static str),
}

impl CondToken {
    fn spelling(&self) -> String {
        match self {
            CondToken::Num(n) => n.to_string(),
            CondToken::Ident(name) => name.clone(),
            CondToken::Op(op) => op.to_string(),
        }
    }
}

const COND_OPS: &[&str] = &[
    "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "(", ")", "!", "~", "+", "-", "*", "/", "%", "<",
    ">", "&", "^", "|", "?", ":",
];

fn lex_condition(expr: &str, loc: SourceLocation) -> Result<Vec<CondToken>, CompileError> {
    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                i += 1;
            }
            let text = expr[start..i].trim_end_matches(['u', 'U', 'l', 'L']);
            let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16)
            } else if text.len() > 1 && text.starts_with('0') {
                i64::from_str_radix(&text[1..], 8)
            } else {
                text.parse::<i64>()
            }
            .map_err(|_| CompileError::new(format!("Invalid number in #if: {text}"), loc))?;
            tokens.push(CondToken::Num(value));
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            tokens.push(CondToken::Ident(expr[start..i].to_string()));
        } else if c == '\'' {
            let rest = &expr[i..];
            let end = rest[1..]
                .find('\'')
                .ok_or_else(|| CompileError::new("Unterminated character in #if", loc))?;
            let body = &rest[1..end + 1];
            let value = match body {
                "\\n" => 10,
                "\\t" => 9,
                "\\0" => 0,
                "\\\\" => 92,
                "\\'" => 39,
                _ => body.bytes().next().map(i64::from).unwrap_or(0),
            };
            tokens.push(CondToken::Num(value));
            i += end + 2;
        } else {
            let op = COND_OPS
                .iter()
                .find(|op| expr[i..].starts_with(**op))
                .ok_or_else(|| {
                    CompileError::new(format!("Unexpected character '{c}' in #if expression"), loc)
                })?;
            tokens.push(CondToken::Op(op));
            i += op.len();
        }
    }
    Ok(tokens)
}

/// Precedence-climbing evaluator over resolved condition tokens.
struct CondParser<'a> {
    tokens: &'a [CondToken],
    pos: usize,
    loc: SourceLocation,
}

impl CondParser<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.tokens.get(self.pos) {
            Some(CondToken::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn error(&self, message: &str) -> CompileError {
        CompileError::new(message, self.loc)
    }

    fn ternary(&mut self) -> Result<i64, CompileError> {
        let cond = self.binary(0)?;
        if self.peek_op() == Some("?") {
            self.pos += 1;
            let a = self.ternary()?;
            if self.peek_op() != Some(":") {
                return Err(self.error("Expected ':' in #if expression"));
            }
            self.pos += 1;
            let b = self.ternary()?;
            return Ok(if cond != 0 { a } else { b });
        }
        Ok(cond)
    }

    fn precedence(op: &str) -> Option<u8> {
        Some(match op {
            "||" => 1,
            "&&" => 2,
            "|" => 3,
            "^" => 4,
            "&" => 5,
            "==" | "!=" => 6,
            "<" | "<=" | ">" | ">=" => 7,
            "<<" | ">>" => 8,
            "+" | "-" => 9,
            "*" | "/" | "%" => 10,
            _ => return None,
        })
    }

    fn binary(&mut self, min_prec: u8) -> Result<i64, CompileError> {
        let mut left = self.unary()?;
        while let Some(op) = self.peek_op() {
            let Some(prec) = Self::precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.binary(prec + 1)?;
            left = match op {
                "||" => ((left != 0) || (right != 0)) as i64,
                "&&" => ((left != 0) && (right != 0)) as i64,
                "|" => left | right,
                "^" => left ^ right,
                "&" => left & right,
                "==" => (left == right) as i64,
                "!=" => (left != right) as i64,
                "<" => (left < right) as i64,
                "<=" => (left <= right) as i64,
                ">" => (left > right) as i64,
                ">=" => (left >= right) as i64,
                "<<" => left.wrapping_shl(right as u32),
                ">>" => left.wrapping_shr(right as u32),
                "+" => left.wrapping_add(right),
                "-" => left.wrapping_sub(right),
                "*" => left.wrapping_mul(right),
                "/" | "%" => {
                    if right == 0 {
                        return Err(self.error("Division by zero in #if expression"));
                    }
                    if op == "/" {
                        left.wrapping_div(right)
                    } else {
                        left.wrapping_rem(right)
                    }
                }
                _ => unreachable!("operator without precedence"),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<i64, CompileError> {
        match self.tokens.get(self.pos) {
            Some(CondToken::Num(n)) => {
                self.pos += 1;
                Ok(*n)
            }
            Some(CondToken::Op("(")) => {
                self.pos += 1;
                let value = self.ternary()?;
                if self.peek_op() != Some(")") {
                    return Err(self.error("Expected ')' in #if expression"));
                }
                self.pos += 1;
                Ok(value)
            }
            Some(CondToken::Op(op @ ("!" | "~" | "-" | "+"))) => {
                let op = *op;
                self.pos += 1;
                let value = self.unary()?;
                Ok(match op {
                    "!" => (value == 0) as i64,
                    "~" => !value,
                    "-" => value.wrapping_neg(),
                    _ => value,
                })
            }
            _ => Err(self.error("Malformed #if expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Result<String, CompileError> {
        Preprocessor::new(Dialect::C).process(src)
    }

    #[test]
    fn test_if_zero_selects_else() {
        let out = run("#if 0\nint a;\n#else\nint b;\n#endif\n").unwrap();
        assert!(!out.contains("int a;"));
        assert!(out.contains("int b;"));
        assert_eq!(out.split('\n').count(), 6);
    }

    #[test]
    fn test_ifdef_undefined_skips_body() {
        let out = run("#ifdef UNDEFINED\nbad();\n#endif\ngood();").unwrap();
        assert!(!out.contains("bad"));
        assert!(out.contains("good"));
    }

    #[test]
    fn test_stray_endif_reports_its_line() {
        let err = run("int x;\n\n#endif\n").unwrap_err();
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unterminated_if() {
        let err = run("#if 1\nint x;\n").unwrap_err();
        assert_eq!(err.location.line, 1);
        assert!(err.message.contains("#endif"));
    }

    #[test]
    fn test_self_referential_macro_in_condition() {
        let out = run("#define A A+1\n#if A\nint yes;\n#else\nint no;\n#endif\n").unwrap();
        assert!(out.contains("int yes;"));
        assert!(!out.contains("int no;"));

        let out = run("#define X Y\n#define Y X\n#if X == 0\nint cycle;\n#endif\n").unwrap();
        assert!(out.contains("int cycle;"));
    }

    #[test]
    fn test_define_expansion_and_defined() {
        let out = run("#define N 10\n#define M (N * 2)\n#if defined(N) && M > 15\nint a[M];\n#endif\nchar *s = \"N\";").unwrap();
        assert!(out.contains("int a[(10 * 2)];"));
        assert!(out.contains("\"N\""));
    }

    #[test]
    fn test_function_like_macro_rejected() {
        let err = run("\n#define SQR(x) ((x)*(x))\n").unwrap_err();
        assert_eq!(err.location.line, 2);
        assert!(err.message.contains("Function-like"));
    }

    #[test]
    fn test_error_directive_only_when_active() {
        assert!(run("#if 0\n#error nope\n#endif\n").is_ok());
        let err = run("#error custom message").unwrap_err();
        assert!(err.message.contains("custom message"));
    }

    #[test]
    fn test_elif_chain() {
        let out = run("#define V 2\n#if V == 1\none\n#elif V == 2\ntwo\n#else\nthree\n#endif").unwrap();
        assert!(out.contains("two"));
        assert!(!out.contains("one"));
        assert!(!out.contains("three"));
    }

    #[test]
    fn test_self_referential_macro_terminates() {
        let out = run("#define X X + 1\nint y = X;").unwrap();
        assert!(out.contains("int y = X + 1;"));
    }
}
