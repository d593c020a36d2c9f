//! Compiler output → structured diagnostics
//!
//! Understands GNU-style (`file:line:col: severity: message`) and MSVC-style
//! (`file(line,col): severity CODE: message`) lines. Only diagnostics that
//! resolve to the target source file are kept; results are deduplicated and
//! sorted by `(line, col, message)`.

use crate::model::{Diagnostic, Severity};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Which compiler message syntax to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticDialect {
    Gnu,
    Msvc,
}

fn gnu_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>.+?):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<sev>fatal error|error|warning):\s*(?P<msg>.*?)\s*$",
        )
        .expect("Invalid regex pattern")
    })
}

fn gnu_flag_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*\[(?P<code>-W[^\]]+)\]$").expect("Invalid regex pattern"))
}

fn msvc_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<file>.+?)\((?P<line>\d+)(?:,(?P<col>\d+))?\)\s*:\s*(?P<sev>fatal error|error|warning)\s+(?P<code>[A-Za-z]+\d+)\s*:\s*(?P<msg>.*?)\s*$",
        )
        .expect("Invalid regex pattern")
    })
}

/// Parse `output` in one dialect, keeping only diagnostics for `target`.
pub fn parse_diagnostics(
    output: &str,
    dialect: DiagnosticDialect,
    target: &Path,
    cwd: &Path,
) -> Vec<Diagnostic> {
    let target_key = path_key(target, cwd);
    let mut diagnostics = Vec::new();

    for raw in output.lines() {
        let line = raw.trim_end_matches('\r');
        let parsed = match dialect {
            DiagnosticDialect::Gnu => parse_gnu_line(line),
            DiagnosticDialect::Msvc => parse_msvc_line(line),
        };
        if let Some((file, diagnostic)) = parsed {
            if path_key(Path::new(&file), cwd) == target_key {
                diagnostics.push(diagnostic);
            }
        }
    }

    normalize(diagnostics)
}

/// Parse both dialects and merge the results.
pub fn parse_merged(output: &str, target: &Path, cwd: &Path) -> Vec<Diagnostic> {
    let mut all = parse_diagnostics(output, DiagnosticDialect::Gnu, target, cwd);
    all.extend(parse_diagnostics(output, DiagnosticDialect::Msvc, target, cwd));
    normalize(all)
}

/// Deduplicate by `(severity, line, col, code, message)` and sort by `(line, col, message)`.
pub fn normalize(diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Diagnostic> = diagnostics
        .into_iter()
        .filter(|d| {
            seen.insert((d.severity, d.line, d.col, d.code.clone(), d.message.clone()))
        })
        .collect();
    unique.sort_by(|a, b| {
        (a.line, a.col, &a.message).cmp(&(b.line, b.col, &b.message))
    });
    unique
}

fn parse_severity(raw: &str) -> Severity {
    if raw == "warning" {
        Severity::Warning
    } else {
        Severity::Error
    }
}

fn parse_gnu_line(line: &str) -> Option<(String, Diagnostic)> {
    let caps = gnu_pattern().captures(line)?;
    let mut message = caps["msg"].to_string();
    let mut code = String::new();
    if let Some(flag) = gnu_flag_suffix().captures(&message) {
        code = flag["code"].to_string();
        let cut = flag.get(0).map(|m| m.start()).unwrap_or(message.len());
        message.truncate(cut);
    }
    Some((
        caps["file"].trim().to_string(),
        Diagnostic {
            line: caps["line"].parse().ok()?,
            col: caps.name("col").and_then(|m| m.as_str().parse().ok()).unwrap_or(1),
            severity: parse_severity(&caps["sev"]),
            code,
            message,
        },
    ))
}

fn parse_msvc_line(line: &str) -> Option<(String, Diagnostic)> {
    let caps = msvc_pattern().captures(line)?;
    Some((
        caps["file"].trim().to_string(),
        Diagnostic {
            line: caps["line"].parse().ok()?,
            col: caps.name("col").and_then(|m| m.as_str().parse().ok()).unwrap_or(1),
            severity: parse_severity(&caps["sev"]),
            code: caps["code"].to_string(),
            message: caps["msg"].to_string(),
        },
    ))
}

/// Comparable identity for a reported path.
fn path_key(path: &Path, cwd: &Path) -> String {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    let resolved = std::fs::canonicalize(&absolute).unwrap_or_else(|_| lexical_normalize(&absolute));
    let key = resolved.to_string_lossy().replace('\\', "/");
    if cfg!(windows) {
        key.to_ascii_lowercase()
    } else {
        key
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnu_line_with_flag_code() {
        let (file, d) =
            parse_gnu_line("main.c:4:9: warning: unused variable 'x' [-Wunused-variable]").unwrap();
        assert_eq!(file, "main.c");
        assert_eq!((d.line, d.col), (4, 9));
        assert_eq!(d.severity, Severity::Warning);
        assert_eq!(d.code, "-Wunused-variable");
        assert_eq!(d.message, "unused variable 'x'");
    }

    #[test]
    fn test_fatal_error_is_error() {
        let (_, d) = parse_gnu_line("a.cpp:1:10: fatal error: foo.h: No such file or directory")
            .unwrap();
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.message, "foo.h: No such file or directory");
    }

    #[test]
    fn test_msvc_line() {
        let (file, d) = parse_msvc_line(
            r"C:\work\main.cpp(12,5): error C2065: 'y': undeclared identifier",
        )
        .unwrap();
        assert_eq!(file, r"C:\work\main.cpp");
        assert_eq!((d.line, d.col), (12, 5));
        assert_eq!(d.code, "C2065");
    }

    #[test]
    fn test_filters_other_files_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("main.c");
        std::fs::write(&target, "int main(){}").unwrap();
        let output = "\
/usr/include/stdio.h:10:1: error: bogus
main.c:7:2: error: b second
main.c:3:5: warning: a first
main.c:7:2: error: b second
./main.c:7:1: error: c before
";
        let diags = parse_diagnostics(output, DiagnosticDialect::Gnu, &target, dir.path());
        let got: Vec<(usize, usize)> = diags.iter().map(|d| (d.line, d.col)).collect();
        assert_eq!(got, vec![(3, 5), (7, 1), (7, 2)]);
    }
}
