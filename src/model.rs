//! Request and result types shared by every execution path
//!
//! [`RunRequest`] and [`CompileRunResult`] are the engine's external contract
//! and serialize with camelCase field names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A single compile-and-run request from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub source_path: PathBuf,
    #[serde(default)]
    pub compiler_profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_compiler_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_compiler_args: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_bytes: Option<usize>,
}

impl RunRequest {
    pub fn new(source_path: impl Into<PathBuf>, compiler_profile: impl Into<String>) -> Self {
        RunRequest {
            source_path: source_path.into(),
            compiler_profile: compiler_profile.into(),
            ..RunRequest::default()
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_compiler_args = Some(args.into());
        self
    }

    pub fn with_custom_command(mut self, command: impl Into<String>) -> Self {
        self.custom_compiler_command = Some(command.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = Some(bytes);
        self
    }
}

/// Wall-clock and output limits for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLimits {
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl ExecutionLimits {
    pub const fn new(timeout_ms: u64, max_output_bytes: usize) -> Self {
        ExecutionLimits {
            timeout_ms,
            max_output_bytes,
        }
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Copy with non-zero overrides applied.
    pub fn overridden(&self, timeout_ms: Option<u64>, max_output: Option<usize>) -> Self {
        ExecutionLimits {
            timeout_ms: timeout_ms.filter(|v| *v > 0).unwrap_or(self.timeout_ms),
            max_output_bytes: max_output.filter(|v| *v > 0).unwrap_or(self.max_output_bytes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Compile,
    Run,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Compile => write!(f, "compile"),
            Phase::Run => write!(f, "run"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A compiler message pinned to a position in the target source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub line: usize,
    pub col: usize,
    pub severity: Severity,
    #[serde(default)]
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(line: usize, col: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            col,
            severity: Severity::Error,
            code: String::new(),
            message: message.into(),
        }
    }
}

/// The single result shape returned for every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRunResult {
    pub success: bool,
    pub phase: Phase,
    pub compiler: String,
    pub compiler_profile: String,
    pub compiler_command: String,
    pub output: String,
    pub compile_output: String,
    pub diagnostics: Vec<Diagnostic>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub output_truncated: bool,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tried: Vec<String>,
}

impl CompileRunResult {
    fn blank(phase: Phase, compiler: &str, profile: &str) -> Self {
        CompileRunResult {
            success: false,
            phase,
            compiler: compiler.to_string(),
            compiler_profile: profile.to_string(),
            compiler_command: String::new(),
            output: String::new(),
            compile_output: String::new(),
            diagnostics: Vec::new(),
            exit_code: None,
            timed_out: false,
            output_truncated: false,
            error: None,
            tried: Vec::new(),
        }
    }

    /// A compile-phase failure carrying only an error message.
    pub fn compile_failure(compiler: &str, profile: &str, error: impl Into<String>) -> Self {
        let mut result = Self::blank(Phase::Compile, compiler, profile);
        result.error = Some(error.into());
        result
    }

    /// A run-phase result with no outcome filled in yet.
    pub fn run_phase(compiler: &str, profile: &str) -> Self {
        Self::blank(Phase::Run, compiler, profile)
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.compiler_command = command.into();
        self
    }

    pub fn with_compile_output(mut self, compile_output: impl Into<String>) -> Self {
        self.compile_output = compile_output.into();
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Vec<Diagnostic>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "sourcePath": "/tmp/a.c",
            "compilerProfile": "gcc",
            "extraCompilerArgs": "-O2",
            "timeoutMs": 500
        }"#;
        let req: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.source_path, PathBuf::from("/tmp/a.c"));
        assert_eq!(req.compiler_profile, "gcc");
        assert_eq!(req.extra_compiler_args.as_deref(), Some("-O2"));
        assert_eq!(req.timeout_ms, Some(500));
        assert!(req.stdin.is_none());
    }

    #[test]
    fn test_result_omits_empty_tried() {
        let result = CompileRunResult::compile_failure("gcc", "gcc", "boom");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["phase"], "compile");
        assert_eq!(json["compilerProfile"], "gcc");
        assert!(json.get("tried").is_none());
        assert_eq!(json["exitCode"], serde_json::Value::Null);
    }
}
