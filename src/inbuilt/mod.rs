//! Inbuilt Mini-C and Mini-C++ engines
//!
//! An [`InbuiltJob`] carries everything one run needs: dialect, source text,
//! the directory file paths resolve against, stdin and limits. [`run_inbuilt`]
//! compiles and executes it in-process and folds every outcome into a
//! [`CompileRunResult`]; [`run_isolated`] does the same inside a worker
//! thread with an outer timeout.
//!
//! Front-end failures and the runtime errors a real compiler would have
//! caught are reported as `phase: compile` with a precise diagnostic. Both are
//! prefixed with a note that the engine covers a subset of the language.

mod worker;

pub use crate::parser::Dialect;
pub use worker::run_isolated;

use crate::config::EngineConfig;
use crate::interpreter::{Control, Interpreter, RunOptions, RuntimeError};
use crate::model::{CompileRunResult, Diagnostic, ExecutionLimits, Phase};
use crate::parser::{compile_program, CompileError};
use log::{debug, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::Receiver;

/// Stack size of the thread that walks the program. Deep recursion in user
/// code recurses in the interpreter too.
pub(crate) const ENGINE_STACK_BYTES: usize = 512 * 1024 * 1024;

pub const PROFILE: &str = "inbuilt";

/// One program for an inbuilt engine.
#[derive(Debug, Clone)]
pub struct InbuiltJob {
    pub dialect: Dialect,
    pub source: String,
    pub source_dir: PathBuf,
    pub stdin: String,
    pub limits: ExecutionLimits,
    pub max_call_depth: usize,
    pub max_buffer_elems: usize,
}

impl InbuiltJob {
    pub fn new(
        dialect: Dialect,
        source: String,
        source_dir: PathBuf,
        limits: ExecutionLimits,
        config: &EngineConfig,
    ) -> Self {
        InbuiltJob {
            dialect,
            source,
            source_dir,
            stdin: String::new(),
            limits,
            max_call_depth: config.max_call_depth,
            max_buffer_elems: config.max_buffer_elems,
        }
    }

    pub fn with_stdin(mut self, stdin: String) -> Self {
        self.stdin = stdin;
        self
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            dialect: self.dialect,
            stdin: self.stdin.clone(),
            source_dir: self.source_dir.clone(),
            timeout: self.limits.timeout(),
            max_output_bytes: self.limits.max_output_bytes,
            max_call_depth: self.max_call_depth,
            max_buffer_elems: self.max_buffer_elems,
        }
    }
}

/// Name reported in `compiler` for a dialect.
pub fn compiler_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::C => "inbuilt-mini-c",
        Dialect::Cpp => "inbuilt-mini-cpp",
    }
}

fn subset_notice(dialect: Dialect) -> String {
    let lang = dialect.language_name();
    format!("The inbuilt {lang} engine supports an extended subset of {lang}, not full {lang}.")
}

/// Compile and run `job` in the calling process.
///
/// The program runs on a dedicated large-stack thread when one can be
/// spawned, and inline otherwise.
pub fn run_inbuilt(job: InbuiltJob) -> CompileRunResult {
    let dialect = job.dialect;
    let spawned = std::thread::Builder::new()
        .name(compiler_name(dialect).to_string())
        .stack_size(ENGINE_STACK_BYTES);

    // The job moves into the thread on success; keep a copy for the fallback.
    let fallback = job.clone();
    let handle = match spawned.spawn(move || guarded(job, None)) {
        Ok(handle) => handle,
        Err(err) => {
            warn!("could not spawn engine thread ({err}); running inline");
            return guarded(fallback, None);
        }
    };
    match handle.join() {
        Ok(result) => result,
        Err(_) => crash_result(dialect, "engine thread panicked"),
    }
}

pub(crate) fn guarded(job: InbuiltJob, control: Option<Receiver<Control>>) -> CompileRunResult {
    let dialect = job.dialect;
    match panic::catch_unwind(AssertUnwindSafe(|| run_job(job, control))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            crash_result(dialect, &message)
        }
    }
}

fn run_job(job: InbuiltJob, control: Option<Receiver<Control>>) -> CompileRunResult {
    let dialect = job.dialect;
    let program = match compile_program(&job.source, dialect) {
        Ok(program) => program,
        Err(err) => {
            debug!("{} rejected the program: {err}", compiler_name(dialect));
            return compile_error_result(dialect, &err);
        }
    };

    let mut interpreter = Interpreter::new(program, job.options());
    if let Some(rx) = control {
        interpreter = interpreter.with_control(rx);
    }
    let outcome = interpreter.run();
    let output = interpreter.output();
    let truncated = output.truncated();
    let text = output.to_text();
    map_outcome(dialect, outcome, text, truncated)
}

fn compile_error_result(dialect: Dialect, err: &CompileError) -> CompileRunResult {
    let message = format!("{} {}", subset_notice(dialect), err);
    let diagnostic = Diagnostic::error(err.location.line, err.location.column, err.message.clone());
    CompileRunResult::compile_failure(compiler_name(dialect), PROFILE, message.clone())
        .with_command(PROFILE)
        .with_compile_output(message)
        .with_diagnostics(vec![diagnostic])
}

/// Fold the interpreter's outcome into the result shape.
pub(crate) fn map_outcome(
    dialect: Dialect,
    outcome: Result<i32, RuntimeError>,
    output: String,
    output_truncated: bool,
) -> CompileRunResult {
    let compiler = compiler_name(dialect);
    let mut result = CompileRunResult::run_phase(compiler, PROFILE).with_command(PROFILE);
    result.output = output;
    result.output_truncated = output_truncated;

    match outcome {
        Ok(code) => {
            result.success = code == 0;
            result.exit_code = Some(code);
        }
        Err(err) if err.is_compile_class() => {
            let message = format!("{} {}", subset_notice(dialect), err);
            let (line, col) = err
                .location()
                .map_or((1, 1), |loc| (loc.line, loc.column));
            result.phase = Phase::Compile;
            result.diagnostics = vec![Diagnostic::error(line, col, err.to_string())];
            result.compile_output = message.clone();
            result.error = Some(message);
        }
        Err(err @ RuntimeError::Timeout { .. }) => {
            result.timed_out = true;
            result.error = Some(err.to_string());
        }
        Err(err @ RuntimeError::OutputLimitExceeded { .. }) => {
            result.output_truncated = true;
            result.error = Some(err.to_string());
        }
        Err(err) => {
            result.exit_code = Some(1);
            result.error = Some(format!("Runtime error: {err}"));
        }
    }
    result
}

pub(crate) fn crash_result(dialect: Dialect, message: &str) -> CompileRunResult {
    let mut result = CompileRunResult::run_phase(compiler_name(dialect), PROFILE).with_command(PROFILE);
    result.error = Some(format!("Inbuilt engine crashed: {message}"));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;

    fn job(dialect: Dialect, source: &str) -> InbuiltJob {
        InbuiltJob::new(
            dialect,
            source.to_string(),
            std::env::temp_dir(),
            ExecutionLimits::new(5_000, 64 * 1024),
            &EngineConfig::default(),
        )
    }

    #[test]
    fn test_success_maps_exit_code() {
        let result = run_inbuilt(job(Dialect::C, "int main() { printf(\"hi\\n\"); return 0; }"));
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.phase, Phase::Run);
        assert_eq!(result.output, "hi\n");
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.compiler, "inbuilt-mini-c");
        assert_eq!(result.compiler_profile, "inbuilt");
    }

    #[test]
    fn test_nonzero_exit_is_not_success() {
        let result = run_inbuilt(job(Dialect::C, "int main() { return 3; }"));
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_compile_error_carries_location_and_notice() {
        let result = run_inbuilt(job(Dialect::C, "int main() {\n  goto end;\n}"));
        assert_eq!(result.phase, Phase::Compile);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].line, 2);
        assert!(result.error.unwrap().contains("extended subset of C, not full C"));
    }

    #[test]
    fn test_compile_class_runtime_error_is_reclassified() {
        let loc = SourceLocation::new(4, 7);
        let err = RuntimeError::UndefinedFunction {
            name: "frobnicate".to_string(),
            location: loc,
        };
        let result = map_outcome(Dialect::Cpp, Err(err), String::new(), false);
        assert_eq!(result.phase, Phase::Compile);
        assert_eq!(result.diagnostics[0].line, 4);
        assert_eq!(result.diagnostics[0].col, 7);
        assert!(result.error.unwrap().starts_with("The inbuilt C++ engine"));
    }

    #[test]
    fn test_runtime_error_and_limits() {
        let fault = map_outcome(
            Dialect::C,
            Err(RuntimeError::DivisionByZero {
                location: SourceLocation::new(2, 1),
            }),
            "partial".to_string(),
            false,
        );
        assert_eq!(fault.phase, Phase::Run);
        assert_eq!(fault.exit_code, Some(1));
        assert_eq!(fault.output, "partial");
        assert!(fault.error.unwrap().starts_with("Runtime error: Division by zero"));

        let slow = map_outcome(Dialect::C, Err(RuntimeError::Timeout { timeout_ms: 10 }), String::new(), false);
        assert!(slow.timed_out);
        assert!(!slow.success);

        let noisy = map_outcome(
            Dialect::C,
            Err(RuntimeError::OutputLimitExceeded { limit: 4 }),
            "abcd".to_string(),
            true,
        );
        assert!(noisy.output_truncated);
        assert_eq!(noisy.exit_code, None);
    }
}
