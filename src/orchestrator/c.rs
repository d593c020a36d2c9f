//! C pipeline
//!
//! ```text
//! resolve profile ─┬─ inbuilt ──────────────► Mini-C engine
//!                  └─ candidates ─► for each resolved invocation:
//!                                     compile ─┬─ not found ─► next
//!                                              ├─ failed ────► compile result
//!                                              └─ ok ────────► run ─► run result
//! ```
//!
//! When no candidate can be spawned at all the result names every command
//! tried. There is no inbuilt fallback on this path.

use crate::inbuilt::{self, Dialect, InbuiltJob};
use crate::model::CompileRunResult;
use crate::orchestrator::build::{self, Attempt, BuildDir, CompiledProgram, UserArgs};
use crate::orchestrator::{Engine, SourceUnit};
use crate::toolchain::{parse_diagnostics, resolve_profile, DiagnosticDialect, Family, Language, ResolvedProfile};
use log::debug;
use std::path::PathBuf;

pub(crate) fn run_c(engine: &Engine, unit: &SourceUnit<'_>) -> CompileRunResult {
    let request = unit.request;
    let config = engine.config();

    let resolved = match resolve_profile(
        Language::C,
        &request.compiler_profile,
        request.custom_compiler_command.as_deref(),
    ) {
        Ok(resolved) => resolved,
        Err(err) => return CompileRunResult::compile_failure("custom", "custom", err.to_string()),
    };

    let (profile, candidates) = match resolved {
        ResolvedProfile::Inbuilt => {
            let limits = config.inbuilt_limits_for(request.timeout_ms, request.max_output_bytes);
            let job = InbuiltJob::new(Dialect::C, unit.text.clone(), unit.dir.clone(), limits, config)
                .with_stdin(request.stdin.clone().unwrap_or_default());
            return inbuilt::run_inbuilt(job);
        }
        ResolvedProfile::Toolchain { name, candidates } => (name, candidates),
    };

    let build = match BuildDir::new() {
        Ok(build) => build,
        Err(err) => {
            return CompileRunResult::compile_failure(
                &profile,
                &profile,
                format!("Failed to create build directory: {err}"),
            )
        }
    };

    let user = UserArgs::parse(request.extra_compiler_args.as_deref());
    let run_limits = config.run_limits_for(request.timeout_ms, request.max_output_bytes);
    let mut tried: Vec<String> = Vec::new();

    for candidate in &candidates {
        let resolved = engine.locator().resolve(&candidate.command);
        let invocations = if resolved.is_empty() {
            vec![PathBuf::from(&candidate.command)]
        } else {
            resolved
        };

        let math: Vec<String> = if candidate.family == Family::Gnu && !cfg!(windows) {
            vec!["-lm".to_string()]
        } else {
            Vec::new()
        };

        for program in invocations {
            tried.push(program.display().to_string());
            let args = build::compile_args(
                candidate,
                &user,
                &unit.path,
                &build,
                &Attempt {
                    link_args: &math,
                    ..Attempt::default()
                },
            );
            let process = build::invoke_compiler(&program, &args, unit, config.compile_limits);
            if process.not_found {
                debug!("{} not invocable, trying next", program.display());
                continue;
            }

            let dialect = match candidate.family {
                Family::Gnu => DiagnosticDialect::Gnu,
                Family::Msvc => DiagnosticDialect::Msvc,
            };
            let diagnostics =
                parse_diagnostics(&process.combined_output(), dialect, &unit.path, &unit.dir);
            let compiled = CompiledProgram {
                candidate,
                profile: &profile,
                command: build::display_command(&program, &args),
                process,
                diagnostics,
                notes: Vec::new(),
            };

            return if compiled.process.ok && build.exe().is_file() {
                compiled.run(unit, &build, run_limits)
            } else {
                compiled.into_failure(config.compile_limits)
            };
        }
    }

    let message = if profile == "custom" {
        format!(
            "Custom compiler command was not found: {}",
            candidates.first().map(|c| c.command.as_str()).unwrap_or("")
        )
    } else {
        "No C compiler found in PATH".to_string()
    };
    let mut result = CompileRunResult::compile_failure(&profile, &profile, message);
    result.tried = tried;
    result
}
