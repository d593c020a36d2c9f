//! C++ pipeline
//!
//! Same skeleton as the C pipeline with three additions:
//!
//! 1. When the user did not pin a standard, a descending ladder of standards
//!    is tried. The ladder only advances when the compiler rejects the
//!    standard flag itself.
//! 2. A failed compile is classified ([`retry::classify`]) and each resulting
//!    [`RetryVariant`] is tried in turn. The first one that builds wins and its
//!    notes are prepended to the compile output.
//! 3. If no candidate can be spawned at all, the request is handed to the
//!    Mini-C++ engine inside an isolation unit.

use crate::inbuilt::{self, Dialect, InbuiltJob};
use crate::model::{CompileRunResult, ExecutionLimits};
use crate::orchestrator::build::{self, Attempt, BuildDir, CompiledProgram, UserArgs};
use crate::orchestrator::retry::{self, RetryContext, RetryVariant};
use crate::orchestrator::{Engine, SourceUnit};
use crate::toolchain::{parse_merged, resolve_profile, CompilerCandidate, Family, Language, ProcessResult, ResolvedProfile};
use log::{debug, info};
use std::path::{Path, PathBuf};

const GNU_STD_LADDER: &[&str] = &["gnu++23", "c++23", "gnu++20", "c++20", "gnu++17", "c++17", "c++14"];
const MSVC_STD_LADDER: &[&str] = &["c++latest", "c++20", "c++17", "c++14"];

const STD_REJECTION_MARKERS: &[&str] = &[
    "unrecognized command-line option",
    "unrecognized command line option",
    "invalid value",
    "unknown argument",
    "not supported",
    "unsupported",
    "D9002",
];

pub(crate) fn run_cpp(engine: &Engine, unit: &SourceUnit<'_>) -> CompileRunResult {
    let request = unit.request;
    let config = engine.config();

    let resolved = match resolve_profile(
        Language::Cpp,
        &request.compiler_profile,
        request.custom_compiler_command.as_deref(),
    ) {
        Ok(resolved) => resolved,
        Err(err) => return CompileRunResult::compile_failure("custom", "custom", err.to_string()),
    };

    let (profile, candidates) = match resolved {
        ResolvedProfile::Inbuilt => return run_fallback(engine, unit),
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

    for candidate in &candidates {
        let resolved = engine.locator().resolve(&candidate.command);
        let invocations = if resolved.is_empty() {
            vec![PathBuf::from(&candidate.command)]
        } else {
            resolved
        };

        for program in invocations {
            let driver = CandidateBuild {
                engine,
                unit,
                build: &build,
                user: &user,
                candidate,
                program: &program,
                profile: &profile,
            };
            match driver.compile() {
                None => {
                    debug!("{} not invocable, trying next", program.display());
                    continue;
                }
                Some(compiled) => {
                    return if compiled.process.ok && build.exe().is_file() {
                        compiled.run(unit, &build, run_limits)
                    } else {
                        compiled.into_failure(config.compile_limits)
                    };
                }
            }
        }
    }

    info!("no C++ toolchain could be started; falling back to the inbuilt engine");
    run_fallback(engine, unit)
}

fn run_fallback(engine: &Engine, unit: &SourceUnit<'_>) -> CompileRunResult {
    let request = unit.request;
    let config = engine.config();
    let limits = config.inbuilt_limits_for(request.timeout_ms, request.max_output_bytes);
    let job = InbuiltJob::new(Dialect::Cpp, unit.text.clone(), unit.dir.clone(), limits, config)
        .with_stdin(request.stdin.clone().unwrap_or_default());
    inbuilt::run_isolated(job, config.isolation_grace)
}

/// Compile attempts for one resolved invocation of one candidate.
struct CandidateBuild<'a> {
    engine: &'a Engine,
    unit: &'a SourceUnit<'a>,
    build: &'a BuildDir,
    user: &'a UserArgs,
    candidate: &'a CompilerCandidate,
    program: &'a Path,
    profile: &'a str,
}

impl<'a> CandidateBuild<'a> {
    fn limits(&self) -> ExecutionLimits {
        self.engine.config().compile_limits
    }

    /// `None` when the program cannot be spawned.
    fn compile(&self) -> Option<CompiledProgram<'a>> {
        let ladder: Vec<Option<&str>> = if self.user.has_std() {
            vec![None]
        } else {
            match self.candidate.family {
                Family::Gnu => GNU_STD_LADDER.iter().map(|s| Some(*s)).collect(),
                Family::Msvc => MSVC_STD_LADDER.iter().map(|s| Some(*s)).collect(),
            }
        };

        let mut notes: Vec<String> = Vec::new();
        for (index, std_flag) in ladder.iter().enumerate() {
            let base = RetryVariant::default();
            let (args, process) = self.attempt(*std_flag, &base);
            if process.not_found {
                return None;
            }
            if process.ok {
                return Some(self.finish(args, process, notes));
            }

            let output = process.combined_output();
            let has_next = index + 1 < ladder.len();
            if let Some(std) = std_flag {
                if has_next && std_rejected(&output, std) {
                    debug!("{} rejected standard {std}", self.program.display());
                    notes.push(format!("Note: {std} is not supported by this compiler; trying an older standard"));
                    continue;
                }
            }

            if process.timed_out || process.output_truncated {
                return Some(self.finish(args, process, notes));
            }

            let class = retry::classify(&output);
            let ctx = RetryContext {
                source: &self.unit.path,
                family: self.candidate.family,
                user_args: self.user,
                scan: &self.engine.config().scan,
            };
            for variant in retry::build_variants(&class, &ctx) {
                debug!("retry variant: {:?}", variant.notes);
                let (retry_args, retry_process) = self.attempt(*std_flag, &variant);
                if retry_process.ok {
                    let mut all_notes = notes.clone();
                    all_notes.extend(variant.notes.iter().cloned());
                    return Some(self.finish(retry_args, retry_process, all_notes));
                }
            }

            return Some(self.finish(args, process, notes));
        }

        None
    }

    fn attempt(&self, std_flag: Option<&str>, variant: &RetryVariant) -> (Vec<String>, ProcessResult) {
        let args = build::compile_args(
            self.candidate,
            self.user,
            &self.unit.path,
            self.build,
            &Attempt {
                std_flag,
                extra_sources: &variant.extra_sources,
                include_args: &variant.include_extra_args,
                link_args: &variant.link_extra_args,
            },
        );
        let process = build::invoke_compiler(self.program, &args, self.unit, self.limits());
        (args, process)
    }

    fn finish(&self, args: Vec<String>, process: ProcessResult, notes: Vec<String>) -> CompiledProgram<'a> {
        let diagnostics = parse_merged(&process.combined_output(), &self.unit.path, &self.unit.dir);
        CompiledProgram {
            candidate: self.candidate,
            profile: self.profile,
            command: build::display_command(self.program, &args),
            process,
            diagnostics,
            notes,
        }
    }
}

/// The compiler refused the `-std=`/`/std:` value itself.
fn std_rejected(output: &str, std: &str) -> bool {
    output.lines().any(|line| {
        line.contains(std) && STD_REJECTION_MARKERS.iter().any(|m| line.contains(m))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_rejection_detection() {
        assert!(std_rejected(
            "g++: error: unrecognized command-line option '-std=gnu++23'; did you mean '-std=gnu++2a'?",
            "gnu++23"
        ));
        assert!(std_rejected(
            "error: invalid value 'c++23' in '-std=c++23'",
            "c++23"
        ));
        assert!(!std_rejected("main.cpp:3:1: error: 'foo' was not declared", "c++17"));
    }
}
