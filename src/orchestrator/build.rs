//! Pieces shared by the C and C++ pipelines: temporary build directories,
//! compiler argument assembly, and mapping process outcomes onto
//! [`CompileRunResult`].

use crate::model::{CompileRunResult, Diagnostic, ExecutionLimits};
use crate::orchestrator::SourceUnit;
use crate::toolchain::profile::split_args;
use crate::toolchain::{run_process, CompilerCandidate, Family, ProcessResult, RunOptions};
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A per-request scratch directory, removed when dropped.
pub(crate) struct BuildDir {
    dir: Option<TempDir>,
    exe: PathBuf,
}

impl BuildDir {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("crustrun-").tempdir()?;
        let exe = dir
            .path()
            .join(format!("program{}", std::env::consts::EXE_SUFFIX));
        Ok(BuildDir {
            dir: Some(dir),
            exe,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.as_ref().map(TempDir::path).unwrap_or(Path::new("."))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }
}

impl Drop for BuildDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(err) = dir.close() {
                warn!("failed to remove build dir {}: {err}", path.display());
            }
        }
    }
}

/// `extraCompilerArgs`, split and partitioned into compile and link parts.
#[derive(Debug, Clone, Default)]
pub(crate) struct UserArgs {
    pub compile: Vec<String>,
    pub link: Vec<String>,
}

impl UserArgs {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut args = UserArgs::default();
        for arg in split_args(raw.unwrap_or("")) {
            if is_link_arg(&arg) {
                args.link.push(arg);
            } else {
                args.compile.push(arg);
            }
        }
        args
    }

    pub fn is_empty(&self) -> bool {
        self.compile.is_empty() && self.link.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.compile.iter().chain(self.link.iter())
    }

    /// The user pinned a language standard.
    pub fn has_std(&self) -> bool {
        self.all().any(|a| {
            let lower = a.to_ascii_lowercase();
            lower.starts_with("-std=") || lower.starts_with("/std:") || lower.starts_with("-std:")
        })
    }

    pub fn contains_any(&self, flags: &[&str]) -> bool {
        self.all()
            .any(|a| flags.iter().any(|f| a.eq_ignore_ascii_case(f)))
    }
}

fn is_link_arg(arg: &str) -> bool {
    let lower = arg.to_ascii_lowercase();
    lower.starts_with("-l")
        || lower.starts_with("-wl,")
        || [".a", ".lib", ".so", ".dylib"]
            .iter()
            .any(|ext| lower.ends_with(ext))
}

/// Everything that varies between compile attempts of one request.
#[derive(Debug, Clone, Default)]
pub(crate) struct Attempt<'a> {
    pub std_flag: Option<&'a str>,
    pub extra_sources: &'a [PathBuf],
    pub include_args: &'a [String],
    pub link_args: &'a [String],
}

/// Full argv (without the program) for compiling `source` into `build.exe()`.
pub(crate) fn compile_args(
    candidate: &CompilerCandidate,
    user: &UserArgs,
    source: &Path,
    build: &BuildDir,
    attempt: &Attempt<'_>,
) -> Vec<String> {
    let mut args: Vec<String> = if user.is_empty() {
        candidate.default_flags.clone()
    } else {
        user.compile.clone()
    };

    if let Some(std) = attempt.std_flag {
        args.push(match candidate.family {
            Family::Gnu => format!("-std={std}"),
            Family::Msvc => format!("/std:{std}"),
        });
    }
    args.extend(attempt.include_args.iter().cloned());
    args.push(source.display().to_string());
    args.extend(attempt.extra_sources.iter().map(|p| p.display().to_string()));

    match candidate.family {
        Family::Gnu => {
            args.push("-o".to_string());
            args.push(build.exe().display().to_string());
        }
        Family::Msvc => {
            args.push(format!("/Fe{}", build.exe().display()));
            args.push(format!("/Fo{}{}", build.path().display(), std::path::MAIN_SEPARATOR));
        }
    }

    args.extend(user.link.iter().cloned());
    args.extend(attempt.link_args.iter().cloned());
    args
}

/// Include-directory argument in the candidate's syntax.
pub(crate) fn include_arg(family: Family, dir: &Path) -> String {
    match family {
        Family::Gnu => format!("-I{}", dir.display()),
        Family::Msvc => format!("/I{}", dir.display()),
    }
}

pub(crate) fn display_command(program: &Path, args: &[String]) -> String {
    let mut parts = vec![quote_if_needed(&program.display().to_string())];
    parts.extend(args.iter().map(|a| quote_if_needed(a)));
    parts.join(" ")
}

fn quote_if_needed(arg: &str) -> String {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}

/// Run the compiler once under the compile-phase limits.
pub(crate) fn invoke_compiler(
    program: &Path,
    args: &[String],
    unit: &SourceUnit<'_>,
    limits: ExecutionLimits,
) -> ProcessResult {
    debug!("compile: {}", display_command(program, args));
    let opts = RunOptions::new(limits.timeout(), limits.max_output_bytes).cwd(&unit.dir);
    run_process(program, args, &opts)
}

/// Outcome of compiling one invocation, ready to become a result.
pub(crate) struct CompiledProgram<'a> {
    pub candidate: &'a CompilerCandidate,
    pub profile: &'a str,
    pub command: String,
    pub process: ProcessResult,
    pub diagnostics: Vec<Diagnostic>,
    pub notes: Vec<String>,
}

impl CompiledProgram<'_> {
    fn compile_output(&self) -> String {
        let output = self.process.combined_output();
        if self.notes.is_empty() {
            output
        } else {
            format!("{}\n{}", self.notes.join("\n"), output)
        }
    }

    /// Map a failed compile onto a compile-phase result.
    pub fn into_failure(self, limits: ExecutionLimits) -> CompileRunResult {
        let message = if self.process.timed_out {
            format!("Compilation timed out after {} ms", limits.timeout_ms)
        } else if self.process.output_truncated {
            format!(
                "Compiler output exceeded {} bytes and was truncated",
                limits.max_output_bytes
            )
        } else if let Some(err) = &self.process.error {
            err.clone()
        } else {
            match self.process.code {
                Some(code) => format!("Compilation failed (exit code {code})"),
                None => "Compilation failed".to_string(),
            }
        };

        let mut result =
            CompileRunResult::compile_failure(&self.candidate.id, self.profile, message)
                .with_command(self.command.clone())
                .with_compile_output(self.compile_output());
        result.exit_code = self.process.code;
        result.timed_out = self.process.timed_out;
        result.output_truncated = self.process.output_truncated;
        result.diagnostics = self.diagnostics;
        result
    }

    /// Run the produced executable and map the outcome onto a run-phase result.
    pub fn run(
        self,
        unit: &SourceUnit<'_>,
        build: &BuildDir,
        limits: ExecutionLimits,
    ) -> CompileRunResult {
        let opts = RunOptions::new(limits.timeout(), limits.max_output_bytes)
            .cwd(&unit.dir)
            .stdin(unit.request.stdin.as_deref());
        debug!("run: {}", build.exe().display());
        let no_args: [&str; 0] = [];
        let run = run_process(build.exe(), &no_args, &opts);

        let mut result = CompileRunResult::run_phase(&self.candidate.id, self.profile)
            .with_command(self.command.clone())
            .with_compile_output(self.compile_output());
        result.diagnostics = self.diagnostics;
        result.output = run.combined_output();
        result.exit_code = run.code;
        result.timed_out = run.timed_out;
        result.output_truncated = run.output_truncated;
        result.success = run.ok;
        result.error = run_error(&run, limits);
        result
    }
}

fn run_error(run: &ProcessResult, limits: ExecutionLimits) -> Option<String> {
    if run.timed_out {
        Some(format!("Program timed out after {} ms", limits.timeout_ms))
    } else if run.output_truncated {
        Some(format!(
            "Program output exceeded {} bytes and was truncated",
            limits.max_output_bytes
        ))
    } else if let Some(err) = &run.error {
        Some(err.clone())
    } else if let Some(signal) = run.signal {
        Some(format!("Program terminated by signal {signal}"))
    } else {
        match run.code {
            Some(0) => None,
            Some(code) => Some(format!("Program exited with code {code}")),
            None => Some("Program terminated abnormally".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{resolve_profile, Language, ResolvedProfile};

    fn candidate(profile: &str) -> CompilerCandidate {
        match resolve_profile(Language::Cpp, profile, None).unwrap() {
            ResolvedProfile::Toolchain { candidates, .. } => candidates[0].clone(),
            ResolvedProfile::Inbuilt => panic!("Expected toolchain profile"),
        }
    }

    #[test]
    fn test_user_args_partition() {
        let args = UserArgs::parse(Some("-O2 -lm -L/opt/lib foo.a -std=c++17"));
        assert_eq!(args.compile, vec!["-O2", "-std=c++17"]);
        assert_eq!(args.link, vec!["-lm", "-L/opt/lib", "foo.a"]);
        assert!(args.has_std());
    }

    #[test]
    fn test_gnu_link_args_follow_sources() {
        let build = BuildDir::new().unwrap();
        let user = UserArgs::parse(Some("-lpthread -O1"));
        let extra = vec!["-lstdc++fs".to_string()];
        let args = compile_args(
            &candidate("g++"),
            &user,
            Path::new("/src/main.cpp"),
            &build,
            &Attempt {
                std_flag: Some("c++17"),
                link_args: &extra,
                ..Attempt::default()
            },
        );
        let src = args.iter().position(|a| a == "/src/main.cpp").unwrap();
        let lib = args.iter().position(|a| a == "-lpthread").unwrap();
        assert!(args.contains(&"-std=c++17".to_string()));
        assert!(!args.contains(&"-Wall".to_string()));
        assert!(lib > src);
        assert_eq!(args.last().unwrap(), "-lstdc++fs");
    }

    #[test]
    fn test_msvc_output_flags() {
        let build = BuildDir::new().unwrap();
        let args = compile_args(
            &candidate("msvc"),
            &UserArgs::default(),
            Path::new("main.cpp"),
            &build,
            &Attempt::default(),
        );
        assert_eq!(args[0], "/nologo");
        assert!(args.iter().any(|a| a.starts_with("/Fe")));
        assert!(args.iter().any(|a| a.starts_with("/Fo")));
    }

    #[test]
    fn test_build_dir_removed_on_drop() {
        let build = BuildDir::new().unwrap();
        let path = build.path().to_path_buf();
        assert!(path.is_dir());
        drop(build);
        assert!(!path.exists());
    }
}
