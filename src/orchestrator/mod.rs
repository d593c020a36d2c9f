//! Request dispatch and compile-and-run pipelines
//!
//! [`Engine::run`] is the outermost boundary: it validates the request, routes
//! it to the C or C++ pipeline, and converts any panic into a failure result.
//!
//! - [`c`]: C pipeline over real toolchains
//! - [`cpp`]: C++ pipeline with the standard ladder and self-healing retries
//! - [`retry`]: failure classification and retry variants
//! - [`project`]: bounded project-tree scans used by retries
//! - `build`: argument assembly, temp dirs and result mapping shared by both

mod build;
pub mod c;
pub mod cpp;
pub mod project;
pub mod retry;

use crate::config::EngineConfig;
use crate::model::{CompileRunResult, RunRequest};
use crate::toolchain::{Language, ToolchainLocator};
use log::{debug, error};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Compile-and-run engine. Cheap to share by reference across threads.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    locator: ToolchainLocator,
}

/// Validated request data handed to the language pipelines.
#[derive(Debug)]
pub(crate) struct SourceUnit<'a> {
    pub request: &'a RunRequest,
    pub path: PathBuf,
    pub dir: PathBuf,
    pub text: String,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            config,
            locator: ToolchainLocator::from_env(),
        }
    }

    /// Engine with an explicit locator (used to pin the search `PATH`).
    pub fn with_locator(config: EngineConfig, locator: ToolchainLocator) -> Self {
        Engine { config, locator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locator(&self) -> &ToolchainLocator {
        &self.locator
    }

    /// Compile and run one request. Never panics; every path ends in a result.
    pub fn run(&self, request: &RunRequest) -> CompileRunResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("internal error while handling {:?}: {message}", request.source_path);
                CompileRunResult::compile_failure(
                    "unknown",
                    &request.compiler_profile,
                    format!("Internal error: {message}"),
                )
            }
        }
    }

    fn dispatch(&self, request: &RunRequest) -> CompileRunResult {
        let profile = request.compiler_profile.as_str();
        let Some(language) = language_for(&request.source_path) else {
            return CompileRunResult::compile_failure(
                "unknown",
                profile,
                format!(
                    "Unsupported file extension for {}: expected .c, .cpp, .cc, .cxx or .c++",
                    request.source_path.display()
                ),
            );
        };

        let text = match std::fs::read_to_string(&request.source_path) {
            Ok(text) => text,
            Err(err) => {
                return CompileRunResult::compile_failure(
                    "unknown",
                    profile,
                    format!("Failed to read {}: {err}", request.source_path.display()),
                );
            }
        };

        let path = std::fs::canonicalize(&request.source_path)
            .unwrap_or_else(|_| request.source_path.clone());
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!("dispatching {} as {language}", path.display());
        let unit = SourceUnit {
            request,
            path,
            dir,
            text,
        };

        match language {
            Language::C => c::run_c(self, &unit),
            Language::Cpp => cpp::run_cpp(self, &unit),
        }
    }
}

/// Source language implied by the file extension.
pub fn language_for(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "c" => Some(Language::C),
        "cpp" | "cc" | "cxx" | "c++" => Some(Language::Cpp),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Phase;

    #[test]
    fn test_language_for_extensions() {
        assert_eq!(language_for(Path::new("a.c")), Some(Language::C));
        assert_eq!(language_for(Path::new("a.CC")), Some(Language::Cpp));
        assert_eq!(language_for(Path::new("a.c++")), Some(Language::Cpp));
        assert_eq!(language_for(Path::new("a.rs")), None);
        assert_eq!(language_for(Path::new("Makefile")), None);
    }

    #[test]
    fn test_unsupported_extension_is_compile_failure() {
        let engine = Engine::default();
        let result = engine.run(&RunRequest::new("/nonexistent/prog.py", "auto"));
        assert!(!result.success);
        assert_eq!(result.phase, Phase::Compile);
        assert!(result.error.unwrap().contains("Unsupported file extension"));
    }
}
