//! Real-toolchain plumbing
//!
//! - [`profile`]: user profile → ordered compiler candidates
//! - [`locator`]: command name → executable paths
//! - [`process`]: bounded, argv-based child process runs
//! - [`diagnostics`]: compiler text → structured diagnostics

pub mod diagnostics;
pub mod locator;
pub mod process;
pub mod profile;

pub use diagnostics::{parse_diagnostics, parse_merged, DiagnosticDialect};
pub use locator::ToolchainLocator;
pub use process::{run_process, ProcessResult, RunOptions};
pub use profile::{resolve_profile, CompilerCandidate, Family, Language, ResolvedProfile};
