//! Engine configuration
//!
//! [`EngineConfig`] collects every limit the engine enforces. Defaults are
//! tuned for interactive use; each can be overridden through `CRUSTRUN_*`
//! environment variables via [`EngineConfig::from_env`].

use crate::model::ExecutionLimits;
use log::warn;
use std::time::Duration;

/// Bounds for the project-tree scans performed by C++ retry variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// How many parent directories to climb looking for a project root.
    pub max_walk_up: usize,
    /// Depth limit when collecting sibling translation units below the root.
    pub max_source_depth: usize,
    /// Maximum number of extra translation units added to one attempt.
    pub max_extra_sources: usize,
    /// Depth limit when searching for missing headers.
    pub max_include_depth: usize,
    /// Maximum directories visited by a single header search.
    pub max_dirs: usize,
    /// Maximum directory entries inspected by a single scan.
    pub max_files_scanned: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        ScanLimits {
            max_walk_up: 6,
            max_source_depth: 4,
            max_extra_sources: 64,
            max_include_depth: 6,
            max_dirs: 2_000,
            max_files_scanned: 20_000,
        }
    }
}

/// Limits and tunables shared by every request handled by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub compile_limits: ExecutionLimits,
    pub run_limits: ExecutionLimits,
    pub inbuilt_limits: ExecutionLimits,
    /// Added to the inbuilt timeout to form the isolation unit's outer timeout.
    pub isolation_grace: Duration,
    pub max_call_depth: usize,
    /// Upper bound on elements held by a single emulated heap buffer.
    pub max_buffer_elems: usize,
    pub scan: ScanLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            compile_limits: ExecutionLimits::new(30_000, 4 * 1024 * 1024),
            run_limits: ExecutionLimits::new(10_000, 1024 * 1024),
            inbuilt_limits: ExecutionLimits::new(20_000, 2 * 1024 * 1024),
            isolation_grace: Duration::from_millis(1_500),
            max_call_depth: 10_000,
            max_buffer_elems: 64 * 1024 * 1024,
            scan: ScanLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with any `CRUSTRUN_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        let read = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(v) if v > 0 => Some(v),
                _ => {
                    warn!("ignoring invalid value {raw:?} for {key}");
                    None
                }
            }
        };

        if let Some(v) = read("CRUSTRUN_COMPILE_TIMEOUT_MS") {
            config.compile_limits.timeout_ms = v;
        }
        if let Some(v) = read("CRUSTRUN_COMPILE_MAX_OUTPUT") {
            config.compile_limits.max_output_bytes = v as usize;
        }
        if let Some(v) = read("CRUSTRUN_RUN_TIMEOUT_MS") {
            config.run_limits.timeout_ms = v;
        }
        if let Some(v) = read("CRUSTRUN_RUN_MAX_OUTPUT") {
            config.run_limits.max_output_bytes = v as usize;
        }
        if let Some(v) = read("CRUSTRUN_INBUILT_TIMEOUT_MS") {
            config.inbuilt_limits.timeout_ms = v;
        }
        if let Some(v) = read("CRUSTRUN_INBUILT_MAX_OUTPUT") {
            config.inbuilt_limits.max_output_bytes = v as usize;
        }
        if let Some(v) = read("CRUSTRUN_ISOLATION_GRACE_MS") {
            config.isolation_grace = Duration::from_millis(v);
        }

        config
    }

    /// Run-phase limits after applying per-request overrides.
    pub fn run_limits_for(&self, timeout_ms: Option<u64>, max_output: Option<usize>) -> ExecutionLimits {
        self.run_limits.overridden(timeout_ms, max_output)
    }

    /// Inbuilt-engine limits after applying per-request overrides.
    pub fn inbuilt_limits_for(
        &self,
        timeout_ms: Option<u64>,
        max_output: Option<usize>,
    ) -> ExecutionLimits {
        self.inbuilt_limits.overridden(timeout_ms, max_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CRUSTRUN_RUN_TIMEOUT_MS", "2500"),
            ("CRUSTRUN_INBUILT_MAX_OUTPUT", "4096"),
            ("CRUSTRUN_COMPILE_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.run_limits.timeout_ms, 2500);
        assert_eq!(config.inbuilt_limits.max_output_bytes, 4096);
        assert_eq!(config.compile_limits.timeout_ms, 30_000);
    }

    #[test]
    fn test_request_overrides_leave_compile_limits_alone() {
        let config = EngineConfig::default();
        let run = config.run_limits_for(Some(1000), None);
        assert_eq!(run.timeout_ms, 1000);
        assert_eq!(run.max_output_bytes, config.run_limits.max_output_bytes);
        assert_eq!(config.compile_limits.timeout_ms, 30_000);
    }
}
