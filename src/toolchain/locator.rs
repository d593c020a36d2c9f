//! Compiler executable discovery
//!
//! [`ToolchainLocator`] maps a bare command name such as `g++` to every
//! executable path that could run it. The search-directory list is built
//! lazily once per locator and reused for its lifetime.

use log::debug;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Resolves command names to executable paths.
#[derive(Debug)]
pub struct ToolchainLocator {
    path_var: Option<OsString>,
    extra_dirs: bool,
    dirs: OnceLock<Vec<PathBuf>>,
}

impl Default for ToolchainLocator {
    fn default() -> Self {
        Self::from_env()
    }
}

impl ToolchainLocator {
    /// Locator over the current process `PATH` (plus well-known install dirs on Windows).
    pub fn from_env() -> Self {
        ToolchainLocator {
            path_var: std::env::var_os("PATH"),
            extra_dirs: cfg!(windows),
            dirs: OnceLock::new(),
        }
    }

    /// Locator over an explicit `PATH`-style value; no extra directories.
    pub fn with_path(path_var: impl Into<OsString>) -> Self {
        ToolchainLocator {
            path_var: Some(path_var.into()),
            extra_dirs: false,
            dirs: OnceLock::new(),
        }
    }

    /// Search directories, computed on first use.
    pub fn search_dirs(&self) -> &[PathBuf] {
        self.dirs.get_or_init(|| {
            let mut dirs: Vec<PathBuf> = self
                .path_var
                .as_ref()
                .map(|p| std::env::split_paths(p).filter(|d| !d.as_os_str().is_empty()).collect())
                .unwrap_or_default();
            if self.extra_dirs {
                dirs.extend(windows_install_dirs());
            }
            let dirs = dedupe_paths(dirs);
            debug!("toolchain search dirs: {} entries", dirs.len());
            dirs
        })
    }

    /// Every plausible invocable path for `command`.
    ///
    /// Path-like commands are returned unchanged without searching.
    pub fn resolve(&self, command: &str) -> Vec<PathBuf> {
        if looks_like_path(command) {
            return vec![PathBuf::from(command)];
        }

        let mut found = Vec::new();
        for dir in self.search_dirs() {
            for suffix in executable_suffixes(command) {
                let candidate = dir.join(format!("{command}{suffix}"));
                if candidate.is_file() {
                    found.push(candidate);
                }
            }
        }
        dedupe_paths(found)
    }
}

/// True when `command` contains a path separator or a drive prefix.
pub fn looks_like_path(command: &str) -> bool {
    if command.contains('/') || command.contains('\\') {
        return true;
    }
    let bytes = command.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn executable_suffixes(command: &str) -> &'static [&'static str] {
    if cfg!(windows) {
        let lower = command.to_ascii_lowercase();
        if lower.ends_with(".exe") || lower.ends_with(".cmd") || lower.ends_with(".bat") {
            &[""]
        } else {
            &[".exe", ".cmd", ".bat", ""]
        }
    } else {
        &[""]
    }
}

fn dedupe_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| {
            let key = p.to_string_lossy().to_string();
            let key = if cfg!(windows) { key.to_ascii_lowercase() } else { key };
            seen.insert(key)
        })
        .collect()
}

fn windows_install_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = [
        r"C:\msys64\mingw64\bin",
        r"C:\msys64\ucrt64\bin",
        r"C:\msys64\clang64\bin",
        r"C:\msys64\usr\bin",
        r"C:\MinGW\bin",
        r"C:\mingw64\bin",
        r"C:\TDM-GCC-64\bin",
        r"C:\Program Files\LLVM\bin",
        r"C:\ProgramData\chocolatey\bin",
    ]
    .iter()
    .map(PathBuf::from)
    .collect();

    let env_dir = |var: &str, tail: &[&str]| -> Option<PathBuf> {
        let root = std::env::var_os(var)?;
        let mut path = PathBuf::from(root);
        for part in tail {
            path.push(part);
        }
        Some(path)
    };

    dirs.extend(env_dir("ChocolateyInstall", &["bin"]));
    dirs.extend(env_dir("SCOOP", &["shims"]));
    dirs.extend(env_dir("USERPROFILE", &["scoop", "shims"]));
    dirs.extend(env_dir("LOCALAPPDATA", &["Microsoft", "WinGet", "Links"]));
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_like_commands_pass_through() {
        let locator = ToolchainLocator::with_path("");
        assert_eq!(
            locator.resolve("/opt/cc/bin/gcc"),
            vec![PathBuf::from("/opt/cc/bin/gcc")]
        );
        assert!(looks_like_path("C:gcc"));
        assert!(looks_like_path(r"tools\cl.exe"));
        assert!(!looks_like_path("clang++"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_finds_regular_files_only() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        std::fs::write(a.path().join("fakecc"), "").unwrap();
        std::fs::create_dir(b.path().join("fakecc")).unwrap();

        let path = std::env::join_paths([a.path(), b.path(), a.path()]).unwrap();
        let locator = ToolchainLocator::with_path(path);
        let found = locator.resolve("fakecc");
        assert_eq!(found, vec![a.path().join("fakecc")]);
        assert!(locator.resolve("missing-cc").is_empty());
    }

    #[test]
    fn test_search_dirs_memoized() {
        let locator = ToolchainLocator::with_path("");
        let first = locator.search_dirs().as_ptr();
        let second = locator.search_dirs().as_ptr();
        assert_eq!(first, second);
    }
}
