//! Bounded project-tree scans
//!
//! Used by C++ retry variants to find extra translation units (files that do
//! not define `main`) and include directories holding headers the compiler
//! could not find. Every walk is limited by [`ScanLimits`].

use crate::config::ScanLimits;
use log::debug;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::{DirEntry, WalkDir};

const CPP_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx", "c++"];

const ROOT_MARKERS: &[&str] = &[
    "CMakeLists.txt",
    ".git",
    "meson.build",
    "Makefile",
    "compile_commands.json",
    "configure.ac",
    "premake5.lua",
    "xmake.lua",
    "BUILD.bazel",
    "WORKSPACE",
];

const SKIPPED_DIRS: &[&str] = &[".git", "build", "out", "target", "node_modules", ".vs", ".vscode", ".idea"];

fn main_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(?:(?:static|inline|extern)\s+)*(?:int|auto|void|signed\s+int)\s+main\s*\(")
            .expect("Invalid regex pattern")
    })
}

fn is_cpp_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| CPP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// True if the file defines `main`, or cannot be read.
pub fn defines_main(path: &Path) -> bool {
    match std::fs::read_to_string(path) {
        Ok(text) => main_pattern().is_match(&text),
        Err(_) => true,
    }
}

/// Nearest ancestor of `start` (inclusive) holding a project marker.
pub fn find_project_root(start: &Path, limits: &ScanLimits) -> Option<PathBuf> {
    let mut current = Some(start);
    for _ in 0..=limits.max_walk_up {
        let dir = current?;
        if ROOT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|n| SKIPPED_DIRS.contains(&n) || n.starts_with("cmake-build-") || n.starts_with('.'))
            .unwrap_or(false)
}

/// Extra translation units for `source`: siblings first, then (if there are
/// none) a bounded walk below the project root.
pub fn find_sibling_sources(source: &Path, limits: &ScanLimits) -> Vec<PathBuf> {
    let Some(dir) = source.parent() else {
        return Vec::new();
    };

    let mut found: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_cpp_source(p) && !same_file(p, source))
                .take(limits.max_files_scanned)
                .collect()
        })
        .unwrap_or_default();
    found.sort();
    found.retain(|p| !defines_main(p));

    if found.is_empty() {
        if let Some(root) = find_project_root(dir, limits) {
            debug!("scanning project root {} for sources", root.display());
            found = WalkDir::new(&root)
                .max_depth(limits.max_source_depth)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| !is_skipped(e))
                .take(limits.max_files_scanned)
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_cpp_source(p) && !same_file(p, source))
                .filter(|p| !defines_main(p))
                .collect();
        }
    }

    found.truncate(limits.max_extra_sources);
    found
}

/// Directories under the project root (or the source's directory) that
/// contain any of `headers`, given as they appeared in `#include`.
pub fn find_include_dirs(source: &Path, headers: &[String], limits: &ScanLimits) -> Vec<PathBuf> {
    let Some(dir) = source.parent() else {
        return Vec::new();
    };
    let root = find_project_root(dir, limits).unwrap_or_else(|| dir.to_path_buf());
    debug!("searching {} for headers {:?}", root.display(), headers);

    let wanted: Vec<Vec<String>> = headers
        .iter()
        .map(|h| {
            h.split(['/', '\\'])
                .filter(|c| !c.is_empty() && *c != ".")
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|parts| !parts.is_empty())
        .collect();

    let mut dirs_seen = 0usize;
    let mut result: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(&root)
        .max_depth(limits.max_include_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .take(limits.max_files_scanned)
        .filter_map(Result::ok)
    {
        if entry.file_type().is_dir() {
            dirs_seen += 1;
            if dirs_seen > limits.max_dirs {
                break;
            }
            continue;
        }
        for parts in &wanted {
            if let Some(include_dir) = include_dir_for(entry.path(), parts) {
                if !result.contains(&include_dir) {
                    result.push(include_dir);
                }
            }
        }
    }
    result
}

/// If `path` ends with the components in `parts`, the directory above them.
fn include_dir_for(path: &Path, parts: &[String]) -> Option<PathBuf> {
    let mut current = path;
    for part in parts.iter().rev() {
        let name = current.file_name()?.to_str()?;
        if name != part {
            return None;
        }
        current = current.parent()?;
    }
    Some(current.to_path_buf())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_siblings_without_main() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.cpp");
        fs::write(&main, "int main() { return helper(); }").unwrap();
        fs::write(dir.path().join("helper.cpp"), "int helper() { return 0; }").unwrap();
        fs::write(dir.path().join("other_main.cc"), "int main(void) {}").unwrap();
        fs::write(dir.path().join("notes.txt"), "int helper2();").unwrap();

        let found = find_sibling_sources(&main, &ScanLimits::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("helper.cpp"));
    }

    #[test]
    fn test_include_dir_for_nested_header() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("CMakeLists.txt"), "").unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("third_party/lib/util")).unwrap();
        fs::write(dir.path().join("third_party/lib/util/strings.h"), "").unwrap();
        let main = dir.path().join("src/main.cpp");
        fs::write(&main, "#include \"util/strings.h\"\nint main(){}").unwrap();

        let dirs = find_include_dirs(&main, &["util/strings.h".to_string()], &ScanLimits::default());
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].ends_with("third_party/lib"));
    }

    #[test]
    fn test_project_root_walk_up_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("meson.build"), "").unwrap();
        let deep = dir.path().join("a/b/c");
        fs::create_dir_all(&deep).unwrap();
        let limits = ScanLimits {
            max_walk_up: 1,
            ..ScanLimits::default()
        };
        assert_eq!(find_project_root(&deep, &limits), None);
        assert_eq!(
            find_project_root(&deep, &ScanLimits::default()),
            Some(dir.path().to_path_buf())
        );
    }
}
