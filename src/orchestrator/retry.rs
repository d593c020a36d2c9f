//! Failure classification and repair hypotheses for C++ builds
//!
//! [`classify`] inspects combined compiler output for linker failures,
//! missing headers, and well-known missing-symbol families. [`build_variants`]
//! turns a classification into an ordered list of [`RetryVariant`]s, each of
//! which is tried as one more compile attempt.

use crate::config::ScanLimits;
use crate::orchestrator::build::{include_arg, UserArgs};
use crate::orchestrator::project;
use crate::toolchain::Family;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Library families whose missing symbols imply a specific extra flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFamily {
    Filesystem,
    Pthread,
    Winsock,
    OpenMp,
    Math,
}

impl SymbolFamily {
    fn flag(self, family: Family) -> Option<&'static str> {
        match (self, family) {
            (SymbolFamily::Filesystem, Family::Gnu) => Some("-lstdc++fs"),
            (SymbolFamily::Pthread, Family::Gnu) => Some("-pthread"),
            (SymbolFamily::Winsock, Family::Gnu) => Some("-lws2_32"),
            (SymbolFamily::Winsock, Family::Msvc) => Some("ws2_32.lib"),
            (SymbolFamily::OpenMp, Family::Gnu) => Some("-fopenmp"),
            (SymbolFamily::OpenMp, Family::Msvc) => Some("/openmp"),
            (SymbolFamily::Math, Family::Gnu) => Some("-lm"),
            _ => None,
        }
    }

    /// Flags that already satisfy this family when present in user args.
    fn equivalents(self) -> &'static [&'static str] {
        match self {
            SymbolFamily::Filesystem => &["-lstdc++fs", "-lc++fs", "-lc++experimental"],
            SymbolFamily::Pthread => &["-pthread", "-lpthread", "-pthreads"],
            SymbolFamily::Winsock => &["-lws2_32", "ws2_32.lib", "-lwsock32", "wsock32.lib"],
            SymbolFamily::OpenMp => &["-fopenmp", "/openmp", "-openmp", "-fopenmp=libomp", "-lgomp"],
            SymbolFamily::Math => &["-lm"],
        }
    }

    fn describe(self) -> &'static str {
        match self {
            SymbolFamily::Filesystem => "std::filesystem",
            SymbolFamily::Pthread => "pthread",
            SymbolFamily::Winsock => "Winsock",
            SymbolFamily::OpenMp => "OpenMP",
            SymbolFamily::Math => "math library",
        }
    }
}

/// What went wrong in a failed compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub linker_failure: bool,
    pub missing_headers: Vec<String>,
    pub families: Vec<SymbolFamily>,
}

impl Classification {
    pub fn is_actionable(&self) -> bool {
        self.linker_failure || !self.missing_headers.is_empty() || !self.families.is_empty()
    }
}

/// One hypothesis for repairing a failed build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryVariant {
    pub extra_sources: Vec<PathBuf>,
    pub include_extra_args: Vec<String>,
    pub link_extra_args: Vec<String>,
    pub notes: Vec<String>,
}

fn pattern(cell: &'static OnceLock<Regex>, source: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(source).expect("Invalid regex pattern"))
}

fn linker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(
        &RE,
        r"undefined reference|unresolved external symbol|LNK\d{4}|\bld: |ld returned|Undefined symbols|collect2",
    )
}

fn missing_header_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    pattern(&RE, r"No such file or directory|C1083|file not found")
}

fn header_name_patterns() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"fatal error: ([^\s:'\x22]+): No such file or directory")
                .expect("Invalid regex pattern"),
            Regex::new(r"'([^']+)' file not found").expect("Invalid regex pattern"),
            Regex::new(r"C1083: Cannot open include file: '([^']+)'")
                .expect("Invalid regex pattern"),
        ]
    })
}

fn family_patterns() -> &'static [(SymbolFamily, Regex)] {
    static RE: OnceLock<Vec<(SymbolFamily, Regex)>> = OnceLock::new();
    RE.get_or_init(|| {
        let table = [
            (
                SymbolFamily::Filesystem,
                r"std::(?:__fs::|experimental::|__cxx11::)?filesystem|__fs::filesystem|fs::path",
            ),
            (SymbolFamily::Pthread, r"\bpthread_[a-z_]+"),
            (
                SymbolFamily::Winsock,
                r"WSAStartup|WSACleanup|WSAGetLastError|__imp_WSA|__imp_socket|__imp_connect|__imp_send|__imp_recv|closesocket|ioctlsocket",
            ),
            (SymbolFamily::OpenMp, r"\bomp_[a-z_]+|\bGOMP_[a-z_]+|__kmpc_"),
            (
                SymbolFamily::Math,
                r"undefined reference to .(?:sqrt|pow|sin|cos|tan|atan2?|exp|log10|log2|log|floor|ceil|fmod|round|hypot)\b",
            ),
        ];
        table
            .into_iter()
            .map(|(family, src)| (family, Regex::new(src).expect("Invalid regex pattern")))
            .collect()
    })
}

/// Classify combined compiler output.
pub fn classify(output: &str) -> Classification {
    let linker_failure = linker_pattern().is_match(output);

    let mut missing_headers = Vec::new();
    if missing_header_pattern().is_match(output) {
        for re in header_name_patterns() {
            for caps in re.captures_iter(output) {
                let name = caps[1].trim().to_string();
                if !name.is_empty() && !missing_headers.contains(&name) {
                    missing_headers.push(name);
                }
            }
        }
    }

    let families = if linker_failure {
        family_patterns()
            .iter()
            .filter(|(_, re)| re.is_match(output))
            .map(|(family, _)| *family)
            .collect()
    } else {
        Vec::new()
    };

    Classification {
        linker_failure,
        missing_headers,
        families,
    }
}

/// Inputs needed to turn a classification into variants.
pub struct RetryContext<'a> {
    pub source: &'a Path,
    pub family: Family,
    pub user_args: &'a UserArgs,
    pub scan: &'a ScanLimits,
}

/// Ordered repair hypotheses: flags, then sources, then include dirs (plus
/// sources), then everything combined. Duplicates are dropped.
pub fn build_variants(class: &Classification, ctx: &RetryContext<'_>) -> Vec<RetryVariant> {
    if !class.is_actionable() {
        return Vec::new();
    }

    let flags = flag_variant(class, ctx);

    let sources = if class.linker_failure {
        let found = project::find_sibling_sources(ctx.source, ctx.scan);
        (!found.is_empty()).then(|| RetryVariant {
            notes: vec![format!(
                "Note: retrying with {} additional source file(s) from the project: {}",
                found.len(),
                found
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )],
            extra_sources: found,
            ..RetryVariant::default()
        })
    } else {
        None
    };

    let includes = if class.missing_headers.is_empty() {
        None
    } else {
        let dirs = project::find_include_dirs(ctx.source, &class.missing_headers, ctx.scan);
        (!dirs.is_empty()).then(|| {
            let mut variant = RetryVariant {
                include_extra_args: dirs.iter().map(|d| include_arg(ctx.family, d)).collect(),
                notes: vec![format!(
                    "Note: retrying with include directories: {}",
                    dirs.iter()
                        .map(|d| d.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )],
                ..RetryVariant::default()
            };
            let extra = project::find_sibling_sources(ctx.source, ctx.scan);
            if !extra.is_empty() {
                variant.notes.push(format!(
                    "Note: also compiling {} additional source file(s)",
                    extra.len()
                ));
                variant.extra_sources = extra;
            }
            variant
        })
    };

    let mut variants: Vec<RetryVariant> = Vec::new();
    let parts: Vec<RetryVariant> = [flags, sources, includes].into_iter().flatten().collect();
    if parts.len() > 1 {
        let combined = parts.iter().fold(RetryVariant::default(), |mut acc, v| {
            merge(&mut acc, v);
            acc
        });
        variants.extend(parts);
        variants.push(combined);
    } else {
        variants.extend(parts);
    }

    let mut unique: Vec<RetryVariant> = Vec::new();
    for variant in variants {
        let duplicate = unique.iter().any(|u| {
            u.extra_sources == variant.extra_sources
                && u.include_extra_args == variant.include_extra_args
                && u.link_extra_args == variant.link_extra_args
        });
        if !duplicate {
            unique.push(variant);
        }
    }
    unique
}

fn flag_variant(class: &Classification, ctx: &RetryContext<'_>) -> Option<RetryVariant> {
    let mut variant = RetryVariant::default();
    for family in &class.families {
        if ctx.user_args.contains_any(family.equivalents()) {
            continue;
        }
        let Some(flag) = family.flag(ctx.family) else {
            continue;
        };
        if variant.link_extra_args.iter().any(|f| f == flag) {
            continue;
        }
        variant.link_extra_args.push(flag.to_string());
        variant.notes.push(format!(
            "Note: detected missing {} symbols; retrying with {flag}",
            family.describe()
        ));
    }
    (!variant.link_extra_args.is_empty()).then_some(variant)
}

fn merge(into: &mut RetryVariant, from: &RetryVariant) {
    for src in &from.extra_sources {
        if !into.extra_sources.contains(src) {
            into.extra_sources.push(src.clone());
        }
    }
    for arg in &from.include_extra_args {
        if !into.include_extra_args.contains(arg) {
            into.include_extra_args.push(arg.clone());
        }
    }
    for arg in &from.link_extra_args {
        if !into.link_extra_args.contains(arg) {
            into.link_extra_args.push(arg.clone());
        }
    }
    into.notes.extend(from.notes.iter().cloned());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_filesystem_link_failure() {
        let out = "/usr/bin/ld: /tmp/cc.o: in function `main':\n\
                   main.cpp:(.text+0x1f): undefined reference to `std::filesystem::current_path[abi:cxx11]()'\n\
                   collect2: error: ld returned 1 exit status\n";
        let class = classify(out);
        assert!(class.linker_failure);
        assert_eq!(class.families, vec![SymbolFamily::Filesystem]);
        assert!(class.missing_headers.is_empty());
    }

    #[test]
    fn test_classify_missing_headers() {
        let out = "main.cpp:2:10: fatal error: util/strings.h: No such file or directory\n\
                   other.cpp:1:10: fatal error: 'cfg.hpp' file not found\n\
                   main.cpp(3): fatal error C1083: Cannot open include file: 'win.h': No such file or directory\n";
        let class = classify(out);
        assert_eq!(class.missing_headers, vec!["util/strings.h", "cfg.hpp", "win.h"]);
        assert!(!class.linker_failure);
    }

    #[test]
    fn test_flag_variant_skips_user_equivalent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("main.cpp");
        std::fs::write(&source, "int main(){}").unwrap();
        let class = Classification {
            linker_failure: true,
            missing_headers: Vec::new(),
            families: vec![SymbolFamily::Pthread, SymbolFamily::OpenMp],
        };
        let user = UserArgs::parse(Some("-lpthread"));
        let scan = ScanLimits::default();
        let ctx = RetryContext {
            source: &source,
            family: Family::Gnu,
            user_args: &user,
            scan: &scan,
        };
        let variants = build_variants(&class, &ctx);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].link_extra_args, vec!["-fopenmp"]);
        assert!(variants[0].notes[0].contains("OpenMP"));
    }

    #[test]
    fn test_unclassified_output_yields_no_variants() {
        let class = classify("main.cpp:3:5: error: expected ';' before 'return'");
        assert!(!class.is_actionable());
    }
}
