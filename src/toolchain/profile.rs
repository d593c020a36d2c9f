//! Compiler profile resolution
//!
//! Turns the user's raw profile string (plus optional custom command) into
//! either the inbuilt engine or a priority-ordered list of
//! [`CompilerCandidate`]s. Everything here is a pure function of its input.

use std::fmt;
use thiserror::Error;

/// Source language of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    C,
    Cpp,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => write!(f, "C"),
            Language::Cpp => write!(f, "C++"),
        }
    }
}

/// Flag-syntax dialect of a compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// `-I dir`, `-o out`, `-std=`
    Gnu,
    /// `/I dir`, `/Fe out`, `/std:`
    Msvc,
}

/// One way to invoke a compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCandidate {
    pub id: String,
    pub command: String,
    pub label: String,
    pub default_flags: Vec<String>,
    pub family: Family,
}

impl CompilerCandidate {
    fn new(id: &str, command: &str, label: &str, flags: &[&str], family: Family) -> Self {
        CompilerCandidate {
            id: id.to_string(),
            command: command.to_string(),
            label: label.to_string(),
            default_flags: flags.iter().map(|s| s.to_string()).collect(),
            family,
        }
    }

    pub fn is_msvc(&self) -> bool {
        self.family == Family::Msvc
    }
}

/// Outcome of profile resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedProfile {
    Inbuilt,
    Toolchain {
        /// Normalized profile name echoed back in results.
        name: String,
        candidates: Vec<CompilerCandidate>,
    },
}

impl ResolvedProfile {
    pub fn name(&self) -> &str {
        match self {
            ResolvedProfile::Inbuilt => "inbuilt",
            ResolvedProfile::Toolchain { name, .. } => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.name() == "custom"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("Custom compiler profile selected but no compiler command was provided")]
    EmptyCustomCommand,
}

const C_FLAGS: &[&str] = &["-std=c11", "-Wall", "-Wextra"];
const TCC_FLAGS: &[&str] = &["-Wall"];
const C_MSVC_FLAGS: &[&str] = &["/nologo", "/W3"];
const CPP_FLAGS: &[&str] = &["-Wall", "-Wextra"];
const CPP_MSVC_FLAGS: &[&str] = &["/nologo", "/EHsc", "/W3"];

/// Resolve a raw profile selection for `language`.
///
/// Unknown or empty profiles resolve to the inbuilt engine. `custom`
/// requires a non-empty `custom_command`; wrapping quotes are stripped.
pub fn resolve_profile(
    language: Language,
    raw: &str,
    custom_command: Option<&str>,
) -> Result<ResolvedProfile, ProfileError> {
    let profile = raw.trim().to_ascii_lowercase();

    if profile == "custom" {
        let command = custom_command.map(strip_wrapping_quotes).unwrap_or_default();
        if command.is_empty() {
            return Err(ProfileError::EmptyCustomCommand);
        }
        let family = infer_family(&command);
        let flags = match (language, family) {
            (Language::C, Family::Gnu) if command_stem(&command) == "tcc" => TCC_FLAGS,
            (Language::C, Family::Gnu) => C_FLAGS,
            (Language::C, Family::Msvc) => C_MSVC_FLAGS,
            (Language::Cpp, Family::Gnu) => CPP_FLAGS,
            (Language::Cpp, Family::Msvc) => CPP_MSVC_FLAGS,
        };
        let candidate = CompilerCandidate::new("custom", &command, &command, flags, family);
        return Ok(ResolvedProfile::Toolchain {
            name: "custom".to_string(),
            candidates: vec![candidate],
        });
    }

    let candidates = match language {
        Language::C => c_candidates(&profile),
        Language::Cpp => cpp_candidates(&profile),
    };

    Ok(match candidates {
        Some((name, candidates)) => ResolvedProfile::Toolchain {
            name: name.to_string(),
            candidates,
        },
        None => ResolvedProfile::Inbuilt,
    })
}

fn c_candidates(profile: &str) -> Option<(&'static str, Vec<CompilerCandidate>)> {
    let gcc = || CompilerCandidate::new("gcc", "gcc", "GCC", C_FLAGS, Family::Gnu);
    let clang = || CompilerCandidate::new("clang", "clang", "Clang", C_FLAGS, Family::Gnu);
    let cc = || CompilerCandidate::new("cc", "cc", "System cc", C_FLAGS, Family::Gnu);
    let tcc = || CompilerCandidate::new("tcc", "tcc", "Tiny C Compiler", TCC_FLAGS, Family::Gnu);
    let msvc = || CompilerCandidate::new("msvc", "cl", "MSVC", C_MSVC_FLAGS, Family::Msvc);

    match profile {
        "auto" => {
            let mut list = vec![gcc(), clang(), cc(), tcc()];
            if cfg!(windows) {
                list.push(msvc());
            }
            Some(("auto", list))
        }
        "gcc" => Some(("gcc", vec![gcc()])),
        "clang" => Some(("clang", vec![clang()])),
        "cc" => Some(("cc", vec![cc()])),
        "tcc" => Some(("tcc", vec![tcc()])),
        "msvc" | "cl" => Some(("msvc", vec![msvc()])),
        _ => None,
    }
}

fn cpp_candidates(profile: &str) -> Option<(&'static str, Vec<CompilerCandidate>)> {
    let clangxx = || CompilerCandidate::new("clang++", "clang++", "Clang++", CPP_FLAGS, Family::Gnu);
    let gxx = || CompilerCandidate::new("g++", "g++", "G++", CPP_FLAGS, Family::Gnu);
    let cxx = || CompilerCandidate::new("c++", "c++", "System c++", CPP_FLAGS, Family::Gnu);
    let clang_cl = || {
        CompilerCandidate::new("clang-cl", "clang-cl", "clang-cl", CPP_MSVC_FLAGS, Family::Msvc)
    };
    let msvc = || CompilerCandidate::new("msvc", "cl", "MSVC", CPP_MSVC_FLAGS, Family::Msvc);

    match profile {
        "auto" => Some(("auto", vec![clangxx(), gxx(), cxx(), clang_cl(), msvc()])),
        "g++" | "gpp" | "gcc" => Some(("g++", vec![gxx()])),
        "clang++" | "clang" => Some(("clang++", vec![clangxx()])),
        "c++" | "cxx" => Some(("c++", vec![cxx()])),
        "clang-cl" => Some(("clang-cl", vec![clang_cl()])),
        "msvc" | "cl" => Some(("msvc", vec![msvc()])),
        _ => None,
    }
}

/// Trim whitespace and one layer of matching quotes.
pub fn strip_wrapping_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

/// MSVC-style commands are `cl` and `clang-cl`, with or without a path or `.exe`.
/// Lowercase file name of `command` without a trailing `.exe`.
fn command_stem(command: &str) -> String {
    let base = command
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(command)
        .to_ascii_lowercase();
    match base.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => base,
    }
}

fn infer_family(command: &str) -> Family {
    let stem = command_stem(command);
    if stem == "cl" || stem == "clang-cl" {
        Family::Msvc
    } else {
        Family::Gnu
    }
}

/// Split a user-supplied argument string into an argv vector.
///
/// Whitespace separates arguments; single quotes are literal, double quotes
/// allow backslash-escaped `"` and `\`. No shell expansion is performed.
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_arg = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' => {
                in_arg = true;
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    current.push(c);
                }
            }
            '"' => {
                in_arg = true;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => break,
                        '\\' if matches!(chars.peek(), Some('"') | Some('\\')) => {
                            if let Some(escaped) = chars.next() {
                                current.push(escaped);
                            }
                        }
                        _ => current.push(c),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_arg {
                    args.push(std::mem::take(&mut current));
                    in_arg = false;
                }
            }
            c => {
                in_arg = true;
                current.push(c);
            }
        }
    }

    if in_arg {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_profile_is_inbuilt() {
        assert_eq!(resolve_profile(Language::C, "", None), Ok(ResolvedProfile::Inbuilt));
        assert_eq!(
            resolve_profile(Language::Cpp, "turbo-c", None),
            Ok(ResolvedProfile::Inbuilt)
        );
    }

    #[test]
    fn test_custom_requires_command() {
        assert_eq!(
            resolve_profile(Language::C, "custom", Some("  \"\" ")),
            Err(ProfileError::EmptyCustomCommand)
        );
    }

    #[test]
    fn test_custom_strips_quotes_and_infers_family() {
        let resolved =
            resolve_profile(Language::Cpp, "Custom", Some("\"C:\\VS\\bin\\cl.exe\"")).unwrap();
        match resolved {
            ResolvedProfile::Toolchain { name, candidates } => {
                assert_eq!(name, "custom");
                assert_eq!(candidates[0].command, "C:\\VS\\bin\\cl.exe");
                assert_eq!(candidates[0].family, Family::Msvc);
            }
            _ => panic!("Expected toolchain profile"),
        }
    }

    #[test]
    fn test_cpp_auto_order() {
        let resolved = resolve_profile(Language::Cpp, "auto", None).unwrap();
        let ResolvedProfile::Toolchain { candidates, .. } = resolved else {
            panic!("Expected toolchain profile");
        };
        let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["clang++", "g++", "c++", "clang-cl", "msvc"]);
    }

    #[test]
    fn test_tcc_uses_minimal_flags() {
        let ResolvedProfile::Toolchain { candidates, .. } =
            resolve_profile(Language::C, "tcc", None).unwrap()
        else {
            panic!("Expected toolchain profile");
        };
        assert_eq!(candidates[0].default_flags, vec!["-Wall"]);
    }

    #[test]
    fn test_custom_c_flags_follow_command() {
        let flags = |command: &str| {
            let ResolvedProfile::Toolchain { candidates, .. } =
                resolve_profile(Language::C, "custom", Some(command)).unwrap()
            else {
                panic!("Expected toolchain profile");
            };
            candidates[0].default_flags.clone()
        };
        assert_eq!(flags("/usr/bin/gcc-13"), vec!["-std=c11", "-Wall", "-Wextra"]);
        assert_eq!(flags("clang"), vec!["-std=c11", "-Wall", "-Wextra"]);
        assert_eq!(flags("C:\\tools\\TCC.EXE"), vec!["-Wall"]);
        assert_eq!(flags("cl"), C_MSVC_FLAGS.to_vec());
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args(r#"-O2  -DNAME="a b" 'x y' -I"dir\"q""#),
            vec!["-O2", "-DNAME=a b", "x y", "-Idir\"q"]
        );
        assert!(split_args("   ").is_empty());
    }
}
