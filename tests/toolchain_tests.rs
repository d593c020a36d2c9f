use crustrun::model::Severity;
use crustrun::toolchain::profile::{split_args, strip_wrapping_quotes};
use crustrun::toolchain::{
    parse_diagnostics, parse_merged, resolve_profile, run_process, DiagnosticDialect, Family, Language,
    ResolvedProfile, RunOptions, ToolchainLocator,
};
use std::fs;
use std::time::{Duration, Instant};

#[test]
fn test_profile_aliases() {
    let gnu = resolve_profile(Language::Cpp, " G++ ", None).unwrap();
    match gnu {
        ResolvedProfile::Toolchain { name, candidates } => {
            assert_eq!(name, "g++");
            assert_eq!(candidates[0].command, "g++");
            assert_eq!(candidates[0].family, Family::Gnu);
        }
        other => panic!("expected toolchain, got {other:?}"),
    }

    let msvc = resolve_profile(Language::C, "cl", None).unwrap();
    assert_eq!(msvc.name(), "msvc");

    assert_eq!(resolve_profile(Language::C, "", None).unwrap(), ResolvedProfile::Inbuilt);
    assert_eq!(resolve_profile(Language::Cpp, "turbo-c", None).unwrap(), ResolvedProfile::Inbuilt);
}

#[test]
fn test_custom_profile() {
    let resolved = resolve_profile(Language::Cpp, "custom", Some("  '/opt/llvm/bin/clang-cl.exe' ")).unwrap();
    assert!(resolved.is_custom());
    let ResolvedProfile::Toolchain { candidates, .. } = resolved else {
        panic!("custom resolves to a toolchain");
    };
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].command, "/opt/llvm/bin/clang-cl.exe");
    assert!(candidates[0].is_msvc());

    let err = resolve_profile(Language::C, "custom", Some("\"\"")).unwrap_err();
    assert!(err.to_string().contains("no compiler command was provided"));
}

#[test]
fn test_argument_splitting() {
    assert_eq!(
        split_args(r#"-O2 -DNAME="hello world" '-I/a b' -lm"#),
        vec!["-O2", "-DNAME=hello world", "-I/a b", "-lm"]
    );
    assert_eq!(split_args(r#""a\"b" ''"#), vec!["a\"b", ""]);
    assert!(split_args("   ").is_empty());
    assert_eq!(strip_wrapping_quotes(" \"gcc-13\" "), "gcc-13");
    assert_eq!(strip_wrapping_quotes("'unbalanced"), "'unbalanced");
}

#[test]
fn test_diagnostics_from_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("main.c");
    fs::write(&source, "int main() {}\n").unwrap();

    let output = "\
main.c: In function 'main':
main.c:3:9: warning: unused variable 'x' [-Wunused-variable]
./main.c:1:1: error: expected ';' before 'int'
other.c:4:2: error: not ours
main.c:3:9: warning: unused variable 'x' [-Wunused-variable]
";
    let diags = parse_diagnostics(output, DiagnosticDialect::Gnu, &source, dir.path());
    assert_eq!(diags.len(), 2);
    assert_eq!((diags[0].line, diags[0].col, diags[0].severity), (1, 1, Severity::Error));
    assert_eq!(diags[1].code, "-Wunused-variable");
    assert_eq!(diags[1].message, "unused variable 'x'");
}

#[test]
fn test_merged_dialects() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("prog.cpp");
    fs::write(&source, "").unwrap();

    let output = format!(
        "{0}(7,3): error C2065: 'y': undeclared identifier\r\n{0}:2:1: error: 'z' was not declared\n",
        source.display()
    );
    let diags = parse_merged(&output, &source, dir.path());
    assert_eq!(diags.len(), 2);
    assert_eq!(diags[0].line, 2);
    assert_eq!(diags[1].line, 7);
    assert_eq!(diags[1].code, "C2065");
}

#[test]
fn test_locator_scans_given_path_only() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::write(first.path().join("tcc"), "").unwrap();
    fs::write(second.path().join("tcc"), "").unwrap();
    fs::create_dir(second.path().join("gcc")).unwrap();

    let path = std::env::join_paths([first.path(), second.path(), first.path()]).unwrap();
    let locator = ToolchainLocator::with_path(path);
    assert_eq!(locator.search_dirs().len(), 2);
    assert_eq!(
        locator.resolve("tcc"),
        vec![first.path().join("tcc"), second.path().join("tcc")]
    );
    assert!(locator.resolve("gcc").is_empty());
    assert_eq!(locator.resolve("./tools/cc").len(), 1);
}

#[cfg(unix)]
mod unix {
    use super::*;

    fn sh(script: &str, opts: &RunOptions<'_>) -> crustrun::toolchain::ProcessResult {
        run_process("sh", &["-c", script], opts)
    }

    #[test]
    fn test_exit_code_and_streams() {
        let result = sh("echo out; echo err >&2; exit 3", &RunOptions::new(Duration::from_secs(5), 1024));
        assert!(!result.ok);
        assert_eq!(result.code, Some(3));
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.combined_output(), "out\nerr\n");
    }

    #[test]
    fn test_stdin_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let opts = RunOptions::new(Duration::from_secs(5), 1024)
            .cwd(dir.path())
            .stdin(Some("piped input"));
        let result = sh("cat; echo; cat marker.txt", &opts);
        assert!(result.ok, "{result:?}");
        assert_eq!(result.stdout, "piped input\nhere");
    }

    #[test]
    fn test_timeout_kills_child() {
        let start = Instant::now();
        let result = sh("exec sleep 10", &RunOptions::new(Duration::from_millis(200), 1024));
        assert!(result.timed_out);
        assert!(!result.ok);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_output_cap_stops_flood() {
        let result = sh("yes", &RunOptions::new(Duration::from_secs(10), 100));
        assert!(result.output_truncated);
        assert!(!result.ok);
        assert_eq!(result.stdout.len(), 100);
    }
}
