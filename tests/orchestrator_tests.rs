// End-to-end tests for request dispatch, driven through the library and the CLI

use crustrun::model::{Phase, RunRequest};
use crustrun::toolchain::ToolchainLocator;
use crustrun::{Engine, EngineConfig};
use std::fs;
use std::path::{Path, PathBuf};

fn write_source(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_missing_custom_c_compiler_lists_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "prog.c", "int main(void) { return 0; }\n");
    let request = RunRequest::new(&source, "custom").with_custom_command("/nonexistent/bin/fakecc");

    let result = Engine::default().run(&request);
    assert!(!result.success);
    assert_eq!(result.phase, Phase::Compile);
    assert_eq!(
        result.error.as_deref(),
        Some("Custom compiler command was not found: /nonexistent/bin/fakecc")
    );
    assert_eq!(result.tried, vec!["/nonexistent/bin/fakecc".to_string()]);
}

#[test]
fn test_missing_cpp_compiler_falls_back_to_inbuilt() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "prog.cpp",
        "#include <iostream>\nint main() { std::cout << \"fallback\" << std::endl; return 0; }\n",
    );
    let request = RunRequest::new(&source, "custom").with_custom_command("/nonexistent/bin/fakecxx");

    let result = Engine::default().run(&request);
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.compiler, "inbuilt-mini-cpp");
    assert_eq!(result.output, "fallback\n");
}

#[test]
fn test_empty_custom_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "prog.c", "int main(void) { return 0; }\n");
    let result = Engine::default().run(&RunRequest::new(&source, "custom").with_custom_command("  "));
    assert!(!result.success);
    assert_eq!(result.compiler_profile, "custom");
    assert!(result.error.unwrap().contains("no compiler command was provided"));
}

#[test]
fn test_unreadable_source() {
    let dir = tempfile::tempdir().unwrap();
    let result = Engine::default().run(&RunRequest::new(dir.path().join("absent.c"), "inbuilt"));
    assert!(!result.success);
    assert_eq!(result.phase, Phase::Compile);
    assert!(result.error.unwrap().starts_with("Failed to read"));
}

#[test]
fn test_request_limits_override_config() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "loop.c",
        "#include <stdio.h>\nint main(void) { for (;;) printf(\"x\"); return 0; }\n",
    );
    let engine = Engine::with_locator(EngineConfig::default(), ToolchainLocator::with_path(""));
    let result = engine.run(&RunRequest::new(&source, "inbuilt").with_max_output_bytes(10));
    assert!(result.output_truncated);
    assert_eq!(result.output, "xxxxxxxxxx");
}

#[cfg(unix)]
mod fake_toolchain {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;

    // Stands in for a GNU-style compiler. Markers in the source select the behavior.
    const FAKE_COMPILER: &str = r#"#!/bin/sh
out=""
src=""
extra=""
std=""
fslib=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    -std=*) std="${1#-std=}" ;;
    -lstdc++fs) fslib=1 ;;
    *.c|*.cpp)
      if [ -z "$src" ]; then src="$1"; else extra="$extra $1"; fi ;;
  esac
  shift
done
if grep -q OLDSTD "$src" && [ "$std" = "gnu++23" ]; then
  echo "cc1plus: error: unrecognized command-line option '-std=$std'" >&2
  exit 1
fi
if grep -q BROKEN "$src"; then
  echo "$src:2:5: error: expected ';' before '}' token" >&2
  exit 1
fi
if grep -q FSLINK "$src" && [ -z "$fslib" ]; then
  echo "/usr/bin/ld: prog.o: undefined reference to \`std::filesystem::status(std::filesystem::path const&)'" >&2
  exit 1
fi
if grep -q NEEDHELPER "$src" && [ -z "$extra" ]; then
  echo "/usr/bin/ld: prog.o: undefined reference to \`helper()'" >&2
  exit 1
fi
if grep -q SLEEP "$src"; then
  printf '#!/bin/sh\nexec sleep 10\n' > "$out"
elif grep -q EXIT4 "$src"; then
  printf '#!/bin/sh\necho partial\nexit 4\n' > "$out"
else
  printf '#!/bin/sh\necho "built from fake"\ncat\n' > "$out"
fi
chmod +x "$out"
"#;

    /// Written once so no test execs it while another thread still holds it open for writing.
    fn fake_compiler() -> &'static Path {
        static COMPILER: OnceLock<(tempfile::TempDir, PathBuf)> = OnceLock::new();
        let (_, path) = COMPILER.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("fakecc");
            fs::write(&path, FAKE_COMPILER).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            (dir, path)
        });
        path
    }

    fn run_fake(name: &str, text: &str, customize: impl FnOnce(RunRequest) -> RunRequest) -> crustrun::CompileRunResult {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), name, text);
        let request = RunRequest::new(&source, "custom").with_custom_command(fake_compiler().display().to_string());
        Engine::default().run(&customize(request))
    }

    #[test]
    fn test_c_compile_and_run() {
        let result = run_fake("prog.c", "int main(void) { return 0; }\n", |r| r.with_stdin("echoed\n"));
        assert!(result.success, "{result:?}");
        assert_eq!(result.phase, Phase::Run);
        assert_eq!(result.compiler, "custom");
        assert_eq!(result.output, "built from fake\nechoed\n");
        assert_eq!(result.exit_code, Some(0));
        assert!(result.compiler_command.contains(" -Wall "));
        assert!(result.compiler_command.ends_with(" -lm"));
    }

    #[test]
    fn test_extra_args_replace_defaults() {
        let result = run_fake("prog.c", "int main(void) { return 0; }\n", |r| r.with_extra_args("-O2 -lfoo"));
        assert!(result.success, "{result:?}");
        let command = result.compiler_command;
        assert!(command.contains(" -O2 "));
        assert!(!command.contains("-Wall"));
        let output_flag = command.find(" -o ").unwrap();
        assert!(command.find(" -lfoo").unwrap() > output_flag);
    }

    #[test]
    fn test_compile_failure_maps_diagnostics() {
        let result = run_fake("prog.c", "int main(void) {\n    BROKEN\n}\n", |r| r);
        assert!(!result.success);
        assert_eq!(result.phase, Phase::Compile);
        assert_eq!(result.error.as_deref(), Some("Compilation failed (exit code 1)"));
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!((result.diagnostics[0].line, result.diagnostics[0].col), (2, 5));
        assert!(result.compile_output.contains("expected ';'"));
    }

    #[test]
    fn test_nonzero_exit_is_run_failure() {
        let result = run_fake("prog.cpp", "// EXIT4\nint main() { return 4; }\n", |r| r);
        assert!(!result.success);
        assert_eq!(result.phase, Phase::Run);
        assert_eq!(result.exit_code, Some(4));
        assert_eq!(result.output, "partial\n");
        assert_eq!(result.error.as_deref(), Some("Program exited with code 4"));
    }

    #[test]
    fn test_run_timeout() {
        let result = run_fake("prog.c", "// SLEEP\nint main(void) { return 0; }\n", |r| r.with_timeout_ms(300));
        assert!(!result.success);
        assert!(result.timed_out);
        assert_eq!(result.error.as_deref(), Some("Program timed out after 300 ms"));
    }

    #[test]
    fn test_cpp_ladder_steps_down_on_rejected_standard() {
        let result = run_fake("prog.cpp", "// OLDSTD\nint main() { return 0; }\n", |r| r);
        assert!(result.success, "{result:?}");
        assert!(result.compiler_command.contains("-std=c++23"));
        assert!(result
            .compile_output
            .starts_with("Note: gnu++23 is not supported by this compiler; trying an older standard"));
    }

    #[test]
    fn test_user_std_skips_ladder() {
        let result = run_fake("prog.cpp", "int main() { return 0; }\n", |r| r.with_extra_args("-std=c++11"));
        assert!(result.success, "{result:?}");
        assert!(result.compiler_command.contains("-std=c++11"));
        assert!(!result.compiler_command.contains("gnu++23"));
    }

    #[test]
    fn test_filesystem_link_retry() {
        let result = run_fake("prog.cpp", "// FSLINK\nint main() { return 0; }\n", |r| r);
        assert!(result.success, "{result:?}");
        assert!(result.compiler_command.ends_with(" -lstdc++fs"));
        assert!(result
            .compile_output
            .starts_with("Note: detected missing std::filesystem symbols; retrying with -lstdc++fs"));
    }

    #[test]
    fn test_sibling_sources_retry() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "helper.cpp", "int helper() { return 1; }\n");
        write_source(dir.path(), "other_main.cpp", "int main() { return 2; }\n");
        let source = write_source(dir.path(), "prog.cpp", "// NEEDHELPER\nint helper();\nint main() { return helper() - 1; }\n");
        let request = RunRequest::new(&source, "custom").with_custom_command(fake_compiler().display().to_string());

        let result = Engine::default().run(&request);
        assert!(result.success, "{result:?}");
        assert!(result.compiler_command.contains("helper.cpp"));
        assert!(!result.compiler_command.contains("other_main.cpp"));
        assert!(result
            .compile_output
            .starts_with("Note: retrying with 1 additional source file(s) from the project: helper.cpp"));
    }

    #[test]
    fn test_cpp_compile_failure_is_not_retried_inbuilt() {
        let result = run_fake("prog.cpp", "int main() {\n    BROKEN\n}\n", |r| r);
        assert_eq!(result.phase, Phase::Compile);
        assert_eq!(result.compiler, "custom");
        assert_eq!(result.diagnostics[0].line, 2);
    }
}

mod cli {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;

    fn crustrun() -> Command {
        Command::cargo_bin("crustrun").unwrap()
    }

    #[test]
    fn test_run_inbuilt_plain() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(
            dir.path(),
            "hello.c",
            "#include <stdio.h>\nint main(void) { printf(\"hi %d\\n\", 6 * 7); return 0; }\n",
        );

        crustrun()
            .args(["run", "--profile", "inbuilt"])
            .arg(&source)
            .assert()
            .success()
            .stdout("hi 42\n")
            .stderr(predicate::str::contains("[ok via inbuilt-mini-c]"));
    }

    #[test]
    fn test_run_failure_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "div.c", "int main(void) {\n  int z = 0;\n  return 1 / z;\n}\n");

        crustrun()
            .args(["run", "-p", "inbuilt"])
            .arg(&source)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Division by zero at line 3"));
    }

    #[test]
    fn test_run_json_with_stdin_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(
            dir.path(),
            "echo.cpp",
            "#include <iostream>\n#include <string>\nusing namespace std;\nint main() { string w; cin >> w; cout << w << endl; return 0; }\n",
        );
        let input = write_source(dir.path(), "input.txt", "token rest\n");

        let output = crustrun()
            .args(["run", "--profile", "inbuilt", "--json", "--stdin-file"])
            .arg(&input)
            .arg(&source)
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["phase"], "run");
        assert_eq!(json["compiler"], "inbuilt-mini-cpp");
        assert_eq!(json["output"], "token\n");
    }

    #[test]
    fn test_request_document() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_source(dir.path(), "bad.c", "int main(void) {\n  struct point p;\n  return 0;\n}\n");
        let request = serde_json::json!({
            "sourcePath": source,
            "compilerProfile": "inbuilt",
        });
        let request_path = write_source(dir.path(), "request.json", &request.to_string());

        let output = crustrun().arg("request").arg(&request_path).output().unwrap();
        assert_eq!(output.status.code(), Some(1));
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["phase"], "compile");
        assert_eq!(json["diagnostics"][0]["line"], 2);
    }

    #[test]
    fn test_missing_source_file() {
        crustrun()
            .args(["run", "/nonexistent/dir/prog.c"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn test_locate_path_like_command() {
        crustrun()
            .args(["locate", "./bin/cc"])
            .assert()
            .success()
            .stdout("./bin/cc\n");
    }
}
