// Integration tests for the inbuilt Mini-C++ engine

use crustrun::inbuilt::{run_inbuilt, run_isolated, Dialect, InbuiltJob};
use crustrun::model::{CompileRunResult, ExecutionLimits, Phase, RunRequest};
use crustrun::{Engine, EngineConfig};
use std::fs;
use std::time::Duration;

fn run_cpp_request(source: &str, request: impl FnOnce(RunRequest) -> RunRequest) -> CompileRunResult {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prog.cpp");
    fs::write(&path, source).unwrap();
    Engine::new(EngineConfig::default()).run(&request(RunRequest::new(&path, "inbuilt")))
}

fn run_cpp(source: &str) -> CompileRunResult {
    run_cpp_request(source, |r| r)
}

fn run_cpp_with_stdin(source: &str, stdin: &str) -> CompileRunResult {
    run_cpp_request(source, |r| r.with_stdin(stdin))
}

#[test]
fn test_cout_chain() {
    let result = run_cpp(
        r#"
        #include <iostream>
        using namespace std;

        int main() {
            int n = 42;
            double half = 2.5;
            char c = 'z';
            bool flag = true;
            cout << "n=" << n << " half=" << half << " c=" << c << " flag=" << flag << endl;
            std::cout << (n > 40 ? "big" : "small") << "\n";
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "n=42 half=2.5 c=z flag=1\nbig\n");
    assert_eq!(result.compiler, "inbuilt-mini-cpp");
    assert_eq!(result.compiler_profile, "inbuilt");
}

#[test]
fn test_manipulators() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <iomanip>
        using namespace std;

        int main() {
            double pi = 3.14159265;
            cout << pi << endl;
            cout << fixed << setprecision(2) << pi << endl;
            cout << setw(6) << 42 << "|" << endl;
            cerr << "to stderr" << endl;
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "3.14159\n3.14\n    42|\nto stderr\n");
}

#[test]
fn test_cin_with_type_hints() {
    let result = run_cpp_with_stdin(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;

        int main() {
            int count;
            double scale;
            string word;
            cin >> count >> scale >> word;
            cout << count * 2 << " " << scale * 2 << " " << word << endl;
            return 0;
        }
    "#,
        "21 1.25\nhello world\n",
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "42 2.5 hello\n");
}

#[test]
fn test_cin_loop_until_eof() {
    let result = run_cpp_with_stdin(
        r#"
        #include <iostream>
        using namespace std;

        int main() {
            int x, sum = 0, count = 0;
            while (cin >> x) {
                sum += x;
                count++;
            }
            cout << count << " " << sum << endl;
            return 0;
        }
    "#,
        "1 2 3\n4 5\n",
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "5 15\n");
}

#[test]
fn test_getline() {
    let result = run_cpp_with_stdin(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;

        int main() {
            int n;
            cin >> n;
            cin.ignore();
            string line;
            for (int i = 0; i < n; i++) {
                getline(cin, line);
                cout << i << ":" << line << ":" << line.size() << endl;
            }
            return 0;
        }
    "#,
        "2\nfirst line\nsecond\n",
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "0:first line:10\n1:second:6\n");
}

#[test]
fn test_string_operations() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;

        int main() {
            string s = "Hello";
            s += ", ";
            s = s + "World";
            cout << s << " " << s.length() << endl;
            cout << s.substr(7, 5) << " " << s.find("World") << " " << s[0] << endl;
            s.push_back('!');
            cout << s << " " << s.empty() << endl;
            string reversed = "";
            for (int i = s.size() - 1; i >= 0; i--) reversed += s[i];
            cout << reversed << endl;
            cout << (string("abc") < string("abd")) << " " << (s == "Hello, World!") << endl;
            if (s.find("xyz") == string::npos) cout << "npos" << endl;
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(
        result.output,
        "Hello, World 12\nWorld 7 H\nHello, World! 0\n!dlroW ,olleH\n1 1\nnpos\n"
    );
}

#[test]
fn test_conversions() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;

        int main() {
            string digits = to_string(123) + to_string(4);
            int value = stoi(digits);
            double d = stod("2.5");
            cout << digits << " " << value + 1 << " " << d * 2 << endl;
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "1234 1235 5\n");
}

#[test]
fn test_reference_parameters_and_std_helpers() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <algorithm>
        using namespace std;

        void bump(int &value, int by) { value += by; }

        int main() {
            int a = 3, b = 9;
            bump(a, 4);
            std::swap(a, b);
            auto biggest = max(a, b);
            cout << a << " " << b << " " << biggest << " " << min(a, b) << " " << abs(-5) << endl;
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "9 7 9 7 5\n");
}

#[test]
fn test_range_for_over_string() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;

        int main() {
            string s = "a1b2c3";
            int digits = 0;
            for (char c : s) {
                if (isdigit(c)) digits++;
            }
            cout << digits << endl;
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "3\n");
}

#[test]
fn test_rejected_constructs() {
    let result = run_cpp("#include <iostream>\nclass Box {\n  int v;\n};\nint main() { return 0; }\n");
    assert_eq!(result.phase, Phase::Compile);
    assert_eq!(result.diagnostics[0].line, 2);
    let error = result.error.unwrap();
    assert!(error.contains("extended subset of C++, not full C++"), "{error}");

    let result = run_cpp("int main() {\n  int *p = new int;\n  return 0;\n}\n");
    assert_eq!(result.phase, Phase::Compile);
    assert_eq!(result.diagnostics[0].line, 2);

    let result = run_cpp("int main() {\n  try { return 1; } catch (...) {}\n}\n");
    assert_eq!(result.phase, Phase::Compile);
}

#[test]
fn test_runtime_error_keeps_partial_output() {
    let result = run_cpp(
        r#"
        #include <iostream>
        #include <string>
        using namespace std;
        int main() {
            cout << "ready" << endl;
            int value = stoi("not a number");
            cout << value << endl;
            return 0;
        }
    "#,
    );

    assert_eq!(result.phase, Phase::Run);
    assert!(!result.success);
    assert_eq!(result.output, "ready\n");
    assert!(result.error.unwrap().contains("invalid_argument"));
}

#[test]
fn test_isolated_timeout() {
    let result = run_cpp_request("int main() { while (true) {} return 0; }", |r| r.with_timeout_ms(150));
    assert!(result.timed_out);
    assert!(!result.success);
    assert_eq!(result.compiler, "inbuilt-mini-cpp");
}

#[test]
fn test_output_cap_clips_on_char_boundary() {
    let result = run_cpp_request(
        r#"
        #include <iostream>
        using namespace std;
        int main() {
            for (int i = 0; i < 100; i++) cout << "é";
            return 0;
        }
    "#,
        |r| r.with_max_output_bytes(9),
    );

    assert!(result.output_truncated);
    assert_eq!(result.output, "éééé");
}

#[test]
fn test_isolated_and_inline_agree() {
    let source = "#include <iostream>\nusing namespace std;\nint main() { int t = 0; for (int i = 1; i <= 100; i++) t += i; cout << t << endl; return t % 7; }";
    let job = InbuiltJob::new(
        Dialect::Cpp,
        source.to_string(),
        std::env::temp_dir(),
        ExecutionLimits::new(5_000, 4096),
        &EngineConfig::default(),
    );

    let inline = run_inbuilt(job.clone());
    let isolated = run_isolated(job, Duration::from_millis(500));
    assert_eq!(inline, isolated);
    assert_eq!(isolated.output, "5050\n");
    assert_eq!(isolated.exit_code, Some(5050 % 7));
}
