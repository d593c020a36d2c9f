// Integration tests for the inbuilt Mini-C engine

use crustrun::model::{CompileRunResult, Phase, RunRequest};
use crustrun::{Engine, EngineConfig};
use std::fs;
use std::path::Path;

fn run_in(dir: &Path, source: &str, request: impl FnOnce(RunRequest) -> RunRequest) -> CompileRunResult {
    run_with_config(dir, source, EngineConfig::default(), request)
}

fn run_with_config(
    dir: &Path,
    source: &str,
    config: EngineConfig,
    request: impl FnOnce(RunRequest) -> RunRequest,
) -> CompileRunResult {
    let path = dir.join("prog.c");
    fs::write(&path, source).unwrap();
    let engine = Engine::new(config);
    engine.run(&request(RunRequest::new(&path, "inbuilt")))
}

fn run_c(source: &str) -> CompileRunResult {
    let dir = tempfile::tempdir().unwrap();
    run_in(dir.path(), source, |r| r)
}

fn run_c_with_stdin(source: &str, stdin: &str) -> CompileRunResult {
    let dir = tempfile::tempdir().unwrap();
    run_in(dir.path(), source, |r| r.with_stdin(stdin))
}

#[test]
fn test_hello_world() {
    let result = run_c(
        r#"
        #include <stdio.h>

        int main() {
            printf("Hello, world!\n");
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.phase, Phase::Run);
    assert_eq!(result.output, "Hello, world!\n");
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.compiler, "inbuilt-mini-c");
    assert_eq!(result.compiler_profile, "inbuilt");
}

#[test]
fn test_printf_conversions() {
    let result = run_c(
        r#"
        #include <stdio.h>
        int main() {
            printf("%d|%5d|%-4d|%05d\n", 42, 7, 3, -12);
            printf("%.2f|%8.3f|%e|%g\n", 3.14159, 2.5, 1234.5, 0.0001);
            printf("%x|%X|%o|%c|%s|%%\n", 255, 255, 8, 'A', "text");
            printf("%u|%ld|%lld\n", 10, 100000L, 123456789012LL);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(
        result.output,
        "42|    7|3   |-0012\n3.14|   2.500|1.234500e+03|0.0001\nff|FF|10|A|text|%\n10|100000|123456789012\n"
    );
}

#[test]
fn test_integer_arithmetic_and_overflow() {
    let result = run_c(
        r#"
        #include <stdio.h>
        #include <limits.h>
        int main() {
            int a = 17, b = 5;
            printf("%d %d %d %d\n", a / b, a % b, -a / b, -a % b);
            int big = INT_MAX;
            big = big + 1;
            printf("%d\n", big);
            unsigned char c = 250;
            c += 10;
            printf("%d\n", c);
            printf("%d %d\n", 1 << 4, 0xF0 >> 4);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "3 2 -3 -2\n-2147483648\n4\n16 15\n");
}

#[test]
fn test_recursion_and_globals() {
    let result = run_c(
        r#"
        #include <stdio.h>
        int calls = 0;

        long factorial(int n) {
            calls++;
            if (n <= 1) return 1;
            return n * factorial(n - 1);
        }

        int fib(int n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }

        int main() {
            printf("%ld %d %d\n", factorial(10), fib(15), calls);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "3628800 610 10\n");
}

#[test]
fn test_control_flow() {
    let result = run_c(
        r#"
        #include <stdio.h>
        int main() {
            int total = 0;
            for (int i = 0; i < 10; i++) {
                if (i == 3) continue;
                if (i == 8) break;
                total += i;
            }
            int n = 0;
            do { n++; } while (n < 5);
            int k = 3;
            switch (k) {
                case 1: printf("one\n"); break;
                case 3: printf("three\n");
                case 4: printf("fall\n"); break;
                default: printf("other\n");
            }
            while (n > 0) n -= 2;
            printf("%d %d\n", total, n);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "three\nfall\n25 -1\n");
}

#[test]
fn test_arrays_and_pointers() {
    let result = run_c(
        r#"
        #include <stdio.h>
        #define N 5

        int sum(int *values, int count) {
            int s = 0;
            for (int i = 0; i < count; i++) s += values[i];
            return s;
        }

        void swap(int *a, int *b) { int t = *a; *a = *b; *b = t; }

        int main() {
            int nums[N] = {5, 4, 3, 2, 1};
            int grid[2][3] = {{1, 2, 3}, {4, 5, 6}};
            int *p = nums + 1;
            int x = 1, y = 2;
            swap(&x, &y);
            printf("%d %d %d\n", sum(nums, N), *p, *(p + 2));
            printf("%d %d\n", grid[1][2], (int)(sizeof(nums) / sizeof(nums[0])));
            printf("%d %d %d\n", x, y, (int)(&nums[4] - &nums[1]));
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "15 4 2\n6 5\n2 1 3\n");
}

#[test]
fn test_string_functions() {
    let result = run_c(
        r#"
        #include <stdio.h>
        #include <string.h>
        #include <ctype.h>
        int main() {
            char buf[32];
            strcpy(buf, "Hello");
            strcat(buf, ", C");
            printf("%s %d\n", buf, (int)strlen(buf));
            printf("%d %d\n", strcmp("abc", "abd") < 0, strncmp("abcX", "abcY", 3));
            char *comma = strchr(buf, ',');
            printf("%s\n", comma + 2);
            for (int i = 0; buf[i] != '\0'; i++) buf[i] = toupper(buf[i]);
            printf("%s\n", buf);
            char out[16];
            sprintf(out, "%d-%s", 7, "x");
            printf("%s %d %d\n", out, atoi("123abc"), isdigit('5') != 0);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "Hello, C 8\n1 0\nC\nHELLO, C\n7-x 123 1\n");
}

#[test]
fn test_scanf_reads_stdin() {
    let result = run_c_with_stdin(
        r#"
        #include <stdio.h>
        int main() {
            int n, total = 0;
            char name[16];
            scanf("%s", name);
            while (scanf("%d", &n) == 1) total += n;
            printf("%s: %d\n", name, total);
            return 0;
        }
    "#,
        "sum 1 2 3\n4\n",
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "sum: 10\n");
}

#[test]
fn test_heap_allocation() {
    let result = run_c(
        r#"
        #include <stdio.h>
        #include <stdlib.h>
        int main() {
            int *values = (int *)malloc(4 * sizeof(int));
            for (int i = 0; i < 4; i++) values[i] = i * i;
            values = (int *)realloc(values, 8 * sizeof(int));
            values[7] = 49;
            printf("%d %d\n", values[3], values[7]);
            free(values);

            int *zeros = (int *)calloc(3, sizeof(int));
            printf("%d\n", zeros[0] + zeros[1] + zeros[2]);
            free(zeros);
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "9 49\n0\n");
}

#[test]
fn test_math_library() {
    let result = run_c(
        r#"
        #include <stdio.h>
        #include <math.h>
        int main() {
            printf("%.1f %.1f %.3f\n", sqrt(16.0), pow(2, 10), fabs(-1.25));
            printf("%.0f %.0f %d\n", floor(2.7), ceil(2.1), abs(-9));
            return 0;
        }
    "#,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "4.0 1024.0 1.250\n2 3 9\n");
}

#[test]
fn test_file_io_relative_to_source_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("input.txt"), "first line\nsecond line\n").unwrap();

    let result = run_in(
        dir.path(),
        r#"
        #include <stdio.h>
        int main() {
            FILE *in = fopen("input.txt", "r");
            if (in == NULL) return 2;
            char line[64];
            int count = 0;
            while (fgets(line, 64, in) != NULL) count++;
            fclose(in);

            FILE *out = fopen("result.txt", "w");
            fprintf(out, "lines=%d\n", count);
            fclose(out);

            printf("%d %d\n", count, fopen("missing.txt", "r") == NULL);
            return 0;
        }
    "#,
        |r| r,
    );

    assert!(result.success, "Execution failed: {:?}", result.error);
    assert_eq!(result.output, "2 1\n");
    let written = fs::read_to_string(dir.path().join("result.txt")).unwrap();
    assert_eq!(written, "lines=2\n");
}

#[test]
fn test_exit_code_from_main_and_exit() {
    let result = run_c("int main() { return 3; }");
    assert!(!result.success);
    assert_eq!(result.exit_code, Some(3));
    assert!(result.error.is_none());

    let result = run_c(
        r#"
        #include <stdio.h>
        #include <stdlib.h>
        int main() {
            printf("before\n");
            exit(4);
            printf("after\n");
            return 0;
        }
    "#,
    );
    assert_eq!(result.exit_code, Some(4));
    assert_eq!(result.output, "before\n");
}

#[test]
fn test_rejected_construct_is_compile_error() {
    let result = run_c("int main() {\n    struct Point { int x; };\n    return 0;\n}\n");

    assert!(!result.success);
    assert_eq!(result.phase, Phase::Compile);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].line, 2);
    assert_eq!(result.diagnostics[0].col, 5);
    let error = result.error.unwrap();
    assert!(error.contains("extended subset of C, not full C"), "{error}");
}

#[test]
fn test_missing_main_is_compile_error() {
    let result = run_c("int helper() { return 1; }\n");
    assert_eq!(result.phase, Phase::Compile);
    assert!(result.error.unwrap().contains("main"));
}

#[test]
fn test_undefined_function_reclassified_as_compile_error() {
    let result = run_c("int main() {\n  int x = 1;\n  frobnicate(x);\n  return 0;\n}\n");
    assert_eq!(result.phase, Phase::Compile);
    assert_eq!(result.diagnostics[0].line, 3);
    assert!(result.error.unwrap().contains("frobnicate"));
}

#[test]
fn test_runtime_errors() {
    let result = run_c(
        r#"
        #include <stdio.h>
        int main() {
            int zero = 0;
            printf("start\n");
            printf("%d\n", 10 / zero);
            return 0;
        }
    "#,
    );
    assert!(!result.success);
    assert_eq!(result.phase, Phase::Run);
    assert_eq!(result.exit_code, Some(1));
    assert_eq!(result.output, "start\n");
    assert!(result.error.unwrap().contains("Division by zero"));

    let result = run_c(
        r#"
        #include <stdlib.h>
        int main() {
            int *p = (int *)malloc(sizeof(int));
            free(p);
            free(p);
            return 0;
        }
    "#,
    );
    assert_eq!(result.phase, Phase::Run);
    assert!(result.error.unwrap().contains("Double free"));

    let result = run_c("int main() { int a[3]; a[5] = 1; return 0; }");
    assert!(result.error.unwrap().contains("out of bounds"));
}

#[test]
fn test_infinite_loop_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_in(dir.path(), "int main() { while (1) {} return 0; }", |r| {
        r.with_timeout_ms(200)
    });

    assert!(!result.success);
    assert!(result.timed_out);
    assert_eq!(result.phase, Phase::Run);
}

#[test]
fn test_output_cap_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_in(
        dir.path(),
        r#"
        #include <stdio.h>
        int main() {
            for (int i = 0; i < 1000; i++) printf("line %d\n", i);
            return 0;
        }
    "#,
        |r| r.with_max_output_bytes(64),
    );

    assert!(!result.success);
    assert!(result.output_truncated);
    assert_eq!(result.output.len(), 64);
    assert!(result.output.starts_with("line 0\nline 1\n"));
}

#[test]
fn test_huge_printf_width_hits_output_cap() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_in(
        dir.path(),
        r#"
        #include <stdio.h>
        int main() {
            printf("start\n");
            printf("%1000000000000d\n", 1);
            return 0;
        }
    "#,
        |r| r.with_max_output_bytes(64),
    );

    assert_eq!(result.phase, Phase::Run);
    assert!(!result.success);
    assert!(result.output_truncated);
    assert_eq!(result.output.len(), 64);
    assert!(result.output.starts_with("start\n   "));

    let result = run_in(
        dir.path(),
        "#include <stdio.h>\nint main() { printf(\"%*d|%.*f\", 2147483647, 1, 2147483647, 1.0); return 0; }\n",
        |r| r.with_max_output_bytes(32),
    );
    assert!(result.output_truncated);
    assert_eq!(result.output.len(), 32);
}

#[test]
fn test_huge_sprintf_width_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        max_buffer_elems: 1024,
        ..EngineConfig::default()
    };
    let result = run_with_config(
        dir.path(),
        r#"
        #include <stdio.h>
        int main() {
            char buf[16];
            sprintf(buf, "%.1000000000000s|%99999999999d", "x", 1);
            return 0;
        }
    "#,
        config,
        |r| r,
    );

    assert_eq!(result.phase, Phase::Run);
    assert!(!result.success);
    assert!(!result.output_truncated);
    assert!(result.error.unwrap().contains("formatted output exceeds 1024 bytes"));
}

#[test]
fn test_unbounded_recursion_is_stack_overflow() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        max_call_depth: 200,
        ..EngineConfig::default()
    };
    let result = run_with_config(
        dir.path(),
        "int down(int n) { return down(n + 1); }\nint main() { return down(0); }\n",
        config,
        |r| r,
    );
    assert_eq!(result.phase, Phase::Run);
    assert!(result.error.unwrap().contains("Stack overflow (call depth limit 200 exceeded)"));
}
