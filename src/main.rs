// crustrun: compile and run single-file C/C++ programs

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use crustrun::model::{CompileRunResult, RunRequest};
use crustrun::toolchain::ToolchainLocator;
use crustrun::{Engine, EngineConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "crustrun", version, about = "Compile and run single-file C/C++ programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile and run a source file
    Run(RunArgs),
    /// Handle a JSON request document and print the JSON result
    Request {
        /// Path to a RunRequest JSON file
        path: PathBuf,
    },
    /// Print every executable a compiler command resolves to
    Locate {
        command: String,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// C or C++ source file
    source: PathBuf,
    /// Compiler profile: auto, inbuilt, gcc, clang, custom, ...
    #[arg(short, long, default_value = "auto")]
    profile: String,
    /// Compiler command for the custom profile
    #[arg(long)]
    custom_command: Option<String>,
    /// Extra compiler arguments, split shell-style
    #[arg(long = "args", allow_hyphen_values = true)]
    extra_args: Option<String>,
    /// Text fed to the program's stdin
    #[arg(long, conflicts_with = "stdin_file")]
    stdin: Option<String>,
    /// File fed to the program's stdin
    #[arg(long)]
    stdin_file: Option<PathBuf>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    max_output_bytes: Option<usize>,
    /// Print the result as JSON
    #[arg(long, conflicts_with = "tui")]
    json: bool,
    /// Show the result in the terminal viewer
    #[arg(long)]
    tui: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}

/// Returns whether the command succeeded.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Run(args) => run_source(args),
        Command::Request { path } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read request {}", path.display()))?;
            let request: RunRequest = serde_json::from_str(&text)
                .with_context(|| format!("invalid request document {}", path.display()))?;
            let result = Engine::new(EngineConfig::from_env()).run(&request);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(result.success)
        }
        Command::Locate { command } => {
            let found = ToolchainLocator::from_env().resolve(&command);
            if found.is_empty() {
                eprintln!("{command}: not found");
                return Ok(false);
            }
            for path in found {
                println!("{}", path.display());
            }
            Ok(true)
        }
    }
}

fn run_source(args: RunArgs) -> Result<bool> {
    if !args.source.exists() {
        bail!("file '{}' not found", args.source.display());
    }

    let mut request = RunRequest::new(args.source.clone(), args.profile);
    request.custom_compiler_command = args.custom_command;
    request.extra_compiler_args = args.extra_args;
    request.timeout_ms = args.timeout_ms;
    request.max_output_bytes = args.max_output_bytes;
    request.stdin = match (args.stdin, args.stdin_file) {
        (Some(text), _) => Some(text),
        (None, Some(path)) => Some(
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read stdin file {}", path.display()))?,
        ),
        (None, None) => None,
    };

    let result = Engine::new(EngineConfig::from_env()).run(&request);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if args.tui {
        let source = fs::read_to_string(&args.source)
            .with_context(|| format!("failed to read {}", args.source.display()))?;
        let success = result.success;
        crustrun::ui::show_result(source, result).context("terminal viewer failed")?;
        return Ok(success);
    } else {
        print_plain(&result);
    }
    Ok(result.success)
}

/// Program output on stdout; everything about the build on stderr.
fn print_plain(result: &CompileRunResult) {
    print!("{}", result.output);
    if !result.output.is_empty() && !result.output.ends_with('\n') {
        println!();
    }

    if !result.success && !result.compile_output.is_empty() {
        eprintln!("{}", result.compile_output.trim_end());
    }
    for diag in &result.diagnostics {
        eprintln!("{}:{}: {}: {}", diag.line, diag.col, diag.severity, diag.message);
    }
    if result.output_truncated {
        eprintln!("[output truncated]");
    }
    if let Some(error) = &result.error {
        eprintln!("{error}");
    }
    eprintln!(
        "[{} via {}] phase: {}, exit code: {}",
        if result.success { "ok" } else { "failed" },
        result.compiler,
        result.phase,
        result.exit_code.map_or("-".to_string(), |c| c.to_string()),
    );
}
