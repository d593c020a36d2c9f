//! Bounded external process execution
//!
//! [`run_process`] spawns a program with an argv vector (never through a
//! shell), feeds optional stdin, and streams stdout/stderr back over a channel
//! so the combined output cap and the wall-clock timeout are enforced while the
//! child is still running. Every outcome is reported through
//! [`ProcessResult`]; this module never panics or returns `Err`.

use log::debug;
use std::ffi::OsStr;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long to keep draining pipes after the child exits (grandchildren may hold them).
const DRAIN_GRACE: Duration = Duration::from_millis(250);
const READ_CHUNK: usize = 8192;

/// Options for a single [`run_process`] call.
#[derive(Debug, Clone)]
pub struct RunOptions<'a> {
    pub cwd: Option<&'a Path>,
    pub timeout: Duration,
    /// Cap on combined stdout + stderr bytes.
    pub max_output_bytes: usize,
    pub stdin_text: Option<&'a str>,
}

impl<'a> RunOptions<'a> {
    pub fn new(timeout: Duration, max_output_bytes: usize) -> Self {
        RunOptions {
            cwd: None,
            timeout,
            max_output_bytes,
            stdin_text: None,
        }
    }

    pub fn cwd(mut self, cwd: &'a Path) -> Self {
        self.cwd = Some(cwd);
        self
    }

    pub fn stdin(mut self, text: Option<&'a str>) -> Self {
        self.stdin_text = text;
        self
    }
}

/// Outcome of one external process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// Exited normally with code 0 and no limit was hit.
    pub ok: bool,
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
    pub output_truncated: bool,
    pub error: Option<String>,
    /// The program could not be spawned because it does not exist.
    pub not_found: bool,
}

impl ProcessResult {
    /// stdout followed by stderr.
    pub fn combined_output(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Run `program` with `args` under the limits in `opts`.
pub fn run_process<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    opts: &RunOptions<'_>,
) -> ProcessResult {
    let program = program.as_ref();
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if opts.stdin_text.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = opts.cwd {
        cmd.current_dir(cwd);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            let not_found = err.kind() == ErrorKind::NotFound;
            debug!("spawn {:?} failed: {err}", program);
            return ProcessResult {
                error: Some(format!(
                    "Failed to start {}: {err}",
                    program.to_string_lossy()
                )),
                not_found,
                ..ProcessResult::default()
            };
        }
    };

    if let (Some(text), Some(mut stdin)) = (opts.stdin_text, child.stdin.take()) {
        let bytes = text.as_bytes().to_vec();
        thread::spawn(move || {
            // The child may exit without reading; a broken pipe is expected then.
            let _ = stdin.write_all(&bytes);
            let _ = stdin.flush();
        });
    }

    let (tx, rx) = mpsc::channel();
    if let Some(stdout) = child.stdout.take() {
        spawn_reader(stdout, Stream::Stdout, tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_reader(stderr, Stream::Stderr, tx.clone());
    }
    drop(tx);

    let deadline = Instant::now() + opts.timeout;
    let cap = opts.max_output_bytes;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut status: Option<ExitStatus> = None;
    let mut exited_at: Option<Instant> = None;
    let mut streams_open = true;
    let mut timed_out = false;
    let mut truncated = false;
    let mut error = None;

    loop {
        if status.is_none() {
            match child.try_wait() {
                Ok(Some(s)) => {
                    status = Some(s);
                    exited_at = Some(Instant::now());
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        timed_out = true;
                        status = kill_and_wait(&mut child);
                        exited_at = Some(Instant::now());
                    }
                }
                Err(err) => {
                    error = Some(format!("Failed to wait for process: {err}"));
                    status = kill_and_wait(&mut child);
                    exited_at = Some(Instant::now());
                }
            }
        }

        if !streams_open {
            if status.is_some() {
                break;
            }
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        if exited_at.is_some_and(|t| t.elapsed() > DRAIN_GRACE) {
            break;
        }

        match rx.recv_timeout(POLL_INTERVAL) {
            Ok((stream, chunk)) => {
                if truncated {
                    continue;
                }
                let remaining = cap.saturating_sub(stdout.len() + stderr.len());
                let target = match stream {
                    Stream::Stdout => &mut stdout,
                    Stream::Stderr => &mut stderr,
                };
                if chunk.len() > remaining {
                    target.extend_from_slice(&chunk[..remaining]);
                    truncated = true;
                    if status.is_none() {
                        status = kill_and_wait(&mut child);
                        exited_at = Some(Instant::now());
                    }
                } else {
                    target.extend_from_slice(&chunk);
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => streams_open = false,
        }
    }

    if status.is_none() {
        status = kill_and_wait(&mut child);
    }

    let code = status.and_then(|s| s.code());
    let signal = status.and_then(exit_signal);
    let ok = !timed_out && !truncated && error.is_none() && code == Some(0);

    ProcessResult {
        ok,
        code,
        signal,
        stdout: clip_to_string(&stdout, truncated),
        stderr: clip_to_string(&stderr, truncated),
        timed_out,
        output_truncated: truncated,
        error,
        not_found: false,
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut reader: R, stream: Stream, tx: Sender<(Stream, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send((stream, buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
}

fn kill_and_wait(child: &mut Child) -> Option<ExitStatus> {
    let _ = child.kill();
    child.wait().ok()
}

#[cfg(unix)]
fn exit_signal(status: ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt as _;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: ExitStatus) -> Option<i32> {
    None
}

/// Decode bytes lossily; when the buffer was cut at the cap, drop a trailing
/// partial UTF-8 sequence first so the result never grows past the cap.
pub fn clip_to_string(bytes: &[u8], truncated: bool) -> String {
    let end = if truncated {
        match std::str::from_utf8(bytes) {
            Ok(_) => bytes.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => bytes.len(),
        }
    } else {
        bytes.len()
    };
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_drops_partial_sequence() {
        let text = "aé".as_bytes();
        assert_eq!(clip_to_string(&text[..2], true), "a");
        assert_eq!(clip_to_string(text, true), "aé");
    }

    #[test]
    fn test_missing_program_is_not_found() {
        let result = run_process(
            "crustrun-definitely-missing-binary",
            &["--version"],
            &RunOptions::new(Duration::from_secs(1), 1024),
        );
        assert!(result.not_found);
        assert!(!result.ok);
        assert!(result.error.is_some());
    }
}
