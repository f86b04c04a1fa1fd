//! External tool invocation with a deadline.
//!
//! Every mixer, snapshot, and watcher operation ends up here. A hung tool
//! blocks only its caller and is killed once the timeout fires.

use std::fmt;
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Timeout for `amixer` reads and writes.
pub const MIXER_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for `alsactl` store/restore.
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for starting/stopping the watcher service.
pub const SERVICE_TIMEOUT: Duration = Duration::from_secs(15);

/// Timeout for short probes (`systemctl is-active`, `arecord -l`).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for each concurrent restore write during unmute.
pub const UNMUTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval when waiting for a tool process to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long pipe readers get to finish after a tool was killed. A forked
/// grandchild (`sudo` → `alsactl`) can hold the pipes open past the kill.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Tool invocation failures. `command` is the full command line as run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The program could not be started (missing binary, permissions).
    SpawnFailed { command: String, reason: String },
    /// The program exited unsuccessfully.
    Exited {
        command: String,
        status: String,
        stderr: String,
    },
    /// The program did not finish before the deadline and was killed.
    TimedOut { command: String, timeout: Duration },
}

impl ToolError {
    /// Raw diagnostic text (stderr, spawn error, or timeout notice).
    pub fn diagnostic(&self) -> &str {
        match self {
            ToolError::SpawnFailed { reason, .. } => reason,
            ToolError::Exited { stderr, .. } => stderr,
            ToolError::TimedOut { .. } => "timed out",
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::SpawnFailed { command, reason } => {
                write!(f, "failed to run `{command}`: {reason}")
            }
            ToolError::Exited {
                command,
                status,
                stderr,
            } => {
                if stderr.is_empty() {
                    write!(f, "`{command}` {status}")
                } else {
                    write!(f, "`{command}` {status}: {stderr}")
                }
            }
            ToolError::TimedOut { command, timeout } => {
                write!(f, "`{command}` timed out after {timeout:?}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Captured output of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Render a command line for logs and errors.
pub fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push('\'');
            line.push_str(arg);
            line.push('\'');
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Run `program args...`, waiting at most `timeout`.
///
/// Both pipes are drained on helper threads so a chatty tool cannot stall on
/// a full pipe while we poll. Failures are logged before being returned.
pub fn run(program: &str, args: &[&str], timeout: Duration) -> Result<ToolOutput, ToolError> {
    let command = command_line(program, args);
    let result = run_inner(program, args, timeout, &command);
    if let Err(ref e) = result {
        log::error!("tool failed: {e}");
    }
    result
}

/// Like [`run`], for invocations whose failure is an expected answer
/// (`systemctl is-active` on a stopped unit). Failures log at debug.
pub fn run_quiet(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let command = command_line(program, args);
    let result = run_inner(program, args, timeout, &command);
    if let Err(ref e) = result {
        log::debug!("{e}");
    }
    result
}

fn run_inner(
    program: &str,
    args: &[&str],
    timeout: Duration,
    command: &str,
) -> Result<ToolOutput, ToolError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ToolError::SpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_with_deadline(&mut child, timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            // Timeout: kill and reap
            let _ = child.kill();
            let _ = child.wait();
            join_drains([stdout, stderr], DRAIN_GRACE, command);
            return Err(ToolError::TimedOut {
                command: command.to_string(),
                timeout,
            });
        }
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            join_drains([stdout, stderr], DRAIN_GRACE, command);
            return Err(ToolError::SpawnFailed {
                command: command.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let stdout = collect(stdout);
    let stderr = collect(stderr);

    if status.success() {
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(ToolError::Exited {
            command: command.to_string(),
            status: describe_status(status),
            stderr: stderr.trim().to_string(),
        })
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

/// Join pipe readers of a killed tool, waiting at most `grace`. Readers still
/// blocked after that are left to finish on their own. Returns whether all
/// were joined.
fn join_drains(
    handles: [Option<JoinHandle<String>>; 2],
    grace: Duration,
    command: &str,
) -> bool {
    let deadline = Instant::now() + grace;
    while handles.iter().flatten().any(|h| !h.is_finished()) && Instant::now() < deadline {
        std::thread::sleep(POLL_INTERVAL);
    }
    let mut joined = true;
    for handle in handles.into_iter().flatten() {
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            joined = false;
        }
    }
    if !joined {
        log::warn!("`{command}` was killed but its output pipes are still open");
    }
    joined
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}
