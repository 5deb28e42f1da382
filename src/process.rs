//! External tool execution.
//!
//! [`Cmd`] builds a command line, runs it in its own process group with
//! captured output and an optional timeout, and turns a non-zero exit into an
//! error. [`ToolHost`] is the seam packaging backends go through, so tests can
//! swap in a scripted host.

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// How often a running child is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} timed out after {}s", .limit.as_secs())]
    TimedOut { program: String, limit: Duration },

    #[error("{message} ({program} exited with {status}){}", format_stderr(.stderr))]
    Failed {
        program: String,
        message: String,
        status: String,
        stderr: String,
    },
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    success: bool,
}

impl CommandOutput {
    pub fn new(status: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: status == Some(0),
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    fn from_exit(status: ExitStatus, stdout: String, stderr: String) -> Self {
        Self {
            success: status.success(),
            status: status.code(),
            stdout,
            stderr,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// Builder for a single external command invocation.
#[derive(Debug, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    error_msg: Option<String>,
    timeout: Option<Duration>,
}

impl Cmd {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            error_msg: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn arg_path(self, path: &Path) -> Self {
        self.arg(path.as_os_str())
    }

    /// Message used when the command exits non-zero.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Kill the command if it runs longer than `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    /// Program name plus arguments, for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command, enforcing the timeout on the whole process group.
    ///
    /// Anything the tool leaves running in its group is killed once the tool
    /// exits, so no descendant can touch the output afterwards.
    pub fn run(&self) -> Result<CommandOutput, ProcessError> {
        let program = self.program.to_string_lossy().into_owned();
        tracing::debug!(command = %self.display(), "running");

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();

        // Pipes are drained concurrently; a full pipe would stall the child.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let deadline = self.timeout.map(|limit| Instant::now() + limit);
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        kill_process_group(pid);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(self.timed_out(program));
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    kill_process_group(pid);
                    let _ = child.kill();
                    return Err(ProcessError::Wait { program, source });
                }
            }
        };

        kill_process_group(pid);

        let Some(stdout) = collect_output(stdout_reader, deadline) else {
            return Err(self.timed_out(program));
        };
        let Some(stderr) = collect_output(stderr_reader, deadline) else {
            return Err(self.timed_out(program));
        };
        let output = CommandOutput::from_exit(status, stdout, stderr);

        if !output.success() {
            return Err(ProcessError::Failed {
                message: self
                    .error_msg
                    .clone()
                    .unwrap_or_else(|| format!("{} failed", program)),
                program,
                status: status.to_string(),
                stderr: output.stderr,
            });
        }

        Ok(output)
    }

    fn timed_out(&self, program: String) -> ProcessError {
        ProcessError::TimedOut {
            program,
            limit: self.timeout.unwrap_or_default(),
        }
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // ESRCH just means the group is already gone.
    unsafe {
        libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a pipe reader, no later than `deadline`.
///
/// `None` means the pipe was still held open when the deadline passed.
fn collect_output(reader: Option<Receiver<String>>, deadline: Option<Instant>) -> Option<String> {
    let Some(rx) = reader else {
        return Some(String::new());
    };
    let Some(deadline) = deadline else {
        return Some(rx.recv().unwrap_or_default());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

/// Tool lookup and execution as seen by the packaging backends.
pub trait ToolHost {
    /// Resolve `tool` to an executable path, or `None` if it is not installed.
    fn locate(&self, tool: &str) -> Option<PathBuf>;

    /// Run a fully built command.
    fn run(&self, cmd: &Cmd) -> Result<CommandOutput, ProcessError>;
}

/// The real host: tools come from `PATH`, commands are spawned.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl ToolHost for SystemHost {
    fn locate(&self, tool: &str) -> Option<PathBuf> {
        which::which(tool).ok()
    }

    fn run(&self, cmd: &Cmd) -> Result<CommandOutput, ProcessError> {
        cmd.run()
    }
}
