//! Process execution boundary.
//!
//! Every external program (interpreter probes, ffmpeg, pip, the separation
//! helper) is launched through [`ProcessRunner`]. The production
//! implementation, [`TokioProcessRunner`], drives `tokio::process` on a
//! private current-thread runtime and blocks the caller until the child exits
//! or the timeout expires. A timed-out child is killed, never left running.

use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tokio::runtime::Runtime;
use tokio::time::timeout;

/// Program plus argument vector. Arguments are passed verbatim, no shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.program)?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Captured result of a process that ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last `max_lines` lines of stdout followed by stderr, for error messages.
    pub fn tail(&self, max_lines: usize) -> String {
        let lines: Vec<&str> = self
            .stdout
            .lines()
            .chain(self.stderr.lines())
            .filter(|line| !line.trim().is_empty())
            .collect();

        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Errors that can occur while running an external process
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

/// Blocking process execution with a timeout.
#[cfg_attr(test, mockall::automock)]
pub trait ProcessRunner {
    fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
pub struct TokioProcessRunner {
    runtime: Runtime,
}

impl TokioProcessRunner {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        Ok(Self { runtime })
    }

    async fn run_async(
        command: &CommandSpec,
        timeout_duration: Duration,
    ) -> Result<ProcessOutput, ProcessError> {
        tracing::debug!("Executing: {}", command);

        let start = Instant::now();

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            // CREATE_NO_WINDOW: no console flash for each probe
            cmd.creation_flags(0x0800_0000);
        }

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = timeout(timeout_duration, child.wait_with_output())
            .await
            .map_err(|_| {
                tracing::warn!("{} timed out after {:?}", command.program, timeout_duration);
                ProcessError::Timeout(timeout_duration)
            })?
            .map_err(ProcessError::Wait)?;

        let duration = start.elapsed();
        let exit_code = output.status.code();

        tracing::debug!(
            "{} completed in {:.2}s with exit code {:?}",
            command.program,
            duration.as_secs_f32(),
            exit_code
        );

        Ok(ProcessOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            duration,
        })
    }
}

impl ProcessRunner for TokioProcessRunner {
    fn run(&self, command: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, ProcessError> {
        self.runtime.block_on(Self::run_async(command, timeout))
    }
}
