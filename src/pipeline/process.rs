//! Subprocess ownership.
//!
//! A [`ProcessGuard`] owns one child process from spawn until it has been
//! reaped. Dropping the guard early (for example when the client goes away
//! and the request future is cancelled) kills the child.

use std::ffi::OsStr;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// Everything a finished process wrote, with its exit status.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// Exit code, or `None` when the process was killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stderr decoded lossily as UTF-8.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Owner of a running child process.
pub struct ProcessGuard {
    child: Child,
    program: String,
    grace: Duration,
    reaped: bool,
}

impl ProcessGuard {
    /// Spawns `program` with piped stdout/stderr and a closed stdin.
    pub fn spawn<I, S>(program: impl AsRef<OsStr>, args: I, grace: Duration) -> io::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program_name = program.as_ref().to_string_lossy().into_owned();
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(program = %program_name, pid = ?child.id(), "spawned subprocess");

        Ok(Self {
            child,
            program: program_name,
            grace,
            reaped: false,
        })
    }

    /// Drains stdout and stderr concurrently, then waits for exit.
    ///
    /// Both pipes are read at the same time so a chatty stderr cannot block
    /// the child while stdout is still being consumed.
    pub async fn collect(&mut self) -> io::Result<ProcessOutput> {
        let mut stdout_pipe = self.child.stdout.take();
        let mut stderr_pipe = self.child.stderr.take();

        let read_stdout = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        };
        let read_stderr = async {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                pipe.read_to_end(&mut buf).await?;
            }
            Ok::<_, io::Error>(buf)
        };

        let (stdout, stderr) = tokio::try_join!(read_stdout, read_stderr)?;
        let status = self.child.wait().await?;
        self.reaped = true;

        tracing::debug!(
            program = %self.program,
            code = ?status.code(),
            stdout_bytes = stdout.len(),
            stderr_bytes = stderr.len(),
            "subprocess exited"
        );

        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
        })
    }

    /// Stops the child: SIGTERM, then a forced kill once the grace period
    /// runs out. Always reaps.
    pub async fn terminate(&mut self) {
        if self.reaped {
            return;
        }

        if let Some(pid) = self.child.id() {
            send_term_signal(pid).await;
            match tokio::time::timeout(self.grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    tracing::debug!(program = %self.program, pid, code = ?status.code(), "subprocess stopped after SIGTERM");
                    self.reaped = true;
                    return;
                }
                Ok(Err(e)) => {
                    tracing::warn!(program = %self.program, pid, error = %e, "waiting for subprocess failed");
                }
                Err(_) => {
                    tracing::warn!(
                        program = %self.program,
                        pid,
                        grace_ms = self.grace.as_millis() as u64,
                        "subprocess ignored SIGTERM, killing"
                    );
                }
            }
        }

        // kill() sends SIGKILL and waits, so the child is reaped either way.
        if let Err(e) = self.child.kill().await {
            tracing::warn!(program = %self.program, error = %e, "failed to kill subprocess");
        }
        self.reaped = true;
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!(program = %self.program, pid = ?self.child.id(), "dropping live subprocess, killing");
            let _ = self.child.start_kill();
        }
    }
}

#[cfg(unix)]
async fn send_term_signal(pid: u32) {
    if pid == 0 || pid > i32::MAX as u32 {
        tracing::warn!(pid, "skipping SIGTERM for out-of-range pid");
        return;
    }
    let _ = Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
}

#[cfg(not(unix))]
async fn send_term_signal(pid: u32) {
    let _ = pid;
}
