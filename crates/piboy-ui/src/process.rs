//! Child process control: bounded one-shot commands and long-running
//! players that can be paused, resumed and stopped.
//!
//! Pause and resume use SIGSTOP/SIGCONT and only work on Unix.

use std::ffi::OsStr;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::error::CommandError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs `program` to completion or until `timeout`, whichever comes first.
/// On timeout the whole process group is killed.
pub fn run_with_timeout<I, S>(
    program: &str,
    args: I,
    cwd: Option<&Path>,
    timeout: Duration,
) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command.spawn().map_err(|source| CommandError::Spawn {
        program: program.to_string(),
        source,
    })?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= timeout => {
                // Grandchildren may hold the pipes open; leave the readers behind.
                let _ = signal::killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL);
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Timeout {
                    program: program.to_string(),
                    after: timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                return Err(CommandError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }
    };

    Ok(CommandOutput {
        status: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

/// [`run_with_timeout`] that also treats a non-zero exit as a failure.
pub fn run_checked<I, S>(
    program: &str,
    args: I,
    timeout: Duration,
) -> Result<CommandOutput, CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let output = run_with_timeout(program, args, None, timeout)?;
    if output.success() {
        Ok(output)
    } else {
        Err(CommandError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: output.stderr,
        })
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn collect(reader: Option<thread::JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// A long-running child owned by one mode. Stopped on drop.
pub struct ManagedProcess {
    program: String,
    child: Child,
    paused: bool,
    reaped: bool,
}

const DROP_GRACE: Duration = Duration::from_millis(200);

impl ManagedProcess {
    pub fn spawn<I, S>(program: &str, args: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(Self {
            program: program.to_string(),
            child,
            paused: false,
            reaped: false,
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) -> Result<()> {
        if !self.paused {
            self.signal(Signal::SIGSTOP)
                .with_context(|| format!("pausing {}", self.program))?;
            self.paused = true;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.paused {
            self.signal(Signal::SIGCONT)
                .with_context(|| format!("resuming {}", self.program))?;
            self.paused = false;
        }
        Ok(())
    }

    /// True once the child has exited on its own (or been reaped).
    pub fn has_exited(&mut self) -> bool {
        if self.reaped {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(_)) | Err(_) => {
                self.reaped = true;
                true
            }
            Ok(None) => false,
        }
    }

    /// SIGTERM, then SIGKILL once `grace` has passed. Safe to repeat and
    /// safe to call after the child already exited.
    pub fn terminate(&mut self, grace: Duration) {
        if self.has_exited() {
            return;
        }
        if self.paused {
            let _ = self.signal(Signal::SIGCONT);
            self.paused = false;
        }
        if let Err(err) = self.signal(Signal::SIGTERM) {
            tracing::debug!("SIGTERM to {} failed: {}", self.program, err);
        }

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if self.has_exited() {
                return;
            }
            thread::sleep(POLL_INTERVAL);
        }

        let _ = self.child.kill();
        let _ = self.child.wait();
        self.reaped = true;
    }

    fn signal(&self, sig: Signal) -> nix::Result<()> {
        match signal::kill(Pid::from_raw(self.child.id() as i32), sig) {
            Err(Errno::ESRCH) => Ok(()),
            other => other,
        }
    }
}

impl Drop for ManagedProcess {
    fn drop(&mut self) {
        self.terminate(DROP_GRACE);
    }
}
