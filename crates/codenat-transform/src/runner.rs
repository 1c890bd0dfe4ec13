//! Shell command execution with a timeout that cleans up after itself.
//!
//! A timed-out command may have started a whole tree of processes (the JVM,
//! its helpers, anything they fork). All of them are killed before
//! [`run_command`] returns, so nothing keeps burning CPU or GPU afterwards.

use codenat_common::Result;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Message reported for a command that ran out of time.
pub const TIMEOUT_SENTINEL: &str = "Timeout";

/// How a command ended. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Exit status 0, with stdout.
    Success(String),
    /// Non-zero exit, with stderr (or stdout when stderr is empty).
    Failure(String),
    Timeout,
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Captured output, or [`TIMEOUT_SENTINEL`].
    pub fn message(&self) -> &str {
        match self {
            Self::Success(text) | Self::Failure(text) => text,
            Self::Timeout => TIMEOUT_SENTINEL,
        }
    }
}

fn capture<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe
            && let Err(e) = pipe.read_to_end(&mut buf).await
        {
            debug!("pipe read failed: {e}");
        }
        buf
    })
}

fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    // The shell leads a fresh process group, so the whole tree can be
    // signalled at once.
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Run `command` through `sh -c`, killing its process tree on timeout.
///
/// The deadline covers both the shell's exit and the end of its output. A
/// background process still holding the pipes counts as still running.
pub async fn run_command(command: &str, timeout: Option<Duration>) -> Result<CommandOutcome> {
    let mut child = shell(command).stdout(Stdio::piped()).stderr(Stdio::piped()).spawn()?;
    // `id()` is gone once the shell has been reaped; the group outlives it.
    let leader = child.id();
    let stdout = capture(child.stdout.take());
    let stderr = capture(child.stderr.take());
    let readers = [stdout.abort_handle(), stderr.abort_handle()];

    let finished = async {
        let status = child.wait().await;
        let stdout = stdout.await.unwrap_or_default();
        let stderr = stderr.await.unwrap_or_default();
        (status, stdout, stderr)
    };
    let finished = match timeout {
        Some(limit) => tokio::time::timeout(limit, finished).await.ok(),
        None => Some(finished.await),
    };

    let Some((status, stdout, stderr)) = finished else {
        warn!("command timed out after {:?}: {command}", timeout.unwrap_or_default());
        terminate(&mut child, leader).await;
        for reader in readers {
            reader.abort();
        }
        return Ok(CommandOutcome::Timeout);
    };
    Ok(classify(status?, &stdout, &stderr))
}

fn classify(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> CommandOutcome {
    let stdout = String::from_utf8_lossy(stdout).into_owned();
    if status.success() {
        return CommandOutcome::Success(stdout);
    }
    let stderr = String::from_utf8_lossy(stderr).into_owned();
    if !stderr.is_empty() {
        CommandOutcome::Failure(stderr)
    } else if !stdout.is_empty() {
        CommandOutcome::Failure(stdout)
    } else {
        CommandOutcome::Failure(format!("command failed with {status} and no output"))
    }
}

async fn terminate(child: &mut Child, leader: Option<u32>) {
    let Some(pid) = leader else {
        return;
    };
    match child.try_wait() {
        // The shell has been reaped and its pid may be reused; only the
        // group it led is still safe to signal.
        Ok(Some(_)) => {
            #[cfg(unix)]
            kill_group(pid);
            debug!(pid, "shell already exited, killed its process group");
        }
        _ => {
            let killed = kill_process_tree(pid);
            debug!(pid, killed, "killed process tree");
            if let Err(e) = child.kill().await {
                debug!("shell already gone: {e}");
            }
        }
    }
}

/// Every process descending from `root`, parents before children.
pub fn descendants(system: &System, root: Pid) -> Vec<Pid> {
    let mut found = vec![root];
    let mut next = 0;
    while next < found.len() {
        let parent = found[next];
        let children: Vec<Pid> = system
            .processes()
            .iter()
            .filter(|(_, process)| process.parent() == Some(parent))
            .map(|(pid, _)| *pid)
            .collect();
        for child in children {
            if !found.contains(&child) {
                found.push(child);
            }
        }
        next += 1;
    }
    found.remove(0);
    found
}

/// Kill `root` and everything it spawned. Returns how many descendants
/// were signalled individually.
///
/// The tree is snapshotted first, then the process group led by `root` is
/// killed, then any descendant that left the group.
pub fn kill_process_tree(root: u32) -> usize {
    let system = System::new_all();
    let tree = descendants(&system, Pid::from_u32(root));

    #[cfg(unix)]
    kill_group(root);

    let mut killed = 0;
    for pid in tree.iter().rev() {
        if let Some(process) = system.process(*pid)
            && process.kill()
        {
            killed += 1;
        }
    }
    if let Some(process) = system.process(Pid::from_u32(root)) {
        process.kill();
    }
    killed
}

/// Signal every member of the group led by `leader`, even after the leader
/// itself has exited. A group id is not reused while any member is alive.
#[cfg(unix)]
fn kill_group(leader: u32) {
    let Ok(pgid) = libc::pid_t::try_from(leader) else {
        return;
    };
    // SAFETY: killpg only reads its integer arguments.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        debug!(pgid, "killpg failed: {}", std::io::Error::last_os_error());
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_captures_stdout() {
        let outcome = run_command("echo hello", None).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Success("hello\n".into()));
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn failure_prefers_stderr() {
        let outcome = run_command("echo out; echo err >&2; exit 3", None).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Failure("err\n".into()));
    }

    #[tokio::test]
    async fn failure_falls_back_to_stdout() {
        let outcome = run_command("echo only-out; exit 1", None).await.unwrap();
        assert_eq!(outcome.message(), "only-out\n");
    }

    #[tokio::test]
    async fn silent_failure_still_has_a_message() {
        let outcome = run_command("exit 2", None).await.unwrap();
        assert!(matches!(outcome, CommandOutcome::Failure(ref m) if m.contains("no output")));
    }

    #[tokio::test]
    async fn fast_command_beats_its_timeout() {
        let outcome = run_command("echo quick", Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(outcome.message(), "quick\n");
    }

    #[tokio::test]
    async fn background_job_holding_the_pipes_times_out() {
        let started = std::time::Instant::now();
        let outcome = run_command("sleep 5 & echo hi", Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Timeout);
        assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn background_job_without_timeout_is_waited_for() {
        let outcome = run_command("sleep 0.2 & echo hi", None).await.unwrap();
        assert_eq!(outcome, CommandOutcome::Success("hi\n".into()));
    }

    #[test]
    fn timeout_message_is_the_sentinel() {
        assert_eq!(CommandOutcome::Timeout.message(), "Timeout");
    }
}
