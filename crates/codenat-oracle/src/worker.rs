//! JSON-lines model workers.
//!
//! A worker is a long-lived child process that reads one JSON request per
//! line on stdin and answers with one JSON object per line on stdout:
//!
//! ```text
//! -> {"task":"fill_mask","text":"int <mask> = 0;"}
//! <- {"predictions":[{"token_str":" count","score":0.41}, ...]}
//! -> {"task":"loss","input_ids":[101, 2003, 1996]}
//! <- {"loss":2.173}
//! <- {"error":"CUDA out of memory"}
//! ```
//!
//! The worker stays loaded for the whole run; its stderr is inherited so
//! model logs reach the terminal.

use crate::{CausalLmOracle, MaskPredictions, MaskedLmOracle};
use codenat_common::{PipelineError, Result};
use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
enum WorkerRequest<'a> {
    FillMask { text: &'a str },
    Loss { input_ids: &'a [u32] },
}

struct WorkerIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Handle to a running worker process.
pub struct WorkerProcess {
    command: String,
    io: Mutex<WorkerIo>,
}

impl WorkerProcess {
    /// Start `command` through the shell.
    pub fn spawn(command: &str) -> Result<Self> {
        let mut child = shell(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| PipelineError::OracleUnavailable(format!("spawn `{command}`: {e}")))?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            return Err(PipelineError::OracleUnavailable(format!(
                "worker `{command}` has no stdio pipes"
            )));
        };
        info!(command, pid = child.id(), "started model worker");

        Ok(Self {
            command: command.to_string(),
            io: Mutex::new(WorkerIo { child, stdin, stdout: BufReader::new(stdout) }),
        })
    }

    fn request(&self, request: &WorkerRequest<'_>) -> Result<Value> {
        let unavailable = |what: &str, e: &dyn std::fmt::Display| {
            PipelineError::OracleUnavailable(format!("worker `{}` {what}: {e}", self.command))
        };

        let mut io = self
            .io
            .lock()
            .map_err(|_| PipelineError::OracleUnavailable("worker lock poisoned".to_string()))?;

        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).map_err(|e| unavailable("write", &e))?;
        io.stdin.flush().map_err(|e| unavailable("flush", &e))?;

        let mut reply = String::new();
        let read = io.stdout.read_line(&mut reply).map_err(|e| unavailable("read", &e))?;
        if read == 0 {
            return Err(unavailable("read", &"closed its output"));
        }

        let value: Value = serde_json::from_str(reply.trim()).map_err(|e| {
            PipelineError::Oracle(format!("worker replied with invalid JSON: {e}"))
        })?;
        if let Some(message) = value.get("error") {
            let message = message.as_str().map_or_else(|| message.to_string(), str::to_string);
            return Err(PipelineError::Oracle(message));
        }
        Ok(value)
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        let io = match self.io.get_mut() {
            Ok(io) => io,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = io.child.kill() {
            debug!(command = %self.command, "worker already exited: {e}");
        }
        if let Err(e) = io.child.wait() {
            warn!(command = %self.command, "failed to reap worker: {e}");
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// A worker-backed oracle. One instance serves one model.
pub struct WorkerOracle {
    worker: WorkerProcess,
    max_context: usize,
}

impl WorkerOracle {
    pub fn spawn(command: &str, max_context: usize) -> Result<Self> {
        Ok(Self { worker: WorkerProcess::spawn(command)?, max_context })
    }
}

impl MaskedLmOracle for WorkerOracle {
    fn fill_mask(&self, context: &str) -> Result<MaskPredictions> {
        let reply = self.worker.request(&WorkerRequest::FillMask { text: context })?;
        let predictions = reply.get("predictions").ok_or_else(|| {
            PipelineError::OracleShapeMismatch("reply has no `predictions` field".to_string())
        })?;
        MaskPredictions::from_json(predictions)
    }
}

impl CausalLmOracle for WorkerOracle {
    fn max_context(&self) -> usize {
        self.max_context
    }

    fn mean_loss(&self, token_ids: &[u32]) -> Result<f64> {
        let reply = self.worker.request(&WorkerRequest::Loss { input_ids: token_ids })?;
        reply
            .get("loss")
            .and_then(Value::as_f64)
            .ok_or_else(|| PipelineError::Oracle("reply has no numeric `loss` field".to_string()))
    }
}
