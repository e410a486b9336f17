//! Command execution inside a running workload's container.
//!
//! Any output on stderr fails the call, even when the remote command exits
//! successfully. Tools that print warnings to stderr therefore surface as
//! [`WorkloadError::RemoteCommand`].

use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use kube::api::AttachedProcess;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::client::ControlPlane;
use crate::error::{BestEffort, Result, WorkloadError};
use crate::workload::{WorkloadKind, WorkloadRef};

pub const PAUSE_COMMAND: [&str; 3] = ["/bin/sh", "-c", "kill -STOP -1"];
pub const RESUME_COMMAND: [&str; 3] = ["/bin/sh", "-c", "kill -CONT -1"];

const STATUS_SUCCESS: &str = "Success";

/// How the remote process reported its exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteExit {
    Success,
    Failure(String),
    /// The stream closed without a status frame.
    Unknown,
}

/// Raw result of one exec stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCapture {
    pub stdout: String,
    pub stderr: String,
    pub exit: RemoteExit,
}

impl ExecCapture {
    /// Trimmed stdout, or an error when anything reached stderr or the
    /// process reported failure.
    pub fn into_output(self) -> Result<String> {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return Err(WorkloadError::RemoteCommand(stderr.to_string()));
        }
        if let RemoteExit::Failure(message) = self.exit {
            return Err(WorkloadError::RemoteCommand(message));
        }
        Ok(self.stdout.trim().to_string())
    }
}

/// Drain an attached process: close stdin, read stdout and stderr to the end
/// concurrently, then collect the exit status.
pub async fn capture(mut attached: AttachedProcess) -> Result<ExecCapture> {
    // Nothing is written; closing stdin lets commands that read it finish.
    drop(attached.stdin());

    let stdout = attached.stdout();
    let stderr = attached.stderr();
    let status = attached.take_status();

    let (stdout, stderr) = tokio::join!(read_stream(stdout), read_stream(stderr));
    let stdout = stdout?;
    let stderr = stderr?;

    let exit = match status {
        Some(status) => remote_exit(status.await),
        None => RemoteExit::Unknown,
    };

    attached
        .join()
        .await
        .map_err(|e| WorkloadError::RemoteCommand(format!("exec stream failed: {}", e)))?;

    Ok(ExecCapture {
        stdout,
        stderr,
        exit,
    })
}

/// Map the status frame sent when the remote process exits.
pub(crate) fn remote_exit(status: Option<Status>) -> RemoteExit {
    match status {
        Some(status) if status.status.as_deref() == Some(STATUS_SUCCESS) => RemoteExit::Success,
        Some(status) => RemoteExit::Failure(
            status
                .message
                .or(status.reason)
                .unwrap_or_else(|| "command failed".to_string()),
        ),
        None => RemoteExit::Unknown,
    }
}

async fn read_stream<R: AsyncRead + Unpin>(reader: Option<R>) -> Result<String> {
    let mut buf = Vec::new();
    if let Some(mut reader) = reader {
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| WorkloadError::RemoteCommand(format!("exec stream read failed: {}", e)))?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Runs commands in a workload's primary container.
#[derive(Clone)]
pub struct ExecChannel {
    client: Arc<dyn ControlPlane>,
}

impl ExecChannel {
    pub fn new(client: Arc<dyn ControlPlane>) -> Self {
        Self { client }
    }

    /// Run `command` and return its trimmed stdout. Only pods can be
    /// targeted.
    pub async fn exec<I, S>(&self, target: &WorkloadRef, command: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if target.kind != WorkloadKind::Pod {
            return Err(WorkloadError::RemoteCommand(format!(
                "{} has no container to exec into",
                target
            )));
        }

        let command: Vec<String> = command.into_iter().map(Into::into).collect();
        let captured = self
            .client
            .exec(
                &target.namespace,
                &target.name,
                target.primary_container(),
                command,
            )
            .await?;
        captured.into_output()
    }

    /// Stop every process in the container (`kill -STOP -1`).
    pub async fn pause(&self, target: &WorkloadRef) -> BestEffort<()> {
        let result = self.exec(target, PAUSE_COMMAND).await.map(|_| ());
        if result.is_ok() {
            info!(pod = %target.name, "paused pod");
        }
        BestEffort::from_result(result, &format!("pause {}", target))
    }

    /// Continue every stopped process in the container (`kill -CONT -1`).
    pub async fn resume(&self, target: &WorkloadRef) -> BestEffort<()> {
        let result = self.exec(target, RESUME_COMMAND).await.map(|_| ());
        if result.is_ok() {
            info!(pod = %target.name, "resumed pod");
        }
        BestEffort::from_result(result, &format!("resume {}", target))
    }

    /// Whether a process matching `process_name` shows up in `ps -ef`.
    ///
    /// A failed exec reads as "not present"; the cause is kept on the
    /// returned value rather than propagated.
    pub async fn process_present(&self, target: &WorkloadRef, process_name: &str) -> BestEffort<bool> {
        let command = process_probe_command(process_name);
        match self.exec(target, command).await {
            Ok(output) => {
                debug!(pod = %target.name, process = process_name, output = %output, "process probe");
                BestEffort::clean(!output.is_empty())
            }
            Err(err) => {
                debug!(pod = %target.name, process = process_name, error = %err, "process probe failed");
                BestEffort::degraded(false, err)
            }
        }
    }
}

/// `sh -c "ps -ef | grep '<name>' | grep -v grep"`
pub fn process_probe_command(process_name: &str) -> [String; 3] {
    [
        "sh".to_string(),
        "-c".to_string(),
        format!("ps -ef | grep {} | grep -v grep", shell_quote(process_name)),
    ]
}

fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
