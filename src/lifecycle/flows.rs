//! End-to-end runs built from the controller's primitives.

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{LifecycleStatus, TerminalCallback, TerminalReport, WorkloadController};
use crate::error::{BestEffort, Result};
use crate::workload::{WorkloadOptions, WorkloadRef, WorkloadSpec};

/// Everything needed to start a callback pod.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackPodRequest {
    pub name: String,
    pub command: Vec<String>,
    #[serde(default)]
    pub options: WorkloadOptions,
    /// Alternating host path (relative to the export) and container path
    #[serde(default)]
    pub bind_paths: Vec<String>,
}

/// A callback pod that reached Running, with its background watcher.
#[derive(Debug)]
pub struct StartedPod {
    pub target: WorkloadRef,
    /// Resolves after the terminal callback has run. Dropping it detaches
    /// the watcher.
    pub watcher: JoinHandle<TerminalReport>,
}

impl WorkloadController {
    /// Submit a job and wait for it to finish. The claim is released
    /// afterwards either way; the job's TTL removes it from the cluster.
    pub async fn run_job(
        &self,
        spec: WorkloadSpec,
        cancel: &CancellationToken,
    ) -> Result<LifecycleStatus> {
        let target = self.submit(spec).await?;
        let report = self
            .wait_until_terminal(&target, self.config.poll.job, cancel, None)
            .await;
        self.release(&target);

        let status = report.into_result()?;
        if status == LifecycleStatus::Succeeded {
            debug!(job = %target.name, "job execution completed");
        } else {
            warn!(job = %target.name, status = %status, "job finished unsuccessfully");
        }
        Ok(status)
    }

    /// Submit a prebuilt pod, wait for it to finish and always delete it.
    ///
    /// A failed delete never replaces the wait's outcome; it rides along as
    /// the suppressed error of the returned value.
    pub async fn run_spec_pod(
        &self,
        spec: WorkloadSpec,
        cancel: &CancellationToken,
    ) -> Result<BestEffort<LifecycleStatus>> {
        let target = self.submit(spec).await?;
        let report = self
            .wait_until_terminal(&target, self.config.poll.spec_pod, cancel, None)
            .await;
        let cleanup = self.cleanup(&target).await;

        let status = report.into_result()?;
        debug!(pod = %target.name, status = %status, "pod execution completed");
        Ok(match cleanup.suppressed {
            Some(err) => BestEffort::degraded(status, err),
            None => BestEffort::clean(status),
        })
    }

    /// Build, submit and wait for a callback pod to be Running, then watch
    /// it to completion in the background.
    ///
    /// `on_finish` receives the terminal report; without one the outcome is
    /// only logged. If the pod never reaches Running the error is returned
    /// and the pod is left in place (still claimed) for the caller to delete.
    pub async fn start_callback_pod(
        &self,
        request: CallbackPodRequest,
        cancel: &CancellationToken,
        on_finish: Option<TerminalCallback>,
    ) -> Result<StartedPod> {
        let start = tokio::time::Instant::now();
        let spec = self.builder().callback_pod(
            &request.name,
            request.command,
            &request.options,
            &request.bind_paths,
        );

        let target = self.submit(spec).await?;
        if let Err(err) = self
            .wait_until_running(&target, self.config.poll.running, cancel)
            .await
        {
            warn!(pod = %target.name, error = %err, "pod did not reach running");
            return Err(err);
        }

        let controller = self.clone();
        let watched = target.clone();
        let token = cancel.child_token();
        let window = self.config.poll.terminal;
        let callback = on_finish.unwrap_or_else(|| log_completion(watched.clone()));
        let watcher = tokio::spawn(async move {
            controller
                .wait_until_terminal(&watched, window, &token, Some(callback))
                .await
        });

        info!(pod = %target.name, duration = ?start.elapsed(), "started pod");
        Ok(StartedPod { target, watcher })
    }
}

fn log_completion(target: WorkloadRef) -> TerminalCallback {
    Box::new(move |report: &TerminalReport| {
        info!(
            pod = %target.name,
            status = %report.status,
            duration = ?report.elapsed,
            error = ?report.error,
            "pod execution completed"
        );
    })
}
