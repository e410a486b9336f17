//! Workload lifecycle: submit, wait for Running or a terminal state,
//! inspect, delete.
//!
//! Timeouts and cancellation only stop the local wait. The workload keeps
//! running on the cluster until someone deletes it.

mod flows;
pub mod poll;
pub mod registry;
pub mod status;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ControlPlane;
use crate::config::{PollWindow, WorkloadConfig};
use crate::error::{BestEffort, Result, WorkloadError};
use crate::exec::ExecChannel;
use crate::workload::{WorkloadBuilder, WorkloadKind, WorkloadRef, WorkloadSpec};

pub use flows::{CallbackPodRequest, StartedPod};
pub use poll::poll_until;
pub use registry::InFlightRegistry;
pub use status::{classify_job, classify_pod, LifecycleStatus, PollOutcome};

/// Called once when a terminal wait resolves.
pub type TerminalCallback = Box<dyn FnOnce(&TerminalReport) + Send + 'static>;

/// How a terminal wait ended.
#[derive(Debug, Clone)]
pub struct TerminalReport {
    /// Last status observed; `Unknown` if no read ever succeeded
    pub status: LifecycleStatus,
    pub elapsed: Duration,
    /// `None` when a terminal state was reached
    pub error: Option<WorkloadError>,
}

impl TerminalReport {
    pub fn into_result(self) -> Result<LifecycleStatus> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.status),
        }
    }
}

/// Point-in-time read of a workload.
#[derive(Debug, Clone)]
pub enum WorkloadSnapshot {
    Pod(Box<Pod>),
    Job(Box<Job>),
}

/// Drives one workload at a time through its lifecycle against a shared
/// control-plane handle. Cheap to clone; clones share the in-flight registry.
#[derive(Clone)]
pub struct WorkloadController {
    client: Arc<dyn ControlPlane>,
    config: Arc<WorkloadConfig>,
    registry: InFlightRegistry,
}

impl WorkloadController {
    pub fn new(client: Arc<dyn ControlPlane>, config: WorkloadConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
            registry: InFlightRegistry::new(),
        }
    }

    pub fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    pub fn registry(&self) -> &InFlightRegistry {
        &self.registry
    }

    pub fn builder(&self) -> WorkloadBuilder<'_> {
        WorkloadBuilder::new(&self.config)
    }

    /// Exec channel over the same control-plane handle.
    pub fn exec_channel(&self) -> ExecChannel {
        ExecChannel::new(self.client.clone())
    }

    /// API server version, failing when the cluster cannot be reached.
    pub async fn check_connectivity(&self) -> Result<String> {
        let version = self.client.check_connectivity().await?;
        info!(version = %version, "Kubernetes cluster is accessible");
        Ok(version)
    }

    /// Identity for an existing pod in the configured namespace.
    pub fn pod_ref(&self, name: &str) -> WorkloadRef {
        WorkloadRef::pod(self.config.namespace.clone(), name)
    }

    /// Claim the spec's identity and create it on the cluster.
    ///
    /// On rejection the claim is dropped again and the control plane's
    /// error is returned as is; nothing is retried.
    pub async fn submit(&self, spec: WorkloadSpec) -> Result<WorkloadRef> {
        let target = spec.reference(&self.config.namespace);
        self.registry.claim(&target)?;

        let created = match &spec {
            WorkloadSpec::Pod(pod) => self
                .client
                .create_pod(&target.namespace, pod)
                .await
                .map(|pod| pod.status.and_then(|s| s.phase)),
            WorkloadSpec::Job(job) => self
                .client
                .create_job(&target.namespace, job)
                .await
                .map(|_| None),
        };

        match created {
            Ok(phase) => {
                info!(workload = %target, phase = ?phase, "created workload");
                Ok(target)
            }
            Err(err) => {
                self.registry.release(&target);
                warn!(workload = %target, error = %err, "failed to create workload");
                Err(err)
            }
        }
    }

    /// Read and classify the workload once.
    pub async fn observe(&self, target: &WorkloadRef) -> Result<PollOutcome> {
        match target.kind {
            WorkloadKind::Pod => {
                let pod = self.client.get_pod(&target.namespace, &target.name).await?;
                Ok(classify_pod(&pod, target.primary_container()))
            }
            WorkloadKind::Job => {
                let job = self.client.get_job(&target.namespace, &target.name).await?;
                Ok(classify_job(&job))
            }
        }
    }

    /// Poll until the workload reports Running.
    pub async fn wait_until_running(
        &self,
        target: &WorkloadRef,
        window: PollWindow,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let what = format!("{} to be running", target);
        poll_until(&what, window.interval(), window.timeout(), cancel, move || async move {
            let outcome = self.observe(target).await.map_err(|e| {
                warn!(workload = %target, error = %e, "failed to read workload while waiting for running");
                e
            })?;
            Ok(outcome.status == LifecycleStatus::Running)
        })
        .await?;

        info!(workload = %target, "workload is running");
        Ok(())
    }

    /// Poll until the workload reaches a terminal state, then hand the
    /// report to `callback` (if any) and return it.
    pub async fn wait_until_terminal(
        &self,
        target: &WorkloadRef,
        window: PollWindow,
        cancel: &CancellationToken,
        callback: Option<TerminalCallback>,
    ) -> TerminalReport {
        let start = Instant::now();
        let last = Mutex::new(LifecycleStatus::Unknown);
        let last_seen = &last;
        let what = format!("{} to finish", target);

        let result = poll_until(&what, window.interval(), window.timeout(), cancel, move || async move {
            let outcome = self.observe(target).await?;
            debug!(workload = %target, status = %outcome.status, "workload status");
            *last_seen.lock().await = outcome.status;
            Ok(outcome.terminal)
        })
        .await;

        let report = TerminalReport {
            status: last.into_inner(),
            elapsed: start.elapsed(),
            error: result.err(),
        };

        match &report.error {
            None => info!(
                workload = %target,
                status = %report.status,
                duration = ?report.elapsed,
                "workload reached terminal state"
            ),
            Some(err) => warn!(
                workload = %target,
                status = %report.status,
                error = %err,
                "stopped waiting for workload"
            ),
        }

        if let Some(callback) = callback {
            callback(&report);
        }
        report
    }

    /// Delete with background propagation and drop the claim. Dependents
    /// are removed by the control plane later.
    pub async fn delete(&self, target: &WorkloadRef) -> Result<()> {
        let result = match target.kind {
            WorkloadKind::Pod => self.client.delete_pod(&target.namespace, &target.name).await,
            WorkloadKind::Job => self.client.delete_job(&target.namespace, &target.name).await,
        };
        self.registry.release(target);

        result?;
        info!(workload = %target, "deleted workload");
        Ok(())
    }

    /// [`delete`](Self::delete) for deferred cleanup: a failure is logged and
    /// kept on the result, never returned.
    pub async fn cleanup(&self, target: &WorkloadRef) -> BestEffort<()> {
        let result = self.delete(target).await;
        BestEffort::from_result(result, &format!("cleanup of {}", target))
    }

    /// Stop managing `target` without deleting it.
    pub fn release(&self, target: &WorkloadRef) -> bool {
        self.registry.release(target)
    }

    pub async fn inspect(&self, target: &WorkloadRef) -> Result<WorkloadSnapshot> {
        let snapshot = match target.kind {
            WorkloadKind::Pod => WorkloadSnapshot::Pod(Box::new(
                self.client.get_pod(&target.namespace, &target.name).await?,
            )),
            WorkloadKind::Job => WorkloadSnapshot::Job(Box::new(
                self.client.get_job(&target.namespace, &target.name).await?,
            )),
        };
        debug!(workload = %target, "inspected workload");
        Ok(snapshot)
    }

    /// The pod's cluster IP.
    pub async fn inspect_address(&self, target: &WorkloadRef) -> Result<IpAddr> {
        if target.kind != WorkloadKind::Pod {
            return Err(WorkloadError::Read(format!("{} has no pod address", target)));
        }

        let pod = self.client.get_pod(&target.namespace, &target.name).await?;
        let ip = pod
            .status
            .and_then(|s| s.pod_ip)
            .ok_or_else(|| WorkloadError::Read(format!("{} has no IP assigned yet", target)))?;
        let address: IpAddr = ip
            .parse()
            .map_err(|e| WorkloadError::Read(format!("{} reported bad IP {}: {}", target, ip, e)))?;

        info!(workload = %target, ip = %address, "inspected pod address");
        Ok(address)
    }
}
