use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobStatus};
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use nfs_workload::{ControlPlane, ExecCapture, RemoteExit, Result, WorkloadError};

pub const CREATE_POD: &str = "create_pod";
pub const GET_POD: &str = "get_pod";
pub const DELETE_POD: &str = "delete_pod";
pub const CREATE_JOB: &str = "create_job";
pub const GET_JOB: &str = "get_job";
pub const DELETE_JOB: &str = "delete_job";
pub const EXEC: &str = "exec";

/// A recorded exec call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCall {
    pub namespace: String,
    pub pod: String,
    pub container: String,
    pub command: Vec<String>,
}

/// In-memory control plane.
///
/// Status reads walk a scripted sequence per workload name; the last entry
/// repeats once the script runs out. Any operation can be made to fail a
/// number of times.
#[derive(Clone, Default)]
pub struct MockControlPlane {
    pods: Arc<RwLock<HashMap<String, Pod>>>,
    jobs: Arc<RwLock<HashMap<String, Job>>>,
    pod_script: Arc<RwLock<HashMap<String, VecDeque<PodStatus>>>>,
    job_script: Arc<RwLock<HashMap<String, VecDeque<JobStatus>>>>,
    exec_responses: Arc<RwLock<VecDeque<ExecCapture>>>,
    exec_calls: Arc<RwLock<Vec<ExecCall>>>,
    call_count: Arc<RwLock<HashMap<String, usize>>>,
    failures: Arc<RwLock<HashMap<String, usize>>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_pod(&self, name: &str, statuses: Vec<PodStatus>) {
        self.pod_script
            .write()
            .await
            .insert(name.to_string(), statuses.into());
    }

    pub async fn script_job(&self, name: &str, statuses: Vec<JobStatus>) {
        self.job_script
            .write()
            .await
            .insert(name.to_string(), statuses.into());
    }

    pub async fn push_exec_response(&self, capture: ExecCapture) {
        self.exec_responses.write().await.push_back(capture);
    }

    pub async fn set_should_fail(&self, operation: &str, should_fail: bool) {
        let mut failures = self.failures.write().await;
        if should_fail {
            failures.insert(operation.to_string(), usize::MAX);
        } else {
            failures.remove(operation);
        }
    }

    /// Fail the next `times` calls of `operation`.
    pub async fn fail_times(&self, operation: &str, times: usize) {
        self.failures
            .write()
            .await
            .insert(operation.to_string(), times);
    }

    pub async fn get_call_count(&self, operation: &str) -> usize {
        self.call_count
            .read()
            .await
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub async fn exec_calls(&self) -> Vec<ExecCall> {
        self.exec_calls.read().await.clone()
    }

    pub async fn created_pod(&self, name: &str) -> Option<Pod> {
        self.pods.read().await.get(name).cloned()
    }

    pub async fn created_job(&self, name: &str) -> Option<Job> {
        self.jobs.read().await.get(name).cloned()
    }

    pub async fn reset(&self) {
        self.pods.write().await.clear();
        self.jobs.write().await.clear();
        self.pod_script.write().await.clear();
        self.job_script.write().await.clear();
        self.exec_responses.write().await.clear();
        self.exec_calls.write().await.clear();
        self.call_count.write().await.clear();
        self.failures.write().await.clear();
    }

    /// Count the call and report whether it should fail.
    async fn record(&self, operation: &str) -> bool {
        *self
            .call_count
            .write()
            .await
            .entry(operation.to_string())
            .or_insert(0) += 1;

        let mut failures = self.failures.write().await;
        match failures.get_mut(operation) {
            Some(0) | None => false,
            Some(remaining) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                true
            }
        }
    }

    async fn next_pod_status(&self, name: &str) -> Option<PodStatus> {
        let mut scripts = self.pod_script.write().await;
        let script = scripts.get_mut(name)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }

    async fn next_job_status(&self, name: &str) -> Option<JobStatus> {
        let mut scripts = self.job_script.write().await;
        let script = scripts.get_mut(name)?;
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn create_pod(&self, _namespace: &str, pod: &Pod) -> Result<Pod> {
        let name = pod.metadata.name.clone().unwrap_or_default();
        if self.record(CREATE_POD).await {
            return Err(WorkloadError::Submission {
                kind: "pod",
                name,
                message: "admission webhook denied the request".to_string(),
            });
        }

        let mut created = pod.clone();
        created.status = Some(PodStatus {
            phase: Some("Pending".to_string()),
            ..Default::default()
        });
        self.pods.write().await.insert(name, created.clone());
        Ok(created)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        if self.record(GET_POD).await {
            return Err(WorkloadError::Read(format!("get pod {}/{}: connection reset", namespace, name)));
        }

        let mut pod = self
            .pods
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| WorkloadError::Read(format!("pods \"{}\" not found", name)))?;
        if let Some(status) = self.next_pod_status(name).await {
            pod.status = Some(status);
        }
        Ok(pod)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        if self.record(DELETE_POD).await {
            return Err(WorkloadError::Deletion(format!("delete pod {}/{}: forbidden", namespace, name)));
        }
        self.pods.write().await.remove(name);
        Ok(())
    }

    async fn create_job(&self, _namespace: &str, job: &Job) -> Result<Job> {
        let name = job.metadata.name.clone().unwrap_or_default();
        if self.record(CREATE_JOB).await {
            return Err(WorkloadError::Submission {
                kind: "job",
                name,
                message: "quota exceeded".to_string(),
            });
        }

        self.jobs.write().await.insert(name, job.clone());
        Ok(job.clone())
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        if self.record(GET_JOB).await {
            return Err(WorkloadError::Read(format!("get job {}/{}: connection reset", namespace, name)));
        }

        let mut job = self
            .jobs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| WorkloadError::Read(format!("jobs.batch \"{}\" not found", name)))?;
        if let Some(status) = self.next_job_status(name).await {
            job.status = Some(status);
        }
        Ok(job)
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        if self.record(DELETE_JOB).await {
            return Err(WorkloadError::Deletion(format!("delete job {}/{}: forbidden", namespace, name)));
        }
        self.jobs.write().await.remove(name);
        Ok(())
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<ExecCapture> {
        self.exec_calls.write().await.push(ExecCall {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            command,
        });
        if self.record(EXEC).await {
            return Err(WorkloadError::RemoteCommand(format!(
                "failed to open exec stream to {}/{}",
                namespace, pod
            )));
        }

        Ok(self
            .exec_responses
            .write()
            .await
            .pop_front()
            .unwrap_or(ExecCapture {
                stdout: String::new(),
                stderr: String::new(),
                exit: RemoteExit::Success,
            }))
    }

    async fn check_connectivity(&self) -> Result<String> {
        Ok("v1.32.0".to_string())
    }
}
