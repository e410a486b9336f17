use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{AttachParams, DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::{debug, info, warn};

use super::ControlPlane;
use crate::config::WorkloadConfig;
use crate::error::{Result, WorkloadError};
use crate::exec::{capture, ExecCapture};
use crate::workload::WorkloadKind;

/// [`ControlPlane`] backed by a live Kubernetes API server.
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
}

impl KubeControlPlane {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the kubeconfig named in `config`, falling back to
    /// the inferred (in-cluster or default kubeconfig) configuration.
    pub async fn connect(config: &WorkloadConfig) -> Result<Self> {
        let mut kube_config = match config.kube_config.as_deref() {
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    WorkloadError::Config(format!("Failed to read kubeconfig {}: {}", path, e))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .map_err(|e| {
                        WorkloadError::Config(format!("Invalid kubeconfig {}: {}", path, e))
                    })?
            }
            None => Config::infer().await.map_err(|e| {
                WorkloadError::Config(format!("Failed to infer Kubernetes config: {}", e))
            })?,
        };

        if let Some(master_url) = config.master_url.as_deref() {
            kube_config.cluster_url = master_url.parse().map_err(|e| {
                WorkloadError::Config(format!("Invalid master URL {}: {}", master_url, e))
            })?;
        }

        let client = Client::try_from(kube_config).map_err(|e| {
            WorkloadError::Client(format!("Failed to create Kubernetes client: {}", e))
        })?;

        info!(namespace = %config.namespace, "Created Kubernetes client");
        Ok(Self { client })
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn jobs(&self, namespace: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn submission_error(kind: WorkloadKind, name: &str, err: kube::Error) -> WorkloadError {
    warn!(kind = %kind, name, error = %err, "control plane rejected workload");
    WorkloadError::Submission {
        kind: kind.as_str(),
        name: name.to_string(),
        message: err.to_string(),
    }
}

fn read_error(kind: WorkloadKind, namespace: &str, name: &str, err: kube::Error) -> WorkloadError {
    WorkloadError::Read(format!("get {} {}/{}: {}", kind, namespace, name, err))
}

fn deletion_error(kind: WorkloadKind, namespace: &str, name: &str, err: kube::Error) -> WorkloadError {
    WorkloadError::Deletion(format!("delete {} {}/{}: {}", kind, namespace, name, err))
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod> {
        let name = pod.metadata.name.as_deref().unwrap_or_default();
        self.pods(namespace)
            .create(&PostParams::default(), pod)
            .await
            .map_err(|e| submission_error(WorkloadKind::Pod, name, e))
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod> {
        self.pods(namespace)
            .get(name)
            .await
            .map_err(|e| read_error(WorkloadKind::Pod, namespace, name, e))
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()> {
        self.pods(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| deletion_error(WorkloadKind::Pod, namespace, name, e))
    }

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job> {
        let name = job.metadata.name.as_deref().unwrap_or_default();
        self.jobs(namespace)
            .create(&PostParams::default(), job)
            .await
            .map_err(|e| submission_error(WorkloadKind::Job, name, e))
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job> {
        self.jobs(namespace)
            .get(name)
            .await
            .map_err(|e| read_error(WorkloadKind::Job, namespace, name, e))
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()> {
        self.jobs(namespace)
            .delete(name, &DeleteParams::background())
            .await
            .map(|_| ())
            .map_err(|e| deletion_error(WorkloadKind::Job, namespace, name, e))
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<ExecCapture> {
        debug!(pod, namespace, container, command = ?command, "opening exec stream");

        let params = AttachParams::default()
            .container(container)
            .stdin(true)
            .stdout(true)
            .stderr(true)
            .tty(false);

        let attached = self
            .pods(namespace)
            .exec(pod, command, &params)
            .await
            .map_err(|e| {
                WorkloadError::RemoteCommand(format!(
                    "failed to open exec stream to {}/{}: {}",
                    namespace, pod, e
                ))
            })?;

        capture(attached).await
    }

    async fn check_connectivity(&self) -> Result<String> {
        let version = self
            .client
            .apiserver_version()
            .await
            .map_err(|e| WorkloadError::Client(format!("Cluster is not reachable: {}", e)))?;
        debug!(version = %version.git_version, "Kubernetes cluster is accessible");
        Ok(version.git_version)
    }
}
