//! Control-plane access: workload CRUD, status reads and exec.
//!
//! Everything above this layer talks to a [`ControlPlane`] handle passed in
//! at construction, so tests can substitute an in-memory cluster.

mod cluster;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;

use crate::error::Result;
use crate::exec::ExecCapture;

pub use cluster::KubeControlPlane;

/// Operations the lifecycle controller and exec channel need from the
/// cluster, keyed by (namespace, name).
///
/// Implementations map failures onto the matching [`WorkloadError`]
/// variant: creates to `Submission`, reads to `Read`, deletes to `Deletion`
/// and exec to `RemoteCommand`.
///
/// [`WorkloadError`]: crate::error::WorkloadError
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod>;

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod>;

    /// Delete with background propagation; does not wait for dependents.
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<()>;

    async fn create_job(&self, namespace: &str, job: &Job) -> Result<Job>;

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job>;

    /// Delete with background propagation; does not wait for dependents.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<()>;

    /// Run `command` in `container` of `pod` with stdin, stdout and stderr
    /// attached, returning once the remote process exits.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: Vec<String>,
    ) -> Result<ExecCapture>;

    /// API server version, as a reachability probe.
    async fn check_connectivity(&self) -> Result<String>;
}
