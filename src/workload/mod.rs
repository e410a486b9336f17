//! Workload specifications and identities.

pub mod builder;
pub mod options;
pub mod volumes;

use std::fmt;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;

pub use builder::WorkloadBuilder;
pub use options::WorkloadOptions;
pub use volumes::build_volumes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Pod,
    Job,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Pod => "pod",
            WorkloadKind::Job => "job",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ready-to-submit pod or job. Built once, consumed by submission.
#[derive(Debug, Clone)]
pub enum WorkloadSpec {
    Pod(Box<Pod>),
    Job(Box<Job>),
}

impl WorkloadSpec {
    pub fn kind(&self) -> WorkloadKind {
        match self {
            WorkloadSpec::Pod(_) => WorkloadKind::Pod,
            WorkloadSpec::Job(_) => WorkloadKind::Job,
        }
    }

    pub fn name(&self) -> &str {
        let meta = match self {
            WorkloadSpec::Pod(pod) => &pod.metadata,
            WorkloadSpec::Job(job) => &job.metadata,
        };
        meta.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        let meta = match self {
            WorkloadSpec::Pod(pod) => &pod.metadata,
            WorkloadSpec::Job(job) => &job.metadata,
        };
        meta.namespace.as_deref()
    }

    /// Name of the first container, the one status checks and exec target.
    pub fn primary_container(&self) -> Option<&str> {
        let spec = match self {
            WorkloadSpec::Pod(pod) => pod.spec.as_ref(),
            WorkloadSpec::Job(job) => job.spec.as_ref().and_then(|s| s.template.spec.as_ref()),
        };
        spec.and_then(|s| s.containers.first())
            .map(|c| c.name.as_str())
    }

    /// Identity of this spec once submitted to `default_namespace` (unless
    /// the spec names its own).
    pub fn reference(&self, default_namespace: &str) -> WorkloadRef {
        WorkloadRef {
            kind: self.kind(),
            namespace: self.namespace().unwrap_or(default_namespace).to_string(),
            name: self.name().to_string(),
            container: self.primary_container().map(str::to_string),
        }
    }
}

/// Identity of a submitted workload. (kind, namespace, name) is what a single
/// controller claims while managing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadRef {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
    pub container: Option<String>,
}

impl WorkloadRef {
    pub fn pod(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::Pod,
            namespace: namespace.into(),
            name: name.into(),
            container: None,
        }
    }

    pub fn job(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: WorkloadKind::Job,
            namespace: namespace.into(),
            name: name.into(),
            container: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Container to inspect and exec into; callback pods name theirs after
    /// the pod.
    pub fn primary_container(&self) -> &str {
        self.container.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}
