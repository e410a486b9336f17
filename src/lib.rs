//! nfs-workload - pod and job lifecycle on Kubernetes with NFS-backed storage
//!
//! This library builds pod and job specs whose volumes come from a single
//! NFS export, submits them, watches them until they run or finish, runs
//! commands inside them and deletes them again.

pub mod client;
pub mod config;
pub mod error;
pub mod exec;
pub mod lifecycle;
pub mod naming;
pub mod workload;

// Re-export commonly used types
pub use client::{ControlPlane, KubeControlPlane};
pub use config::{ConfigLoader, PollWindow, WorkloadConfig};
pub use error::{BestEffort, Result, WorkloadError};
pub use exec::{ExecCapture, ExecChannel, RemoteExit};
pub use lifecycle::{
    CallbackPodRequest, LifecycleStatus, StartedPod, TerminalCallback, TerminalReport,
    WorkloadController, WorkloadSnapshot,
};
pub use naming::encode_name;
pub use workload::{WorkloadBuilder, WorkloadKind, WorkloadOptions, WorkloadRef, WorkloadSpec};
