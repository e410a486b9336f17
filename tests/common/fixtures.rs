use k8s_openapi::api::batch::v1::{JobCondition, JobStatus};
use k8s_openapi::api::core::v1::{
    ContainerState, ContainerStateWaiting, ContainerStatus, PodStatus,
};
use nfs_workload::config::NfsExport;
use nfs_workload::{ExecCapture, RemoteExit, WorkloadConfig};

pub const NFS_SERVER: &str = "10.0.0.2";
pub const NFS_PATH: &str = "/exports/workspace";
pub const REGISTRY: &str = "registry.local:5000";

pub fn test_config() -> WorkloadConfig {
    WorkloadConfig {
        nfs: NfsExport {
            server: NFS_SERVER.to_string(),
            path: NFS_PATH.to_string(),
        },
        registry: REGISTRY.to_string(),
        image_pull_secret: Some("regcred".to_string()),
        ..Default::default()
    }
}

pub fn pod_phase(phase: &str) -> PodStatus {
    PodStatus {
        phase: Some(phase.to_string()),
        ..Default::default()
    }
}

pub fn pod_with_ip(phase: &str, ip: &str) -> PodStatus {
    PodStatus {
        pod_ip: Some(ip.to_string()),
        ..pod_phase(phase)
    }
}

pub fn crash_looping(container: &str) -> PodStatus {
    PodStatus {
        container_statuses: Some(vec![ContainerStatus {
            name: container.to_string(),
            restart_count: 4,
            state: Some(ContainerState {
                waiting: Some(ContainerStateWaiting {
                    reason: Some("CrashLoopBackOff".to_string()),
                    message: Some("back-off 40s restarting failed container".to_string()),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]),
        ..pod_phase("Running")
    }
}

pub fn job_active() -> JobStatus {
    JobStatus {
        active: Some(1),
        ..Default::default()
    }
}

pub fn job_condition(type_: &str) -> JobStatus {
    JobStatus {
        conditions: Some(vec![JobCondition {
            type_: type_.to_string(),
            status: "True".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

pub fn exec_output(stdout: &str, stderr: &str) -> ExecCapture {
    ExecCapture {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit: RemoteExit::Success,
    }
}
