//! Classifying observed pod and job state as terminal or still in progress.

use std::fmt;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};

/// Waiting reason the kubelet reports while backing off a crashing container.
pub const CRASH_LOOP_REASON: &str = "CrashLoopBackOff";

const CONDITION_TRUE: &str = "True";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    CrashLooping,
    Unknown,
}

impl LifecycleStatus {
    /// Map a pod phase string.
    pub fn from_phase(phase: Option<&str>) -> Self {
        match phase {
            Some("Pending") => LifecycleStatus::Pending,
            Some("Running") => LifecycleStatus::Running,
            Some("Succeeded") => LifecycleStatus::Succeeded,
            Some("Failed") => LifecycleStatus::Failed,
            _ => LifecycleStatus::Unknown,
        }
    }

    /// No further progress without outside intervention.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleStatus::Succeeded | LifecycleStatus::Failed | LifecycleStatus::CrashLooping
        )
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleStatus::Pending => "Pending",
            LifecycleStatus::Running => "Running",
            LifecycleStatus::Succeeded => "Succeeded",
            LifecycleStatus::Failed => "Failed",
            LifecycleStatus::CrashLooping => "CrashLoopBackOff",
            LifecycleStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// One poll tick's reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    pub terminal: bool,
    pub status: LifecycleStatus,
}

impl PollOutcome {
    fn of(status: LifecycleStatus) -> Self {
        Self {
            terminal: status.is_terminal(),
            status,
        }
    }
}

/// A pod is terminal once its phase is Succeeded/Failed or its primary
/// container is crash-looping, whatever the phase says.
pub fn classify_pod(pod: &Pod, container: &str) -> PollOutcome {
    let status = pod.status.as_ref();
    let phase = LifecycleStatus::from_phase(status.and_then(|s| s.phase.as_deref()));

    let container_statuses = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();
    let primary = container_statuses
        .iter()
        .find(|c| c.name == container)
        .or_else(|| container_statuses.first());

    let crash_looping = primary
        .and_then(|c| c.state.as_ref())
        .and_then(|state| state.waiting.as_ref())
        .and_then(|waiting| waiting.reason.as_deref())
        == Some(CRASH_LOOP_REASON);

    if crash_looping {
        PollOutcome::of(LifecycleStatus::CrashLooping)
    } else {
        PollOutcome::of(phase)
    }
}

/// A job is terminal once its Complete or Failed condition is true.
pub fn classify_job(job: &Job) -> PollOutcome {
    let Some(status) = job.status.as_ref() else {
        return PollOutcome::of(LifecycleStatus::Pending);
    };

    let condition_true = |kind: &str| {
        status
            .conditions
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == kind && c.status == CONDITION_TRUE)
    };

    if condition_true("Complete") {
        PollOutcome::of(LifecycleStatus::Succeeded)
    } else if condition_true("Failed") {
        PollOutcome::of(LifecycleStatus::Failed)
    } else if status.active.unwrap_or(0) > 0 {
        PollOutcome::of(LifecycleStatus::Running)
    } else {
        PollOutcome::of(LifecycleStatus::Pending)
    }
}
