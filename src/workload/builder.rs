//! Workload specifications for the two kinds of workloads we run: the
//! run-and-exit analysis job and the long-lived callback pod.

use std::collections::BTreeMap;

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, LocalObjectReference, Pod, PodSpec, PodTemplateSpec, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use tracing::debug;
use uuid::Uuid;

use super::options::WorkloadOptions;
use super::volumes::{build_volumes, nfs_volume};
use super::WorkloadSpec;
use crate::config::WorkloadConfig;

pub const ANALYSIS_IMAGE: &str = "autoharness";
pub const CALLBACK_IMAGE: &str = "callback-a";

/// CPU upper bound applied to every callback pod, whatever the options say.
pub const CPU_LIMIT: &str = "2000m";

/// Completed analysis jobs are garbage collected after this many seconds.
pub const ANALYSIS_JOB_TTL_SECONDS: i32 = 10;

const ANALYSIS_COMMAND: &str = "python3 /opt/631/python/main.py /src/prototype.json";
const ANALYSIS_VOLUME: &str = "prototype-volume";
const ANALYSIS_MOUNT: &str = "/src";
const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";

/// Builds workload specs from configuration and caller options. Never fails
/// and performs no I/O.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadBuilder<'a> {
    config: &'a WorkloadConfig,
}

impl<'a> WorkloadBuilder<'a> {
    pub fn new(config: &'a WorkloadConfig) -> Self {
        Self { config }
    }

    /// Analysis job with a fresh `autoharness-xxxxxxxx` name.
    pub fn analysis_job(&self, rel_path: &str) -> WorkloadSpec {
        let suffix = Uuid::new_v4().simple().to_string();
        let name = format!("{}-{}", ANALYSIS_IMAGE, &suffix[..8]);
        self.analysis_job_named(&name, rel_path)
    }

    /// Analysis job reading `prototype.json` from `rel_path` on the export,
    /// mounted at `/src`.
    pub fn analysis_job_named(&self, name: &str, rel_path: &str) -> WorkloadSpec {
        let (mount, volume) = nfs_volume(
            &self.config.nfs,
            ANALYSIS_VOLUME.to_string(),
            rel_path,
            ANALYSIS_MOUNT,
        );
        debug!(
            job = name,
            path = ?volume.nfs.as_ref().map(|nfs| nfs.path.as_str()),
            "analysis job mount path"
        );

        let container = Container {
            name: name.to_string(),
            image: Some(self.config.image(ANALYSIS_IMAGE)),
            image_pull_policy: Some(PULL_IF_NOT_PRESENT.to_string()),
            command: Some(vec![
                "/bin/sh".to_string(),
                "-c".to_string(),
                ANALYSIS_COMMAND.to_string(),
            ]),
            volume_mounts: Some(vec![mount]),
            ..Default::default()
        };

        let job = Job {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.config.namespace.clone()),
                labels: Some(app_label(ANALYSIS_IMAGE)),
                ..Default::default()
            },
            spec: Some(JobSpec {
                ttl_seconds_after_finished: Some(ANALYSIS_JOB_TTL_SECONDS),
                template: PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        image_pull_secrets: self.pull_secrets(),
                        containers: vec![container],
                        volumes: Some(vec![volume]),
                        restart_policy: Some("Never".to_string()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        WorkloadSpec::Job(Box::new(job))
    }

    /// Long-lived callback pod running `command`, with `bind_paths` mapped to
    /// NFS volumes. The single container shares the pod's name.
    pub fn callback_pod<S: AsRef<str>>(
        &self,
        name: &str,
        command: Vec<String>,
        options: &WorkloadOptions,
        bind_paths: &[S],
    ) -> WorkloadSpec {
        options.log_reserved();

        let env = options.env_vars();
        let (volume_mounts, volumes) = build_volumes(&self.config.nfs, bind_paths);

        let container = Container {
            name: name.to_string(),
            image: Some(self.config.image(CALLBACK_IMAGE)),
            image_pull_policy: Some(PULL_IF_NOT_PRESENT.to_string()),
            env: (!env.is_empty()).then_some(env),
            command: (!command.is_empty()).then_some(command),
            volume_mounts: (!volume_mounts.is_empty()).then_some(volume_mounts),
            resources: Some(resource_limits(options)),
            ..Default::default()
        };

        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.config.namespace.clone()),
                labels: Some(app_label("callback")),
                ..Default::default()
            },
            spec: Some(PodSpec {
                image_pull_secrets: self.pull_secrets(),
                containers: vec![container],
                volumes: (!volumes.is_empty()).then_some(volumes),
                restart_policy: Some("Always".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        WorkloadSpec::Pod(Box::new(pod))
    }

    fn pull_secrets(&self) -> Option<Vec<LocalObjectReference>> {
        self.config.image_pull_secret.as_ref().map(|secret| {
            vec![LocalObjectReference {
                name: secret.clone(),
            }]
        })
    }
}

/// Limits only: CPU is always capped, memory when the option parses.
/// Nothing is requested.
pub fn resource_limits(options: &WorkloadOptions) -> ResourceRequirements {
    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity(CPU_LIMIT.to_string()));
    if let Some(memory) = options.memory_limit() {
        limits.insert("memory".to_string(), Quantity(memory.to_string()));
    }

    ResourceRequirements {
        limits: Some(limits),
        requests: None,
        ..Default::default()
    }
}

fn app_label(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}
