use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, WorkloadError};

/// Environment variable naming an optional YAML or JSON config file.
pub const CONFIG_FILE_ENV: &str = "NFS_WORKLOAD_CONFIG";

/// Cluster, storage and polling settings, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// API server URL; overrides the one from kubeconfig when set
    pub master_url: Option<String>,
    /// Path to a kubeconfig file; in-cluster/inferred config when unset
    pub kube_config: Option<String>,
    pub nfs: NfsExport,
    /// Registry host prefixed onto image names
    pub registry: String,
    pub image_pull_secret: Option<String>,
    pub namespace: String,
    pub poll: PollConfig,
}

/// An NFS export that workload volumes are carved out of.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NfsExport {
    pub server: String,
    pub path: String,
}

/// Poll interval and overall deadline for one kind of wait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollWindow {
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
}

impl PollWindow {
    pub const fn new(interval_seconds: u64, timeout_seconds: u64) -> Self {
        Self {
            interval_seconds,
            timeout_seconds,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    /// Pod until phase Running
    pub running: PollWindow,
    /// Long-lived pod until terminal
    pub terminal: PollWindow,
    /// Job until complete
    pub job: PollWindow,
    /// Prebuilt pod until terminal
    pub spec_pod: PollWindow,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            running: PollWindow::new(1, 60),
            terminal: PollWindow::new(5, 300),
            job: PollWindow::new(1, 300),
            spec_pod: PollWindow::new(1, 30),
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            master_url: None,
            kube_config: None,
            nfs: NfsExport::default(),
            registry: String::new(),
            image_pull_secret: None,
            namespace: "default".to_string(),
            poll: PollConfig::default(),
        }
    }
}

impl WorkloadConfig {
    /// Full image reference for `image` under the configured registry.
    pub fn image(&self, image: &str) -> String {
        format!("{}/{}", self.registry.trim_end_matches('/'), image)
    }
}

/// Loads [`WorkloadConfig`]: defaults, then an optional file, then `K8S_*`
/// environment overrides, then validation.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(path: impl Into<String>) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load from the process environment.
    pub async fn load(&self) -> Result<WorkloadConfig> {
        let path = self
            .config_path
            .clone()
            .or_else(|| std::env::var(CONFIG_FILE_ENV).ok());
        self.load_with(path.as_deref(), |key| std::env::var(key).ok())
            .await
    }

    /// Load with an explicit file path and environment lookup.
    pub async fn load_with<F>(&self, path: Option<&str>, env: F) -> Result<WorkloadConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => WorkloadConfig::default(),
        };

        Self::apply_env(&mut config, env)?;
        Self::validate(&config)?;

        info!(
            namespace = %config.namespace,
            nfs_server = %config.nfs.server,
            registry = %config.registry,
            "📋 Workload configuration loaded"
        );
        Ok(config)
    }

    async fn load_from_file(path: &str) -> Result<WorkloadConfig> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            WorkloadError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;

        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();

        let config = match extension {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(WorkloadError::Config(
                    "Config file must be .yaml, .yml, or .json".to_string(),
                ))
            }
        };

        debug!(path = path, "Configuration loaded from file");
        Ok(config)
    }

    fn apply_env<F>(config: &mut WorkloadConfig, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = env("K8S_MASTER_URL") {
            config.master_url = Some(url);
        }
        if let Some(path) = env("K8S_KUBECONFIG") {
            config.kube_config = Some(path);
        }
        if let Some(server) = env("K8S_NFS_SERVER") {
            config.nfs.server = server;
        }
        if let Some(path) = env("K8S_NFS_PATH") {
            config.nfs.path = path;
        }
        if let Some(registry) = env("K8S_REGISTRY") {
            config.registry = registry;
        }
        if let Some(secret) = env("K8S_IMAGE_PULL_SECRET") {
            config.image_pull_secret = Some(secret);
        }
        if let Some(namespace) = env("K8S_NAMESPACE") {
            config.namespace = namespace;
        }
        if let Some(timeout) = env("K8S_TERMINAL_TIMEOUT_SECONDS") {
            config.poll.terminal.timeout_seconds = timeout.parse().map_err(|e| {
                WorkloadError::Config(format!("Invalid K8S_TERMINAL_TIMEOUT_SECONDS: {}", e))
            })?;
        }

        Ok(())
    }

    pub fn validate(config: &WorkloadConfig) -> Result<()> {
        if config.namespace.trim().is_empty() {
            return Err(WorkloadError::Config("Namespace is required".to_string()));
        }
        if config.nfs.server.trim().is_empty() {
            return Err(WorkloadError::Config("NFS server is required".to_string()));
        }
        if config.registry.trim().is_empty() {
            return Err(WorkloadError::Config(
                "Image registry host is required".to_string(),
            ));
        }

        let poll = &config.poll;
        for (name, window) in [
            ("running", poll.running),
            ("terminal", poll.terminal),
            ("job", poll.job),
            ("spec_pod", poll.spec_pod),
        ] {
            if window.interval_seconds == 0 || window.timeout_seconds == 0 {
                return Err(WorkloadError::Config(format!(
                    "Poll window '{}' needs a non-zero interval and timeout",
                    name
                )));
            }
        }

        Ok(())
    }
}
