use std::time::Duration;

use tracing::warn;

#[derive(thiserror::Error, Debug, Clone)]
pub enum WorkloadError {
    #[error("Failed to submit {kind} {name}: {message}")]
    Submission {
        kind: &'static str,
        name: String,
        message: String,
    },

    #[error("Failed to read workload state: {0}")]
    Read(String),

    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("Wait cancelled: {0}")]
    Cancelled(String),

    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    #[error("Failed to delete workload: {0}")]
    Deletion(String),

    #[error("{namespace}/{name} is already managed by this process")]
    AlreadyManaged { namespace: String, name: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Kubernetes client error: {0}")]
    Client(String),
}

impl WorkloadError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkloadError::Timeout { .. })
    }
}

impl From<std::io::Error> for WorkloadError {
    fn from(err: std::io::Error) -> Self {
        WorkloadError::Config(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for WorkloadError {
    fn from(err: serde_json::Error) -> Self {
        WorkloadError::Config(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for WorkloadError {
    fn from(err: serde_yaml::Error) -> Self {
        WorkloadError::Config(format!("YAML error: {}", err))
    }
}

impl From<kube::Error> for WorkloadError {
    fn from(err: kube::Error) -> Self {
        WorkloadError::Client(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Outcome of a call whose failure is downgraded instead of propagated.
///
/// `value` is what the caller acts on; `suppressed` keeps the error that was
/// swallowed so tests and diagnostics can still see it.
#[derive(Debug, Clone)]
#[must_use]
pub struct BestEffort<T> {
    pub value: T,
    pub suppressed: Option<WorkloadError>,
}

impl<T> BestEffort<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            suppressed: None,
        }
    }

    pub fn degraded(value: T, error: WorkloadError) -> Self {
        Self {
            value,
            suppressed: Some(error),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.suppressed.is_none()
    }

    /// Restore the suppressed error, if any.
    pub fn into_result(self) -> Result<T> {
        match self.suppressed {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

impl<T: Default> BestEffort<T> {
    /// Collapse a result, logging and keeping the error instead of returning it.
    pub fn from_result(result: Result<T>, context: &str) -> Self {
        match result {
            Ok(value) => Self::clean(value),
            Err(err) => {
                warn!(error = %err, "{} failed; continuing", context);
                Self::degraded(T::default(), err)
            }
        }
    }
}
