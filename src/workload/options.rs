//! Caller-supplied container options.
//!
//! Only `env` and `memory` shape the built workload today. The other keys are
//! accepted so harness payloads deserialize, and are otherwise ignored.

use k8s_openapi::api::core::v1::EnvVar;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const OPTION_WORKING_DIR: &str = "workingDir";
pub const OPTION_ENV: &str = "env";
pub const OPTION_CPUSET: &str = "cpuset";
pub const OPTION_PORTS: &str = "ports";
pub const OPTION_MEMORY_LIMIT: &str = "memory";
pub const OPTION_ADD_DNS: &str = "dns";
pub const OPTION_NETWORK: &str = "network";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkloadOptions {
    #[serde(rename = "workingDir", default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// `KEY=VALUE` entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpuset: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    /// Memory upper bound, e.g. `512Mi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl WorkloadOptions {
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    pub fn with_memory(mut self, limit: impl Into<String>) -> Self {
        self.memory = Some(limit.into());
        self
    }

    /// Environment variables from the well-formed `env` entries.
    pub fn env_vars(&self) -> Vec<EnvVar> {
        self.env.iter().filter_map(|entry| parse_env(entry)).collect()
    }

    /// Memory limit, when present and a valid quantity.
    pub fn memory_limit(&self) -> Option<&str> {
        let memory = self.memory.as_deref()?.trim();
        if is_quantity(memory) {
            Some(memory)
        } else {
            debug!(memory, "ignoring unparseable memory limit");
            None
        }
    }

    pub(crate) fn log_reserved(&self) {
        let reserved = [
            (OPTION_WORKING_DIR, self.working_dir.is_some()),
            (OPTION_CPUSET, self.cpuset.is_some()),
            (OPTION_PORTS, !self.ports.is_empty()),
            (OPTION_ADD_DNS, self.dns.is_some()),
            (OPTION_NETWORK, self.network.is_some()),
        ];
        for (key, set) in reserved {
            if set {
                debug!(option = key, "option is reserved and has no effect");
            }
        }
    }
}

/// `KEY=VALUE` with exactly one `=` and a non-empty key.
fn parse_env(entry: &str) -> Option<EnvVar> {
    let mut parts = entry.split('=');
    let (name, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(value), None) if !name.is_empty() => (name, value),
        _ => {
            debug!(entry, "skipping malformed env entry");
            return None;
        }
    };

    Some(EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        value_from: None,
    })
}

/// Loose check for a Kubernetes resource quantity such as `512Mi`, `1.5G`
/// or `1e3`.
fn is_quantity(s: &str) -> bool {
    let s = s.strip_prefix('+').unwrap_or(s);
    let number_end = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(number_end);

    let valid_number = !number.is_empty()
        && number != "."
        && number.matches('.').count() <= 1;
    if !valid_number {
        return false;
    }

    match suffix {
        "" | "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" | "n" | "u" | "m" | "k" | "M" | "G" | "T"
        | "P" | "E" => true,
        exp => exp
            .strip_prefix(['e', 'E'])
            .map(|rest| rest.strip_prefix(['+', '-']).unwrap_or(rest))
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parsing_skips_malformed() {
        let options = WorkloadOptions {
            env: vec![
                "RUST_LOG=debug".to_string(),
                "MISSING_EQUALS".to_string(),
                "A=b=c".to_string(),
                "=orphan".to_string(),
                "EMPTY=".to_string(),
            ],
            ..Default::default()
        };

        let vars = options.env_vars();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].name, "RUST_LOG");
        assert_eq!(vars[0].value.as_deref(), Some("debug"));
        assert_eq!(vars[1].name, "EMPTY");
        assert_eq!(vars[1].value.as_deref(), Some(""));
    }

    #[test]
    fn test_memory_limit_validation() {
        for good in ["512Mi", "1Gi", "1.5G", "100", "1e3", "2E+2"] {
            let options = WorkloadOptions::default().with_memory(good);
            assert_eq!(options.memory_limit(), Some(good), "{good}");
        }
        for bad in ["", "lots", "1..5Gi", "12XB", "Mi", "1e"] {
            let options = WorkloadOptions::default().with_memory(bad);
            assert_eq!(options.memory_limit(), None, "{bad}");
        }
        assert_eq!(WorkloadOptions::default().memory_limit(), None);
    }

    #[test]
    fn test_deserializes_option_keys() {
        let options: WorkloadOptions = serde_json::from_str(
            r#"{"workingDir": "/src", "env": ["A=1"], "memory": "1Gi", "dns": true, "ports": ["80"]}"#,
        )
        .unwrap();

        assert_eq!(options.working_dir.as_deref(), Some("/src"));
        assert_eq!(options.memory.as_deref(), Some("1Gi"));
        assert_eq!(options.dns, Some(true));
        assert_eq!(options.ports, vec!["80".to_string()]);
        assert_eq!(options.env_vars().len(), 1);
    }
}
