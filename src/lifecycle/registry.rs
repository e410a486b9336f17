use std::sync::Arc;

use dashmap::DashSet;

use crate::error::{Result, WorkloadError};
use crate::workload::{WorkloadKind, WorkloadRef};

type Key = (WorkloadKind, String, String);

/// Workloads this process is currently managing. A second claim on the same
/// (kind, namespace, name) fails fast instead of racing the first.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    claimed: Arc<DashSet<Key>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, target: &WorkloadRef) -> Result<()> {
        if self.claimed.insert(key(target)) {
            Ok(())
        } else {
            Err(WorkloadError::AlreadyManaged {
                namespace: target.namespace.clone(),
                name: target.name.clone(),
            })
        }
    }

    /// Returns whether `target` was claimed.
    pub fn release(&self, target: &WorkloadRef) -> bool {
        self.claimed.remove(&key(target)).is_some()
    }

    pub fn is_managed(&self, target: &WorkloadRef) -> bool {
        self.claimed.contains(&key(target))
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

fn key(target: &WorkloadRef) -> Key {
    (target.kind, target.namespace.clone(), target.name.clone())
}
