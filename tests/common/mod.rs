#![allow(dead_code)]

use std::sync::Arc;

use nfs_workload::WorkloadController;

// Test utilities and common setup
pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Controller wired to a fresh mock cluster.
pub struct TestEnvironment {
    pub cluster: MockControlPlane,
    pub controller: WorkloadController,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let cluster = MockControlPlane::new();
        let controller = WorkloadController::new(Arc::new(cluster.clone()), test_config());
        Self {
            cluster,
            controller,
        }
    }
}
