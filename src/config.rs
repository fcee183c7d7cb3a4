//! Admission configuration.
//!
//! Every default the engine applies (queue names, scheduler candidates, task
//! prefixes, companion plugins) is read from an [`AdmissionConfig`] passed
//! into each entry point. Nothing is held in process-wide state, so callers
//! and tests can vary configuration per request.
//!
//! Example (JSON, all fields optional):
//! ```json
//! {
//!   "defaultQueue": "default",
//!   "schedulerNames": ["volcano"],
//!   "defaultTaskPrefix": "default",
//!   "protectedQueues": ["default", "root"]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default queue assigned to Jobs and used as the PodGroup sentinel
pub const DEFAULT_QUEUE: &str = "default";

/// Name of the root queue of the hierarchy
pub const ROOT_QUEUE: &str = "root";

/// Default scheduler name
pub const DEFAULT_SCHEDULER_NAME: &str = "volcano";

/// Prefix for generated task names (`default0`, `default1`, ...)
pub const DEFAULT_TASK_PREFIX: &str = "default";

/// Default retry budget for jobs and tasks
pub const DEFAULT_MAX_RETRY: i32 = 3;

/// Configuration for validators and mutators
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdmissionConfig {
    /// Queue assigned to jobs that do not name one.
    /// Also the PodGroup "unresolved" sentinel.
    pub default_queue: String,

    /// Name of the root queue; jobs may not be submitted to it.
    pub root_queue: String,

    /// Candidate scheduler names, in preference order.
    /// Pods whose schedulerName is listed here are scheduler-managed.
    pub scheduler_names: Vec<String>,

    /// Prefix for generated task names
    pub default_task_prefix: String,

    /// Retry budget applied when maxRetry is unset
    pub default_max_retry: i32,

    /// Queues that can never be deleted
    pub protected_queues: Vec<String>,

    /// Distributed-framework plugins that need the service plugin
    pub framework_plugins: Vec<String>,

    /// Service-discovery plugin injected for framework plugins
    pub service_plugin: String,

    /// MPI plugin, which additionally needs the remote-shell plugin
    pub mpi_plugin: String,

    /// Remote-shell plugin injected for MPI jobs
    pub ssh_plugin: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            default_queue: DEFAULT_QUEUE.to_string(),
            root_queue: ROOT_QUEUE.to_string(),
            scheduler_names: vec![DEFAULT_SCHEDULER_NAME.to_string()],
            default_task_prefix: DEFAULT_TASK_PREFIX.to_string(),
            default_max_retry: DEFAULT_MAX_RETRY,
            protected_queues: vec![DEFAULT_QUEUE.to_string(), ROOT_QUEUE.to_string()],
            framework_plugins: vec![
                "tensorflow".to_string(),
                "mpi".to_string(),
                "pytorch".to_string(),
            ],
            service_plugin: "svc".to_string(),
            mpi_plugin: "mpi".to_string(),
            ssh_plugin: "ssh".to_string(),
        }
    }
}

impl AdmissionConfig {
    /// Parse configuration from JSON, filling omitted fields with defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: AdmissionConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive the defaulter
    pub fn validate(&self) -> Result<()> {
        if self.default_queue.is_empty() {
            return Err(Error::InvalidConfig(
                "defaultQueue must not be empty".to_string(),
            ));
        }
        if self.scheduler_names.is_empty() {
            return Err(Error::InvalidConfig(
                "schedulerNames must contain at least one scheduler".to_string(),
            ));
        }
        if self.default_max_retry < 0 {
            return Err(Error::InvalidConfig(format!(
                "defaultMaxRetry must not be negative (got {})",
                self.default_max_retry
            )));
        }
        Ok(())
    }

    /// Whether a queue name is protected from deletion
    pub fn is_protected_queue(&self, name: &str) -> bool {
        self.protected_queues.iter().any(|q| q == name)
    }

    /// Whether a pod with this scheduler name is managed by the scheduler
    pub fn manages_scheduler(&self, scheduler_name: &str) -> bool {
        self.scheduler_names.iter().any(|s| s == scheduler_name)
    }
}
