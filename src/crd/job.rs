//! Job Custom Resource Definition.
//!
//! A Job is a gang of tasks scheduled together. Each task is a replicated
//! pod template; `minAvailable` is the number of pods that must be placed
//! together for the job to start.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Job is a batch workload made of one or more tasks.
///
/// Example:
/// ```yaml
/// apiVersion: batch.volcano.sh/v1alpha1
/// kind: Job
/// metadata:
///   name: tf-training
/// spec:
///   queue: default
///   plugins:
///     tensorflow: []
///   tasks:
///     - name: ps
///       replicas: 1
///       template: { ... }
///     - name: worker
///       replicas: 4
///       template: { ... }
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "batch.volcano.sh",
    version = "v1alpha1",
    kind = "Job",
    plural = "jobs",
    shortname = "vcjob",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"Queue", "type":"string", "jsonPath":".spec.queue"}"#,
    printcolumn = r#"{"name":"MinAvailable", "type":"integer", "jsonPath":".spec.minAvailable"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Scheduler responsible for the job's pods.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheduler_name: String,

    /// Minimum number of pods that must run concurrently.
    /// Zero means "unset" and is filled in by the defaulter.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub min_available: i32,

    /// Tasks making up the job.
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,

    /// Job-level lifecycle policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<LifecyclePolicy>,

    /// Job plugins and their arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, Vec<String>>,

    /// Queue the job is submitted to.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub queue: String,

    /// Number of retries before the job is marked failed.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_retry: i32,

    /// Seconds to keep a finished job before garbage collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<i32>,

    /// Priority class of the job's pod group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,

    /// Minimum number of succeeded pods for the job to be considered complete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_success: Option<i32>,
}

/// A replicated pod template inside a Job.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    /// Task name, unique within the job. Empty means "generate one".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Number of pods for this task.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub replicas: i32,

    /// Minimum available pods for this task. Defaults to `replicas`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_available: Option<i32>,

    /// Pod template for the task's pods.
    #[serde(default)]
    pub template: PodTemplateSpec,

    /// Task-level lifecycle policies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<LifecyclePolicy>,

    /// Retry budget for the task. Zero means "unset".
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_retry: i32,

    /// Tasks that must be ready before this task starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependsOn>,
}

impl TaskSpec {
    /// Task minAvailable with the replicas fallback applied
    pub fn effective_min_available(&self) -> i32 {
        self.min_available.unwrap_or(self.replicas)
    }

    /// Names of the tasks this task depends on
    pub fn dependencies(&self) -> &[String] {
        self.depends_on
            .as_ref()
            .map(|d| d.name.as_slice())
            .unwrap_or_default()
    }
}

/// Task dependency declaration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DependsOn {
    /// Names of tasks in the same job.
    #[serde(default)]
    pub name: Vec<String>,

    /// Whether any or all of the named tasks must be ready.
    #[serde(default)]
    pub iteration: Iteration,
}

/// Dependency iteration mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Iteration {
    /// Start once any dependency is ready
    Any,
    /// Start once all dependencies are ready
    #[default]
    All,
}

/// Event → action rule applied over the job lifecycle
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecyclePolicy {
    /// Action taken when the policy matches.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    /// Single triggering event.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event: String,

    /// Triggering events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,

    /// Container exit code that triggers the policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Delay before the action is taken, e.g. "30s".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl LifecyclePolicy {
    /// All events named by this policy (`event` and `events` combined)
    pub fn all_events(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.event.as_str())
            .filter(|e| !e.is_empty())
            .chain(self.events.iter().map(String::as_str))
    }
}

/// Event matching any other event
pub const ANY_EVENT: &str = "*";

/// Lifecycle events a policy may react to
pub const LIFECYCLE_EVENTS: &[&str] = &[
    ANY_EVENT,
    "PodFailed",
    "PodEvicted",
    "PodPending",
    "PodRunning",
    "Unknown",
    "TaskCompleted",
    "TaskFailed",
    "OutOfSync",
    "CommandIssued",
    "JobUpdated",
];

/// Actions a lifecycle policy may take
pub const LIFECYCLE_ACTIONS: &[&str] = &[
    "AbortJob",
    "RestartJob",
    "RestartTask",
    "RestartPod",
    "TerminateJob",
    "CompleteJob",
    "ResumeJob",
    "SyncJob",
    "EnqueueJob",
];

/// Sum of task replicas, saturating on overflow
pub fn total_replicas(spec: &JobSpec) -> i32 {
    spec.tasks
        .iter()
        .fold(0i32, |acc, task| acc.saturating_add(task.replicas.max(0)))
}

pub(crate) fn is_zero(value: &i32) -> bool {
    *value == 0
}
