//! Job defaulting.
//!
//! Every rule fires only when its target field is unset, so the defaults
//! never overwrite user values and a second pass over a defaulted job
//! yields no patches.

use kube::ResourceExt;
use serde_json::json;
use tracing::info;

use super::patch::{PatchOperation, escape_pointer_segment};
use crate::config::AdmissionConfig;
use crate::crd::{Job, JobSpec};

/// DNS policy required by pods on the host network
pub const HOST_NETWORK_DNS_POLICY: &str = "ClusterFirstWithHostNet";

/// Chooses a scheduler for jobs that do not name one
pub trait SchedulerSelector {
    fn select(&self, job: &Job, candidates: &[String]) -> Option<String>;
}

/// Picks the first configured scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCandidate;

impl SchedulerSelector for FirstCandidate {
    fn select(&self, _job: &Job, candidates: &[String]) -> Option<String> {
        candidates.first().cloned()
    }
}

/// Compute default patches using the first configured scheduler
pub fn compute_defaults(job: &Job, config: &AdmissionConfig) -> Vec<PatchOperation> {
    compute_defaults_with(job, config, &FirstCandidate)
}

/// Compute default patches with a custom scheduler selection policy
pub fn compute_defaults_with(
    job: &Job,
    config: &AdmissionConfig,
    selector: &dyn SchedulerSelector,
) -> Vec<PatchOperation> {
    let spec = &job.spec;
    let mut patches = Vec::new();

    if spec.queue.is_empty() {
        patches.push(PatchOperation::add("/spec/queue", config.default_queue.as_str()));
    }

    if spec.scheduler_name.is_empty()
        && let Some(scheduler) = selector.select(job, &config.scheduler_names)
        && !scheduler.is_empty()
    {
        patches.push(PatchOperation::add("/spec/schedulerName", scheduler));
    }

    if spec.max_retry == 0 && config.default_max_retry != 0 {
        patches.push(PatchOperation::add("/spec/maxRetry", config.default_max_retry));
    }

    if spec.min_available == 0 {
        let total = aggregate_min_available(spec);
        if total != 0 {
            patches.push(PatchOperation::add("/spec/minAvailable", total));
        }
    }

    task_defaults(spec, config, &mut patches);
    plugin_defaults(spec, config, &mut patches);

    if !patches.is_empty() {
        info!(
            job = %job.name_any(),
            patches = patches.len(),
            "Computed job defaults"
        );
    }
    patches
}

/// Sum of each task's minAvailable, falling back to its replicas
pub fn aggregate_min_available(spec: &JobSpec) -> i32 {
    spec.tasks
        .iter()
        .fold(0i32, |acc, task| acc.saturating_add(task.effective_min_available()))
}

fn task_defaults(spec: &JobSpec, config: &AdmissionConfig, patches: &mut Vec<PatchOperation>) {
    for (i, task) in spec.tasks.iter().enumerate() {
        let base = format!("/spec/tasks/{i}");

        if task.name.is_empty() {
            patches.push(PatchOperation::add(
                format!("{base}/name"),
                format!("{}{i}", config.default_task_prefix),
            ));
        }
        if task.min_available.is_none() {
            patches.push(PatchOperation::add(format!("{base}/minAvailable"), task.replicas));
        }
        if task.max_retry == 0 && config.default_max_retry != 0 {
            patches.push(PatchOperation::add(
                format!("{base}/maxRetry"),
                config.default_max_retry,
            ));
        }

        if let Some(pod_spec) = &task.template.spec
            && pod_spec.host_network == Some(true)
            && pod_spec.dns_policy.as_deref().unwrap_or_default().is_empty()
        {
            patches.push(PatchOperation::add(
                format!("{base}/template/spec/dnsPolicy"),
                HOST_NETWORK_DNS_POLICY,
            ));
        }
    }
}

fn plugin_defaults(spec: &JobSpec, config: &AdmissionConfig, patches: &mut Vec<PatchOperation>) {
    let plugins = &spec.plugins;
    let uses_framework = config
        .framework_plugins
        .iter()
        .any(|p| plugins.contains_key(p));

    if uses_framework && !plugins.contains_key(&config.service_plugin) {
        patches.push(PatchOperation::add(
            format!("/spec/plugins/{}", escape_pointer_segment(&config.service_plugin)),
            json!([]),
        ));
    }
    if plugins.contains_key(&config.mpi_plugin) && !plugins.contains_key(&config.ssh_plugin) {
        patches.push(PatchOperation::add(
            format!("/spec/plugins/{}", escape_pointer_segment(&config.ssh_plugin)),
            json!([]),
        ));
    }
}
