//! Job validation policy.
//!
//! Create requests go through every rule in order and accumulate errors:
//! counts, tasks, lifecycle policies, plugins, queue state and finally the
//! task dependency graph. Update requests go through the immutability
//! policy instead.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::{FieldError, ValidationContext, ValidationResult, immutability, names};
use crate::config::AdmissionConfig;
use crate::crd::{
    ANY_EVENT, Job, JobSpec, LIFECYCLE_ACTIONS, LIFECYCLE_EVENTS, LifecyclePolicy, QueueState,
    total_replicas,
};
use crate::graph::DependencyGraph;
use crate::webhooks::lookup::{PluginRegistry, QueueLookup};

/// Run the policies that apply to this request
pub fn validate_all(
    ctx: &ValidationContext<'_, Job>,
    queues: &dyn QueueLookup,
    plugins: &dyn PluginRegistry,
) -> ValidationResult {
    if ctx.is_update() {
        immutability::validate_update(ctx)
    } else {
        validate_create(ctx, queues, plugins)
    }
}

/// Validate a Job CREATE request
pub fn validate_create(
    ctx: &ValidationContext<'_, Job>,
    queues: &dyn QueueLookup,
    plugins: &dyn PluginRegistry,
) -> ValidationResult {
    let spec = &ctx.resource.spec;
    let mut errors = Vec::new();

    validate_counts(spec, &mut errors);
    let names_valid = validate_tasks(spec, &mut errors);
    validate_policies(&spec.policies, "spec.policies", &mut errors);
    validate_plugins(spec, plugins, &mut errors);
    validate_queue(spec, ctx.config, queues, &mut errors);

    if names_valid {
        validate_task_dependencies(spec, &mut errors);
    } else if spec.tasks.iter().any(|t| t.depends_on.is_some()) {
        debug!(job = %ctx.name(), "Skipping task dependency check, task names are invalid");
    }

    debug!(job = %ctx.name(), errors = errors.len(), "Validated job create");
    ValidationResult::from_errors(errors)
}

/// Job-level numeric fields and the task count
pub(crate) fn validate_counts(spec: &JobSpec, errors: &mut Vec<FieldError>) {
    if spec.min_available < 0 {
        errors.push(FieldError::out_of_range(
            "spec.minAvailable",
            spec.min_available,
            "must be greater than or equal to 0",
        ));
    }
    if spec.max_retry < 0 {
        errors.push(FieldError::out_of_range(
            "spec.maxRetry",
            spec.max_retry,
            "must be greater than or equal to 0",
        ));
    }
    if let Some(ttl) = spec.ttl_seconds_after_finished
        && ttl < 0
    {
        errors.push(FieldError::out_of_range(
            "spec.ttlSecondsAfterFinished",
            ttl,
            "must be greater than or equal to 0",
        ));
    }
    if let Some(min_success) = spec.min_success
        && min_success < 1
    {
        errors.push(FieldError::out_of_range(
            "spec.minSuccess",
            min_success,
            "must be greater than or equal to 1",
        ));
    }

    if spec.tasks.is_empty() {
        errors.push(FieldError::required(
            "spec.tasks",
            "at least one task must be specified",
        ));
        return;
    }

    let total = total_replicas(spec);
    if spec.min_available > total {
        errors.push(FieldError::out_of_range(
            "spec.minAvailable",
            spec.min_available,
            format!("must not be greater than total replicas ({total})"),
        ));
    }
    if let Some(min_success) = spec.min_success
        && min_success > total
    {
        errors.push(FieldError::out_of_range(
            "spec.minSuccess",
            min_success,
            format!("must not be greater than total replicas ({total})"),
        ));
    }
}

/// Per-task checks. Returns whether every task name is valid and unique.
fn validate_tasks(spec: &JobSpec, errors: &mut Vec<FieldError>) -> bool {
    let mut seen = BTreeSet::new();
    let mut names_valid = true;

    for (i, task) in spec.tasks.iter().enumerate() {
        let path = format!("spec.tasks[{i}]");

        if task.replicas < 0 {
            errors.push(FieldError::out_of_range(
                format!("{path}.replicas"),
                task.replicas,
                "must be greater than or equal to 0",
            ));
        }
        if let Some(min_available) = task.min_available {
            if min_available < 0 {
                errors.push(FieldError::out_of_range(
                    format!("{path}.minAvailable"),
                    min_available,
                    "must be greater than or equal to 0",
                ));
            } else if min_available > task.replicas {
                errors.push(FieldError::out_of_range(
                    format!("{path}.minAvailable"),
                    min_available,
                    format!("must not be greater than replicas ({})", task.replicas),
                ));
            }
        }
        if task.max_retry < 0 {
            errors.push(FieldError::out_of_range(
                format!("{path}.maxRetry"),
                task.max_retry,
                "must be greater than or equal to 0",
            ));
        }

        if let Err(msg) = names::validate_dns1123_label(&task.name) {
            errors.push(FieldError::invalid_format(
                format!("{path}.name"),
                &task.name,
                msg,
            ));
            names_valid = false;
        } else if !seen.insert(task.name.as_str()) {
            errors.push(FieldError::duplicate(format!("{path}.name"), &task.name));
            names_valid = false;
        }

        validate_policies(&task.policies, &format!("{path}.policies"), errors);
    }

    names_valid
}

/// Lifecycle policy rules, shared by jobs and tasks
fn validate_policies(policies: &[LifecyclePolicy], path: &str, errors: &mut Vec<FieldError>) {
    let mut seen_events = BTreeSet::new();
    let mut seen_exit_codes = BTreeSet::new();
    let mut any_event = false;
    let mut total_events = 0usize;

    for (i, policy) in policies.iter().enumerate() {
        let policy_path = format!("{path}[{i}]");
        let events: Vec<&str> = policy.all_events().collect();

        if !events.is_empty() && policy.exit_code.is_some() {
            errors.push(FieldError::invalid_format(
                &policy_path,
                "",
                "must not specify event and exitCode simultaneously",
            ));
        } else if events.is_empty() && policy.exit_code.is_none() {
            errors.push(FieldError::required(
                &policy_path,
                "either event or exitCode must be specified",
            ));
        }

        for event in events {
            total_events += 1;
            if !LIFECYCLE_EVENTS.contains(&event) {
                errors.push(FieldError::invalid_format(
                    format!("{policy_path}.event"),
                    event,
                    "unsupported lifecycle event",
                ));
            } else if !seen_events.insert(event) {
                errors.push(FieldError::duplicate(format!("{policy_path}.event"), event));
            }
            if event == ANY_EVENT {
                any_event = true;
            }
        }

        if let Some(code) = policy.exit_code {
            if code == 0 {
                errors.push(FieldError::out_of_range(
                    format!("{policy_path}.exitCode"),
                    code,
                    "0 is not a valid error code",
                ));
            } else if !seen_exit_codes.insert(code) {
                errors.push(FieldError::duplicate(
                    format!("{policy_path}.exitCode"),
                    code,
                ));
            }
        }

        if policy.action.is_empty() {
            errors.push(FieldError::required(
                format!("{policy_path}.action"),
                "action must be specified",
            ));
        } else if !LIFECYCLE_ACTIONS.contains(&policy.action.as_str()) {
            errors.push(FieldError::invalid_format(
                format!("{policy_path}.action"),
                &policy.action,
                "unsupported lifecycle action",
            ));
        }
    }

    if any_event && (policies.len() > 1 || total_events > 1) {
        errors.push(FieldError::invalid_format(
            path,
            ANY_EVENT,
            "if the any-event policy is used, no other policy or event may be specified",
        ));
    }
}

fn validate_plugins(spec: &JobSpec, plugins: &dyn PluginRegistry, errors: &mut Vec<FieldError>) {
    for name in spec.plugins.keys() {
        if !plugins.contains(name) {
            errors.push(FieldError::not_found(
                "spec.plugins",
                name,
                "unable to find job plugin",
            ));
        }
    }
}

fn validate_queue(
    spec: &JobSpec,
    config: &AdmissionConfig,
    queues: &dyn QueueLookup,
    errors: &mut Vec<FieldError>,
) {
    const PATH: &str = "spec.queue";
    let name = spec.queue.as_str();

    if name.is_empty() {
        errors.push(FieldError::required(PATH, "queue must be specified"));
        return;
    }
    if name == config.root_queue {
        errors.push(FieldError::invalid_state(
            PATH,
            name,
            "can not submit job to root queue",
        ));
        return;
    }

    let queue = match queues.get(name) {
        Ok(Some(queue)) => queue,
        Ok(None) => {
            errors.push(FieldError::not_found(PATH, name, "queue does not exist"));
            return;
        }
        Err(e) => {
            warn!(queue = %name, error = %e, "Queue lookup failed");
            errors.push(FieldError::internal(
                PATH,
                format!("unable to look up queue `{name}`: {e}"),
            ));
            return;
        }
    };

    let state = queue.state();
    if state != QueueState::Open {
        errors.push(FieldError::invalid_state(
            PATH,
            name,
            format!("can only submit job to queue with state `Open`, queue `{name}` status is `{state}`"),
        ));
    }

    match queues.list() {
        Ok(all) => {
            let has_children = all
                .iter()
                .any(|q| q.parent_name(&config.root_queue) == Some(name));
            if has_children {
                errors.push(FieldError::invalid_state(
                    PATH,
                    name,
                    format!("can only submit job to a leaf queue, queue `{name}` has child queues"),
                ));
            }
        }
        Err(e) => {
            warn!(queue = %name, error = %e, "Queue listing failed");
            errors.push(FieldError::internal(
                PATH,
                format!("unable to list queues: {e}"),
            ));
        }
    }
}

/// Task DAG check; only runs when some task declares `dependsOn`
fn validate_task_dependencies(spec: &JobSpec, errors: &mut Vec<FieldError>) {
    if !spec.tasks.iter().any(|t| t.depends_on.is_some()) {
        return;
    }

    let known: BTreeSet<&str> = spec.tasks.iter().map(|t| t.name.as_str()).collect();
    let mut resolved = true;
    for (i, task) in spec.tasks.iter().enumerate() {
        for (j, dependency) in task.dependencies().iter().enumerate() {
            if !known.contains(dependency.as_str()) {
                errors.push(FieldError::not_found(
                    format!("spec.tasks[{i}].dependsOn.name[{j}]"),
                    dependency,
                    "task does not exist in job",
                ));
                resolved = false;
            }
        }
    }
    if !resolved {
        return;
    }

    let graph = DependencyGraph::new(
        spec.tasks
            .iter()
            .map(|t| (t.name.as_str(), t.dependencies())),
    );
    match graph {
        Ok(graph) => {
            if let Some(cycle) = graph.find_cycle() {
                errors.push(FieldError::cycle(
                    "spec.tasks",
                    cycle.join(" -> "),
                    "task dependencies must not form a cycle",
                ));
            }
        }
        Err(e) => errors.push(FieldError::internal("spec.tasks", e.to_string())),
    }
}
