//! Job immutability policy.
//!
//! Only enforced on UPDATE operations.
//!
//! Validates:
//! - Tasks cannot be added or removed
//! - Only `minAvailable`, task `replicas` and `priorityClassName` may change
//! - The new mutable values are still in range

use serde_json::Value;
use tracing::debug;

use super::{FieldError, ValidationContext, ValidationResult};
use crate::crd::{Job, JobSpec, total_replicas};

const IMMUTABLE_MESSAGE: &str =
    "field is immutable; only minAvailable, tasks[*].replicas and priorityClassName may change";

/// Validate immutability constraints on UPDATE operations
pub fn validate_update(ctx: &ValidationContext<'_, Job>) -> ValidationResult {
    let Some(old) = ctx.old_resource else {
        return ValidationResult::allowed(); // Not an UPDATE
    };
    let old = &old.spec;
    let new = &ctx.resource.spec;
    let mut errors = Vec::new();

    validate_mutable_ranges(new, &mut errors);

    if old.tasks.len() != new.tasks.len() {
        errors.push(FieldError::immutable(
            "spec.tasks",
            format!(
                "job updates may not add or remove tasks ({} -> {})",
                old.tasks.len(),
                new.tasks.len()
            ),
        ));
    }

    let normalized = with_mutable_fields_from(new, old);
    if normalized != *old {
        let changed = changed_fields(old, &normalized);
        if changed.is_empty() {
            errors.push(FieldError::immutable("spec", IMMUTABLE_MESSAGE));
        }
        errors.extend(
            changed
                .into_iter()
                .map(|path| FieldError::immutable(path, IMMUTABLE_MESSAGE)),
        );
    }

    debug!(job = %ctx.name(), errors = errors.len(), "Validated job update");
    ValidationResult::from_errors(errors)
}

fn validate_mutable_ranges(spec: &JobSpec, errors: &mut Vec<FieldError>) {
    if spec.min_available < 0 {
        errors.push(FieldError::out_of_range(
            "spec.minAvailable",
            spec.min_available,
            "must be greater than or equal to 0",
        ));
    }
    for (i, task) in spec.tasks.iter().enumerate() {
        if task.replicas < 0 {
            errors.push(FieldError::out_of_range(
                format!("spec.tasks[{i}].replicas"),
                task.replicas,
                "must be greater than or equal to 0",
            ));
        }
    }
    let total = total_replicas(spec);
    if spec.min_available > total {
        errors.push(FieldError::out_of_range(
            "spec.minAvailable",
            spec.min_available,
            format!("must not be greater than total replicas ({total})"),
        ));
    }
}

/// Copy of `new` with every mutable field taken from `old`.
///
/// When the task count changed, the old tasks are kept wholesale; that
/// change is reported on its own.
fn with_mutable_fields_from(new: &JobSpec, old: &JobSpec) -> JobSpec {
    let mut normalized = new.clone();
    normalized.min_available = old.min_available;
    normalized.priority_class_name = old.priority_class_name.clone();

    if normalized.tasks.len() == old.tasks.len() {
        for (task, old_task) in normalized.tasks.iter_mut().zip(&old.tasks) {
            task.replicas = old_task.replicas;
        }
    } else {
        normalized.tasks = old.tasks.clone();
    }
    normalized
}

/// Field paths that differ between two specs, one level into each task
fn changed_fields(old: &JobSpec, new: &JobSpec) -> Vec<String> {
    let (Ok(Value::Object(old)), Ok(Value::Object(new))) =
        (serde_json::to_value(old), serde_json::to_value(new))
    else {
        return Vec::new();
    };

    let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut changed = Vec::new();
    for key in keys {
        let (before, after) = (old.get(key), new.get(key));
        if before == after {
            continue;
        }
        match (key.as_str(), before, after) {
            ("tasks", Some(Value::Array(before)), Some(Value::Array(after)))
                if before.len() == after.len() =>
            {
                for (i, (b, a)) in before.iter().zip(after).enumerate() {
                    changed.extend(
                        object_diff(b, a)
                            .into_iter()
                            .map(|field| format!("spec.tasks[{i}].{field}")),
                    );
                }
            }
            _ => changed.push(format!("spec.{key}")),
        }
    }
    changed
}

fn object_diff(before: &Value, after: &Value) -> Vec<String> {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => {
            let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.into_iter()
                .filter(|k| before.get(*k) != after.get(*k))
                .cloned()
                .collect()
        }
        _ => Vec::new(),
    }
}
