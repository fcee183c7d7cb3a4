//! Pod disruption budget annotation policy.
//!
//! Only pods handed to one of the configured schedulers are checked. Such a
//! pod may carry at most one of the budget annotations, and its value must
//! be a positive integer or a percentage between 1% and 99%.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::debug;

use super::{FieldError, ValidationContext, ValidationResult};

/// Minimum number (or share) of the job's pods that must stay available
pub const JDB_MIN_AVAILABLE: &str = "volcano.sh/jdb-min-available";

/// Maximum number (or share) of the job's pods that may be unavailable
pub const JDB_MAX_UNAVAILABLE: &str = "volcano.sh/jdb-max-unavailable";

/// Validate a Pod CREATE request
pub fn validate(ctx: &ValidationContext<'_, Pod>) -> ValidationResult {
    let pod = ctx.resource;
    let scheduler = pod
        .spec
        .as_ref()
        .and_then(|s| s.scheduler_name.as_deref())
        .unwrap_or_default();
    if !ctx.config.manages_scheduler(scheduler) {
        debug!(pod = %ctx.name(), scheduler = %scheduler, "Skipping pod not managed by scheduler");
        return ValidationResult::allowed();
    }

    let annotations = pod.annotations();
    let mut errors = Vec::new();

    let min_available = annotations.get(JDB_MIN_AVAILABLE);
    let max_unavailable = annotations.get(JDB_MAX_UNAVAILABLE);
    if min_available.is_some() && max_unavailable.is_some() {
        errors.push(FieldError::invalid_format(
            "metadata.annotations",
            format!("{JDB_MIN_AVAILABLE}, {JDB_MAX_UNAVAILABLE}"),
            "only one disruption budget annotation may be set",
        ));
    }

    for (key, value) in [
        (JDB_MIN_AVAILABLE, min_available),
        (JDB_MAX_UNAVAILABLE, max_unavailable),
    ] {
        if let Some(value) = value
            && let Err(msg) = validate_int_or_percentage(value)
        {
            errors.push(FieldError::invalid_format(
                format!("metadata.annotations[{key}]"),
                value,
                msg,
            ));
        }
    }

    debug!(pod = %ctx.name(), errors = errors.len(), "Validated pod");
    ValidationResult::from_errors(errors)
}

fn validate_int_or_percentage(value: &str) -> Result<(), String> {
    match value.strip_suffix('%') {
        Some(percent) => match percent.parse::<i32>() {
            Ok(p) if (1..=99).contains(&p) => Ok(()),
            Ok(_) => Err("percentage must be between 1% and 99%".to_string()),
            Err(_) => Err("must be an integer or a percentage".to_string()),
        },
        None => match value.parse::<i32>() {
            Ok(n) if n > 0 => Ok(()),
            Ok(_) => Err("must be a positive integer".to_string()),
            Err(_) => Err("must be an integer or a percentage".to_string()),
        },
    }
}
