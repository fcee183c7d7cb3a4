//! PodGroup validation policy.
//!
//! Member counts are always checked. The queue state gate only applies on
//! CREATE; an empty queue is allowed through for later resolution.

use tracing::{debug, warn};

use super::{FieldError, ValidationContext, ValidationResult};
use crate::crd::{PodGroup, QueueState};
use crate::webhooks::lookup::QueueLookup;

/// Validate a PodGroup CREATE or UPDATE request
pub fn validate(ctx: &ValidationContext<'_, PodGroup>, queues: &dyn QueueLookup) -> ValidationResult {
    let spec = &ctx.resource.spec;
    let mut errors = Vec::new();

    if spec.min_member < 0 {
        errors.push(FieldError::out_of_range(
            "spec.minMember",
            spec.min_member,
            "must be greater than or equal to 0",
        ));
    }
    if let Some(max_member) = spec.max_member
        && max_member < spec.min_member
    {
        errors.push(FieldError::out_of_range(
            "spec.maxMember",
            max_member,
            format!("must be greater than or equal to minMember ({})", spec.min_member),
        ));
    }

    if !ctx.is_update() {
        errors.extend(validate_queue_state(ctx, queues));
    }

    debug!(podgroup = %ctx.name(), errors = errors.len(), "Validated podgroup");
    ValidationResult::from_errors(errors)
}

/// A non-empty queue must exist and be Open
pub fn validate_queue_state(
    ctx: &ValidationContext<'_, PodGroup>,
    queues: &dyn QueueLookup,
) -> Vec<FieldError> {
    const PATH: &str = "spec.queue";
    let name = ctx.resource.spec.queue.as_str();
    if name.is_empty() {
        return Vec::new();
    }

    match queues.get(name) {
        Ok(Some(queue)) => {
            let state = queue.state();
            if state == QueueState::Open {
                Vec::new()
            } else {
                vec![FieldError::invalid_state(
                    PATH,
                    name,
                    format!("can only use queue with state `Open`, queue `{name}` status is `{state}`"),
                )]
            }
        }
        Ok(None) => vec![FieldError::not_found(PATH, name, "queue does not exist")],
        Err(e) => {
            warn!(queue = %name, error = %e, "Queue lookup failed");
            vec![FieldError::internal(
                PATH,
                format!("unable to look up queue `{name}`: {e}"),
            )]
        }
    }
}
