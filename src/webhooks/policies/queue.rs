//! Queue validation policy.
//!
//! Checks resource bounds, the paired hierarchy annotations, the parent/child
//! relationship and deletion. All checks for one queue are aggregated into a
//! single result. Checks that need other queues take one snapshot from the
//! queue store and use it throughout.

use std::collections::BTreeMap;

use kube::ResourceExt;
use tracing::{debug, warn};

use super::{FieldError, ValidationContext, ValidationResult};
use crate::config::AdmissionConfig;
use crate::crd::{
    HIERARCHY_ANNOTATION, HIERARCHY_WEIGHTS_ANNOTATION, Queue, ResourceList,
};
use crate::graph::DependencyGraph;
use crate::quantity::{ParsedQuantity, parse_quantity};
use crate::webhooks::lookup::QueueLookup;

/// Validate a Queue CREATE or UPDATE request
pub fn validate_queue(
    ctx: &ValidationContext<'_, Queue>,
    queues: &dyn QueueLookup,
) -> ValidationResult {
    let queue = ctx.resource;
    let mut errors = Vec::new();

    if queue.spec.weight <= 0 {
        errors.push(FieldError::out_of_range(
            "spec.weight",
            queue.spec.weight,
            "must be greater than 0",
        ));
    }

    errors.extend(validate_resource_ordering(queue));

    match queues.list() {
        Ok(snapshot) => {
            errors.extend(validate_hierarchy_annotation(queue, &snapshot));
            errors.extend(validate_parent_child(queue, &snapshot, ctx.config));
        }
        Err(e) => {
            warn!(queue = %ctx.name(), error = %e, "Queue listing failed");
            errors.extend(validate_hierarchy_annotation(queue, &[]));
            errors.push(FieldError::internal(
                "spec.parent",
                format!("unable to list queues: {e}"),
            ));
        }
    }

    debug!(queue = %ctx.name(), errors = errors.len(), "Validated queue");
    ValidationResult::from_errors(errors)
}

/// Validate a Queue DELETE request against the current queue set
pub fn validate_delete(
    name: &str,
    queues: &dyn QueueLookup,
    config: &AdmissionConfig,
) -> ValidationResult {
    let errors = match queues.list() {
        Ok(snapshot) => validate_deletion(name, &snapshot, config),
        Err(e) => {
            warn!(queue = %name, error = %e, "Queue listing failed");
            vec![FieldError::internal(
                "metadata.name",
                format!("unable to list queues: {e}"),
            )]
        }
    };

    debug!(queue = %name, errors = errors.len(), "Validated queue deletion");
    ValidationResult::from_errors(errors)
}

/// Check `capability ≥ deserved ≥ guarantee` per resource dimension.
///
/// Dimensions missing from one side of a pair are unconstrained. When
/// `deserved` lacks a dimension, capability is compared with guarantee
/// directly.
pub fn validate_resource_ordering(queue: &Queue) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let capability = parse_bounds("capability", &queue.spec.capability, &mut errors);
    let deserved = parse_bounds("deserved", &queue.spec.deserved, &mut errors);
    let guarantee = parse_bounds("guarantee", &queue.spec.guarantee, &mut errors);

    check_pair(&capability, &deserved, &mut errors);
    check_pair(&deserved, &guarantee, &mut errors);

    let unmediated = Bounds {
        field: guarantee.field,
        values: guarantee
            .values
            .iter()
            .filter(|(resource, _)| !deserved.values.contains_key(*resource))
            .map(|(resource, value)| (*resource, *value))
            .collect(),
    };
    check_pair(&capability, &unmediated, &mut errors);

    errors
}

struct Bounds<'a> {
    field: &'static str,
    values: BTreeMap<&'a str, (ParsedQuantity, &'a str)>,
}

fn parse_bounds<'a>(
    field: &'static str,
    list: &'a ResourceList,
    errors: &mut Vec<FieldError>,
) -> Bounds<'a> {
    let mut values = BTreeMap::new();
    for (resource, quantity) in list {
        match parse_quantity(quantity) {
            Ok(parsed) => {
                values.insert(resource.as_str(), (parsed, quantity.0.as_str()));
            }
            Err(e) => errors.push(FieldError::invalid_format(
                format!("spec.{field}[{resource}]"),
                &quantity.0,
                e.to_string(),
            )),
        }
    }
    Bounds { field, values }
}

fn check_pair(upper: &Bounds<'_>, lower: &Bounds<'_>, errors: &mut Vec<FieldError>) {
    for (resource, (low, low_raw)) in &lower.values {
        let Some((high, high_raw)) = upper.values.get(resource) else {
            continue;
        };
        if low > high {
            errors.push(FieldError::out_of_range(
                format!("spec.{}[{resource}]", lower.field),
                low_raw,
                format!(
                    "{} {resource} ({low_raw}) must not exceed {} {resource} ({high_raw})",
                    lower.field, upper.field
                ),
            ));
        }
    }
}

/// Check the paired hierarchy annotations against the queue set.
///
/// Paths are compared segment by segment. Another queue conflicts when it
/// has the same path, or when this path is a strict ancestor of its path.
pub fn validate_hierarchy_annotation(queue: &Queue, queues: &[Queue]) -> Vec<FieldError> {
    let hierarchy_path = format!("metadata.annotations[{HIERARCHY_ANNOTATION}]");
    let weights_path = format!("metadata.annotations[{HIERARCHY_WEIGHTS_ANNOTATION}]");
    let mut errors = Vec::new();

    let (hierarchy, weights) = match (queue.hierarchy(), queue.hierarchy_weights()) {
        (None, None) => return errors,
        (Some(_), None) => {
            errors.push(FieldError::required(
                weights_path,
                format!("must be set together with {HIERARCHY_ANNOTATION}"),
            ));
            return errors;
        }
        (None, Some(_)) => {
            errors.push(FieldError::required(
                hierarchy_path,
                format!("must be set together with {HIERARCHY_WEIGHTS_ANNOTATION}"),
            ));
            return errors;
        }
        (Some(h), Some(w)) => (h, w),
    };

    let segments: Vec<&str> = hierarchy.split('/').collect();
    let weight_segments: Vec<&str> = weights.split('/').collect();

    if segments.iter().any(|s| s.is_empty()) {
        errors.push(FieldError::invalid_format(
            &hierarchy_path,
            hierarchy,
            "hierarchy path must not contain empty segments",
        ));
    }
    if segments.len() != weight_segments.len() {
        errors.push(FieldError::invalid_format(
            &weights_path,
            weights,
            format!(
                "{HIERARCHY_ANNOTATION} has {} segments but {HIERARCHY_WEIGHTS_ANNOTATION} has {}",
                segments.len(),
                weight_segments.len()
            ),
        ));
    }
    for segment in &weight_segments {
        if !segment.parse::<u64>().is_ok_and(|w| w > 0) {
            errors.push(FieldError::invalid_format(
                &weights_path,
                segment,
                "hierarchy weights must be positive integers",
            ));
        }
    }
    if !errors.is_empty() {
        return errors;
    }

    let name = queue.name_any();
    for other in queues.iter().filter(|q| q.name_any() != name) {
        let Some(other_hierarchy) = other.hierarchy() else {
            continue;
        };
        let other_segments: Vec<&str> = other_hierarchy.split('/').collect();
        if other_segments == segments {
            errors.push(FieldError::duplicate(&hierarchy_path, hierarchy));
        } else if other_segments.len() > segments.len() && other_segments.starts_with(&segments) {
            errors.push(FieldError::invalid_state(
                &hierarchy_path,
                hierarchy,
                format!(
                    "conflicts with queue `{}` whose hierarchy `{other_hierarchy}` is nested under it",
                    other.name_any()
                ),
            ));
        }
    }

    errors
}

/// Check the declared parent against the queue set
pub fn validate_parent_child(
    queue: &Queue,
    queues: &[Queue],
    config: &AdmissionConfig,
) -> Vec<FieldError> {
    const PATH: &str = "spec.parent";
    let mut errors = Vec::new();
    let name = queue.name_any();

    let Some(parent_name) = queue.parent_name(&config.root_queue) else {
        return errors;
    };
    if parent_name == name {
        errors.push(FieldError::cycle(
            PATH,
            parent_name,
            "queue cannot be its own parent",
        ));
        return errors;
    }

    let Some(parent) = queues.iter().find(|q| q.name_any() == parent_name) else {
        errors.push(FieldError::not_found(
            PATH,
            parent_name,
            "parent queue does not exist",
        ));
        return errors;
    };

    // The stored copy of this queue counts: keeping an existing parent is
    // not acquiring one.
    let parent_has_children = queues
        .iter()
        .any(|q| q.parent_name(&config.root_queue) == Some(parent_name));
    if !parent_has_children && has_allocated(parent) {
        errors.push(FieldError::invalid_state(
            PATH,
            parent_name,
            format!(
                "queue `{parent_name}` cannot become the parent of `{name}` because it has allocated resources"
            ),
        ));
    }

    if let Some(cycle) = parent_cycle(queue, queues, config) {
        errors.push(FieldError::cycle(
            PATH,
            parent_name,
            format!("queue hierarchy must not contain cycles: {}", cycle.join(" -> ")),
        ));
    }

    errors
}

/// Cycle in the parent chain once `queue` replaces its stored version
fn parent_cycle(queue: &Queue, queues: &[Queue], config: &AdmissionConfig) -> Option<Vec<String>> {
    let root = config.root_queue.as_str();
    let mut parents: BTreeMap<String, Option<&str>> = queues
        .iter()
        .map(|q| (q.name_any(), q.parent_name(root)))
        .collect();
    parents.insert(queue.name_any(), queue.parent_name(root));

    let nodes: Vec<(&str, Vec<&str>)> = parents
        .iter()
        .map(|(name, parent)| {
            let edges = parent
                .filter(|p| parents.contains_key(*p))
                .into_iter()
                .collect();
            (name.as_str(), edges)
        })
        .collect();

    DependencyGraph::new(nodes).ok()?.find_cycle()
}

/// Check whether a queue may be deleted
pub fn validate_deletion(
    name: &str,
    queues: &[Queue],
    config: &AdmissionConfig,
) -> Vec<FieldError> {
    const PATH: &str = "metadata.name";
    let mut errors = Vec::new();

    if config.is_protected_queue(name) {
        errors.push(FieldError::invalid_state(
            PATH,
            name,
            format!("`{name}` queue can not be deleted"),
        ));
    }

    let children: Vec<String> = queues
        .iter()
        .filter(|q| q.parent_name(&config.root_queue) == Some(name))
        .map(ResourceExt::name_any)
        .collect();
    if !children.is_empty() {
        errors.push(FieldError::invalid_state(
            PATH,
            name,
            format!(
                "queue `{name}` has child queues: {}; delete them first",
                children.join(", ")
            ),
        ));
    }

    if queues
        .iter()
        .find(|q| q.name_any() == name)
        .is_some_and(has_allocated)
    {
        errors.push(FieldError::invalid_state(
            PATH,
            name,
            format!("queue `{name}` still has allocated resources"),
        ));
    }

    errors
}

/// Whether status reports any non-zero allocation
fn has_allocated(queue: &Queue) -> bool {
    queue.allocated().is_some_and(|allocated| {
        allocated
            .values()
            .any(|q| parse_quantity(q).is_ok_and(|parsed| !parsed.is_zero()))
    })
}
