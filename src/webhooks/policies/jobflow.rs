//! JobFlow validation policy.
//!
//! Flow names must be valid and unique, every dependency target must name a
//! flow, and the flow → target graph must be acyclic.

use std::collections::BTreeSet;

use tracing::debug;

use super::{FieldError, ValidationContext, ValidationResult, names};
use crate::crd::JobFlow;
use crate::graph::DependencyGraph;

/// Validate a JobFlow CREATE or UPDATE request
pub fn validate(ctx: &ValidationContext<'_, JobFlow>) -> ValidationResult {
    let flows = &ctx.resource.spec.flows;
    let mut errors = Vec::new();

    let mut seen = BTreeSet::new();
    let mut names_valid = true;
    for (i, flow) in flows.iter().enumerate() {
        let path = format!("spec.flows[{i}].name");
        if let Err(msg) = names::validate_dns1123_subdomain(&flow.name) {
            errors.push(FieldError::invalid_format(path, &flow.name, msg));
            names_valid = false;
        } else if !seen.insert(flow.name.as_str()) {
            errors.push(FieldError::duplicate(path, &flow.name));
            names_valid = false;
        }
    }

    let known: BTreeSet<&str> = flows.iter().map(|f| f.name.as_str()).collect();
    let mut resolved = true;
    for (i, flow) in flows.iter().enumerate() {
        for (j, target) in flow.targets().iter().enumerate() {
            if !known.contains(target.as_str()) {
                errors.push(FieldError::not_found(
                    format!("spec.flows[{i}].dependsOn.targets[{j}]"),
                    target,
                    "flow does not exist in jobflow",
                ));
                resolved = false;
            }
        }
    }

    if names_valid && resolved {
        match DependencyGraph::new(flows.iter().map(|f| (f.name.as_str(), f.targets()))) {
            Ok(graph) => {
                if let Some(cycle) = graph.find_cycle() {
                    errors.push(FieldError::cycle(
                        "spec.flows",
                        cycle.join(" -> "),
                        "flow dependencies must form a directed acyclic graph",
                    ));
                }
            }
            Err(e) => errors.push(FieldError::internal("spec.flows", e.to_string())),
        }
    }

    debug!(jobflow = %ctx.name(), errors = errors.len(), "Validated jobflow");
    ValidationResult::from_errors(errors)
}
