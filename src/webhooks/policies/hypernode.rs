//! HyperNode validation policy.

use regex::Regex;
use tracing::debug;

use super::{FieldError, ValidationContext, ValidationResult, names};
use crate::crd::HyperNode;

/// Validate a HyperNode CREATE or UPDATE request.
///
/// Every member must carry exactly one selector. Violations are reported for
/// all members at once, indexed by position.
pub fn validate(ctx: &ValidationContext<'_, HyperNode>) -> ValidationResult {
    let members = &ctx.resource.spec.members;
    let mut errors = Vec::new();

    if members.is_empty() {
        errors.push(FieldError::required(
            "spec.members",
            "at least one member must be specified",
        ));
    }

    for (i, member) in members.iter().enumerate() {
        let path = format!("spec.members[{i}].selector");
        let selector = &member.selector;

        match selector.populated() {
            1 => {}
            0 => errors.push(FieldError::required(
                &path,
                "exactly one of exactMatch, regexMatch or labelMatch must be specified",
            )),
            n => errors.push(FieldError::invalid_format(
                &path,
                format!("{n} selectors"),
                "exactMatch, regexMatch and labelMatch are mutually exclusive",
            )),
        }

        if let Some(exact) = &selector.exact_match {
            let name_path = format!("{path}.exactMatch.name");
            if exact.name.is_empty() {
                errors.push(FieldError::required(name_path, "member name must be specified"));
            } else if let Err(msg) = names::validate_qualified_name(&exact.name) {
                errors.push(FieldError::invalid_format(name_path, &exact.name, msg));
            }
        }

        if let Some(regex) = &selector.regex_match {
            let pattern_path = format!("{path}.regexMatch.pattern");
            if regex.pattern.is_empty() {
                errors.push(FieldError::required(pattern_path, "pattern must be specified"));
            } else if let Err(e) = Regex::new(&regex.pattern) {
                errors.push(FieldError::invalid_format(
                    pattern_path,
                    &regex.pattern,
                    format!("invalid regular expression: {e}"),
                ));
            }
        }
    }

    debug!(hypernode = %ctx.name(), errors = errors.len(), "Validated hypernode");
    ValidationResult::from_errors(errors)
}
