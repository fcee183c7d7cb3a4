//! Kubernetes name format checks.
//!
//! Each function returns `Err(message)` describing the first rule a value
//! breaks, so callers can wrap it in a field error.

use std::sync::LazyLock;

use regex::Regex;

const DNS1123_LABEL_MAX_LENGTH: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LENGTH: usize = 253;
const QUALIFIED_NAME_MAX_LENGTH: usize = 63;

static DNS1123_LABEL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").ok());

static DNS1123_SUBDOMAIN_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$").ok()
});

static QUALIFIED_NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").ok());

/// Validate a DNS-1123 label (task names)
pub fn validate_dns1123_label(value: &str) -> Result<(), String> {
    if value.len() > DNS1123_LABEL_MAX_LENGTH {
        return Err(format!(
            "must be no more than {DNS1123_LABEL_MAX_LENGTH} characters"
        ));
    }
    if !DNS1123_LABEL_RE.as_ref().is_some_and(|re| re.is_match(value)) {
        return Err(
            "a lowercase RFC 1123 label must consist of lower case alphanumeric characters \
             or '-', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// Validate a DNS-1123 subdomain (flow names)
pub fn validate_dns1123_subdomain(value: &str) -> Result<(), String> {
    if value.len() > DNS1123_SUBDOMAIN_MAX_LENGTH {
        return Err(format!(
            "must be no more than {DNS1123_SUBDOMAIN_MAX_LENGTH} characters"
        ));
    }
    if !DNS1123_SUBDOMAIN_RE
        .as_ref()
        .is_some_and(|re| re.is_match(value))
    {
        return Err(
            "a lowercase RFC 1123 subdomain must consist of lower case alphanumeric characters, \
             '-' or '.', and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}

/// Validate a qualified name: `[prefix/]name`, prefix a DNS-1123 subdomain
pub fn validate_qualified_name(value: &str) -> Result<(), String> {
    let name = match value.split_once('/') {
        Some((prefix, name)) => {
            if prefix.is_empty() {
                return Err("prefix part must be non-empty".to_string());
            }
            validate_dns1123_subdomain(prefix).map_err(|msg| format!("prefix part {msg}"))?;
            name
        }
        None => value,
    };

    if name.is_empty() {
        return Err("name part must be non-empty".to_string());
    }
    if name.len() > QUALIFIED_NAME_MAX_LENGTH {
        return Err(format!(
            "name part must be no more than {QUALIFIED_NAME_MAX_LENGTH} characters"
        ));
    }
    if !QUALIFIED_NAME_RE.as_ref().is_some_and(|re| re.is_match(name)) {
        return Err(
            "name part must consist of alphanumeric characters, '-', '_' or '.', \
             and must start and end with an alphanumeric character"
                .to_string(),
        );
    }
    Ok(())
}
