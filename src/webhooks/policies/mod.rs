//! Validation policies for admission requests.
//!
//! Each resource kind has its own policy module. Unlike a fail-fast check,
//! every policy accumulates all [`FieldError`]s for the object so a rejected
//! request reports every problem at once.
//!
//! - `job`: Job create rules (counts, tasks, plugins, queue, task DAG)
//! - `immutability`: Job update rules (mutable allow-list)
//! - `queue`: resource bounds, hierarchy annotations, parent/child, deletion
//! - `podgroup`: member counts and queue state
//! - `jobflow`: flow names and the flow dependency DAG
//! - `hypernode`: member selectors
//! - `pod`: disruption budget annotations on scheduler-managed pods

pub mod hypernode;
pub mod immutability;
pub mod job;
pub mod jobflow;
pub mod names;
pub mod pod;
pub mod podgroup;
pub mod queue;

use std::fmt;

use kube::{Resource, ResourceExt};
use serde::Serialize;

use crate::config::AdmissionConfig;

/// Classification of a rejected field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldErrorKind {
    /// A required field or collection is missing or empty
    Required,
    /// A numeric value is outside its legal range
    OutOfRange,
    /// A named reference does not resolve
    NotFound,
    /// A dependency graph contains a cycle
    Cycle,
    /// A referenced entity exists but is in a disallowed state
    InvalidState,
    /// An update touches a field outside the mutable allow-list
    Immutable,
    /// A value is malformed
    InvalidFormat,
    /// A value must be unique but is repeated
    Duplicate,
    /// A collaborator needed for the decision could not be read
    Internal,
}

impl FieldErrorKind {
    /// Short machine-readable reason, used as the denial reason
    pub fn reason(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "Required",
            FieldErrorKind::OutOfRange => "OutOfRange",
            FieldErrorKind::NotFound => "NotFound",
            FieldErrorKind::Cycle => "Cycle",
            FieldErrorKind::InvalidState => "InvalidState",
            FieldErrorKind::Immutable => "Immutable",
            FieldErrorKind::InvalidFormat => "InvalidFormat",
            FieldErrorKind::Duplicate => "Duplicate",
            FieldErrorKind::Internal => "InternalError",
        }
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FieldErrorKind::Required => "Required value",
            FieldErrorKind::OutOfRange => "Out of range",
            FieldErrorKind::NotFound => "Not found",
            FieldErrorKind::Cycle => "Dependency cycle",
            FieldErrorKind::InvalidState => "Invalid state",
            FieldErrorKind::Immutable => "Immutable field",
            FieldErrorKind::InvalidFormat => "Invalid value",
            FieldErrorKind::Duplicate => "Duplicate value",
            FieldErrorKind::Internal => "Internal error",
        };
        f.write_str(text)
    }
}

/// A single rejected field: where, what value, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    /// Error classification
    pub kind: FieldErrorKind,
    /// Field path, e.g. `spec.tasks[1].minAvailable`
    pub path: String,
    /// Offending value rendered as text (empty when not applicable)
    pub value: String,
    /// Human-readable explanation
    pub message: String,
}

impl FieldError {
    /// Create a field error
    pub fn new(
        kind: FieldErrorKind,
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    pub fn required(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Required, path, "", message)
    }

    pub fn out_of_range(
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::OutOfRange, path, value, message)
    }

    pub fn not_found(
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::NotFound, path, value, message)
    }

    pub fn cycle(
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::Cycle, path, value, message)
    }

    pub fn invalid_state(
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::InvalidState, path, value, message)
    }

    pub fn immutable(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Immutable, path, "", message)
    }

    pub fn invalid_format(
        path: impl Into<String>,
        value: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::new(FieldErrorKind::InvalidFormat, path, value, message)
    }

    pub fn duplicate(path: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(
            FieldErrorKind::Duplicate,
            path,
            value,
            "value must be unique",
        )
    }

    pub fn internal(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FieldErrorKind::Internal, path, "", message)
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}: {}: {}", self.path, self.kind, self.message)
        } else {
            write!(
                f,
                "{}: {}: \"{}\": {}",
                self.path, self.kind, self.value, self.message
            )
        }
    }
}

/// Result of a validation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// Whether the validation passed
    pub allowed: bool,
    /// Reason for denial (if not allowed)
    pub reason: Option<String>,
    /// Detailed message (if not allowed)
    pub message: Option<String>,
    /// Every field error found, in discovery order
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    /// Create an allowed result
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            message: None,
            errors: Vec::new(),
        }
    }

    /// Allow when `errors` is empty, otherwise deny with all of them.
    ///
    /// The reason is taken from the first error; the message joins every
    /// error with "; ".
    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        let Some(first) = errors.first() else {
            return Self::allowed();
        };
        let reason = first.kind.reason().to_string();
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            allowed: false,
            reason: Some(reason),
            message: Some(message),
            errors,
        }
    }

    /// Whether any error of `kind` was reported
    pub fn has_kind(&self, kind: FieldErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind == kind)
    }

    /// Whether any error was reported at `path`
    pub fn has_path(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

/// Context for validation
pub struct ValidationContext<'a, K> {
    /// The resource being validated
    pub resource: &'a K,
    /// The old resource (for UPDATE operations)
    pub old_resource: Option<&'a K>,
    /// Admission configuration for this request
    pub config: &'a AdmissionConfig,
}

impl<'a, K> ValidationContext<'a, K> {
    /// Context for a CREATE request
    pub fn create(resource: &'a K, config: &'a AdmissionConfig) -> Self {
        Self {
            resource,
            old_resource: None,
            config,
        }
    }

    /// Context for an UPDATE request
    pub fn update(old: &'a K, resource: &'a K, config: &'a AdmissionConfig) -> Self {
        Self {
            resource,
            old_resource: Some(old),
            config,
        }
    }

    /// Check if this is an UPDATE operation
    pub fn is_update(&self) -> bool {
        self.old_resource.is_some()
    }
}

impl<K: Resource> ValidationContext<'_, K> {
    /// Name of the resource under validation
    pub fn name(&self) -> String {
        self.resource.name_any()
    }
}
