//! Admission decisions for batch-scheduler resources.
//!
//! - `policies`: validating rules, one module per resource kind
//! - `mutation`: defaulting rules that produce JSON patches
//! - `lookup`: read-only collaborators (queue store, namespaces, plugins)
//!
//! The HTTP transport is not part of this crate. A dispatcher decodes the
//! admission request, builds a [`ValidationContext`] and calls the policy or
//! mutator for the resource kind.

pub mod lookup;
pub mod mutation;
pub mod policies;

pub use lookup::{
    NamespaceLookup, NamespaceSnapshot, PluginRegistry, QueueLookup, QueueSnapshot,
    default_job_plugins,
};
pub use mutation::{PatchOp, PatchOperation, apply_patches};
pub use policies::{FieldError, FieldErrorKind, ValidationContext, ValidationResult};
