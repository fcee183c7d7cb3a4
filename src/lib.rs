//! volcano-admission library crate
//!
//! Admission decisions for batch-scheduler custom resources: Jobs, Queues,
//! PodGroups, JobFlows, HyperNodes and scheduler-managed Pods. Validators
//! accept or reject a request with every field error found; mutators return
//! JSON patches that fill in unset fields.
//!
//! Everything is synchronous and pure. Cluster state (queues, namespaces,
//! known plugins) is passed in per request through the traits in
//! [`webhooks::lookup`].

pub mod config;
pub mod crd;
pub mod error;
pub mod graph;
pub mod quantity;
pub mod webhooks;

pub use config::AdmissionConfig;
pub use error::{Error, Result};
pub use graph::{DependencyGraph, GraphError};
pub use webhooks::{FieldError, FieldErrorKind, ValidationContext, ValidationResult};
