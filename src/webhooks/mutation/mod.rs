//! Mutating admission: defaults expressed as JSON patches.
//!
//! Mutators never fail. A rule whose input is unavailable simply emits no
//! patch for its field.

pub mod job;
pub mod patch;
pub mod podgroup;

pub use job::{FirstCandidate, SchedulerSelector, compute_defaults, compute_defaults_with};
pub use patch::{PatchOp, PatchOperation, apply_patches};
pub use podgroup::resolve_queue;
