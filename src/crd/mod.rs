//! Custom Resource Definitions admitted by the engine.
//!
//! - `Job`: gang of replicated tasks (batch.volcano.sh)
//! - `Queue`, `PodGroup`: scheduling resources (scheduling.volcano.sh)
//! - `JobFlow`: dependency-ordered jobs (flow.volcano.sh)
//! - `HyperNode`: network topology tiers (topology.volcano.sh)

mod hypernode;
mod job;
mod jobflow;
mod podgroup;
mod queue;

pub use hypernode::*;
pub use job::*;
pub use jobflow::*;
pub use podgroup::*;
pub use queue::*;
