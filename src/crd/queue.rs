//! Queue Custom Resource Definition.
//!
//! Queues are cluster-scoped and form a tree through `spec.parent`. Each queue
//! carries three resource bounds (capability ≥ deserved ≥ guarantee). The
//! hierarchy can also be expressed through the paired `volcano.sh/hierarchy`
//! and `volcano.sh/hierarchy-weights` annotations.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation holding the slash-separated hierarchy path of a queue
pub const HIERARCHY_ANNOTATION: &str = "volcano.sh/hierarchy";

/// Annotation holding the slash-separated weights matching the hierarchy path
pub const HIERARCHY_WEIGHTS_ANNOTATION: &str = "volcano.sh/hierarchy-weights";

/// Resource name → quantity
pub type ResourceList = BTreeMap<String, Quantity>;

/// Queue groups jobs for fair sharing and resource bounds.
#[derive(CustomResource, Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "scheduling.volcano.sh",
    version = "v1beta1",
    kind = "Queue",
    plural = "queues",
    shortname = "q",
    status = "QueueStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Weight", "type":"integer", "jsonPath":".spec.weight"}"#,
    printcolumn = r#"{"name":"Parent", "type":"string", "jsonPath":".spec.parent"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QueueSpec {
    /// Relative share of the parent's resources (must be positive).
    #[serde(default = "default_weight")]
    pub weight: i32,

    /// Upper bound of resources the queue may use.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capability: ResourceList,

    /// Resources the queue is entitled to under contention.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub deserved: ResourceList,

    /// Resources reserved for the queue regardless of contention.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub guarantee: ResourceList,

    /// Parent queue; empty or "root" attaches the queue to the root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,

    /// Whether other queues may reclaim this queue's idle resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reclaimable: Option<bool>,
}

impl Default for QueueSpec {
    fn default() -> Self {
        Self {
            weight: default_weight(),
            capability: ResourceList::new(),
            deserved: ResourceList::new(),
            guarantee: ResourceList::new(),
            parent: String::new(),
            reclaimable: None,
        }
    }
}

fn default_weight() -> i32 {
    1
}

/// Queue status as observed by the scheduler
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Current queue state.
    #[serde(default)]
    pub state: QueueState,

    /// Resources currently allocated to pods in the queue.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allocated: ResourceList,
}

/// Queue lifecycle state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum QueueState {
    /// Accepting new workloads
    #[default]
    Open,
    /// Rejecting new workloads
    Closed,
    /// Transitioning to Closed while workloads drain
    Closing,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Open => write!(f, "Open"),
            QueueState::Closed => write!(f, "Closed"),
            QueueState::Closing => write!(f, "Closing"),
        }
    }
}

impl Queue {
    /// Current state; a queue without status is treated as Open
    pub fn state(&self) -> QueueState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }

    /// Parent queue name, or `None` when attached to `root_queue`
    pub fn parent_name<'a>(&'a self, root_queue: &str) -> Option<&'a str> {
        let parent = self.spec.parent.as_str();
        if parent.is_empty() || parent == root_queue {
            None
        } else {
            Some(parent)
        }
    }

    /// Value of the hierarchy path annotation
    pub fn hierarchy(&self) -> Option<&str> {
        self.annotations()
            .get(HIERARCHY_ANNOTATION)
            .map(String::as_str)
    }

    /// Value of the hierarchy weights annotation
    pub fn hierarchy_weights(&self) -> Option<&str> {
        self.annotations()
            .get(HIERARCHY_WEIGHTS_ANNOTATION)
            .map(String::as_str)
    }

    /// Allocated resources reported in status
    pub fn allocated(&self) -> Option<&ResourceList> {
        self.status.as_ref().map(|s| &s.allocated)
    }
}
