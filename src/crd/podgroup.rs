//! PodGroup Custom Resource Definition.
//!
//! A PodGroup is the unit of gang scheduling: the scheduler places at least
//! `minMember` pods of the group together or none at all.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::queue::ResourceList;

/// Namespace annotation naming the queue for PodGroups that use the default queue
pub const QUEUE_NAME_ANNOTATION: &str = "scheduling.volcano.sh/queue-name";

/// PodGroup is a group of pods scheduled all-or-nothing.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "scheduling.volcano.sh",
    version = "v1beta1",
    kind = "PodGroup",
    plural = "podgroups",
    shortname = "pg",
    namespaced,
    derive = "PartialEq",
    printcolumn = r#"{"name":"MinMember", "type":"integer", "jsonPath":".spec.minMember"}"#,
    printcolumn = r#"{"name":"Queue", "type":"string", "jsonPath":".spec.queue"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodGroupSpec {
    /// Minimum number of pods to schedule together.
    #[serde(default)]
    pub min_member: i32,

    /// Upper bound on group size, when limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_member: Option<i32>,

    /// Per-task minimum members.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub min_task_member: BTreeMap<String, i32>,

    /// Queue of the group. The default queue name means "not yet resolved".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub queue: String,

    /// Priority class of the group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority_class_name: String,

    /// Minimum resources required to start the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_resources: Option<ResourceList>,
}
