//! HyperNode Custom Resource Definition.
//!
//! A HyperNode groups nodes (or other HyperNodes) into a network-topology
//! tier. Members are chosen by exactly one selector each.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// HyperNode describes one level of the network topology.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "topology.volcano.sh",
    version = "v1alpha1",
    kind = "HyperNode",
    plural = "hypernodes",
    shortname = "hn",
    printcolumn = r#"{"name":"Tier", "type":"integer", "jsonPath":".spec.tier"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HyperNodeSpec {
    /// Topology tier; lower tiers are closer to the nodes.
    #[serde(default)]
    pub tier: i32,

    /// Members of this HyperNode.
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

/// One member entry of a HyperNode
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberSpec {
    /// Whether the member selects nodes or HyperNodes.
    #[serde(default, rename = "type")]
    pub member_type: MemberType,

    /// How members are selected.
    #[serde(default)]
    pub selector: MemberSelector,
}

/// Kind of member selected
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum MemberType {
    #[default]
    Node,
    HyperNode,
}

/// Member selector; exactly one variant must be set
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_match: Option<ExactMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_match: Option<RegexMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_match: Option<LabelSelector>,
}

impl MemberSelector {
    /// Number of selector variants populated
    pub fn populated(&self) -> usize {
        [
            self.exact_match.is_some(),
            self.regex_match.is_some(),
            self.label_match.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

/// Select a member by exact name
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ExactMatch {
    #[serde(default)]
    pub name: String,
}

/// Select members whose names match a regular expression
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RegexMatch {
    #[serde(default)]
    pub pattern: String,
}
