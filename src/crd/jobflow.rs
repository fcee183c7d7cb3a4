//! JobFlow Custom Resource Definition.
//!
//! A JobFlow runs a set of job templates ("flows") in dependency order. Each
//! flow may list target flows that must finish before it starts.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// JobFlow orchestrates jobs as a dependency graph.
///
/// Example:
/// ```yaml
/// apiVersion: flow.volcano.sh/v1alpha1
/// kind: JobFlow
/// metadata:
///   name: pipeline
/// spec:
///   jobRetainPolicy: delete
///   flows:
///     - name: prepare
///     - name: train
///       dependsOn:
///         targets: ["prepare"]
/// ```
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "flow.volcano.sh",
    version = "v1alpha1",
    kind = "JobFlow",
    plural = "jobflows",
    shortname = "jf",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct JobFlowSpec {
    /// Flows in declaration order.
    #[serde(default)]
    pub flows: Vec<Flow>,

    /// What happens to created jobs once the flow completes.
    #[serde(default)]
    pub job_retain_policy: RetainPolicy,
}

/// One job template reference in a JobFlow
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Name of the job template; unique within the JobFlow.
    pub name: String,

    /// Flows that must complete first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<FlowDependsOn>,
}

impl Flow {
    /// Names of the flows this flow waits for
    pub fn targets(&self) -> &[String] {
        self.depends_on
            .as_ref()
            .map(|d| d.targets.as_slice())
            .unwrap_or_default()
    }
}

/// Flow dependency declaration
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowDependsOn {
    /// Flow names this flow depends on.
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Retention of jobs created by a JobFlow
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RetainPolicy {
    /// Keep jobs after the flow finishes
    #[default]
    Retain,
    /// Delete jobs after the flow finishes
    Delete,
}
