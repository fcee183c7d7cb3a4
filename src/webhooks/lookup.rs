//! Read-only collaborators consulted during admission.
//!
//! Validators and mutators never talk to the API server. The caller hands in
//! a queue store, a namespace store and a plugin registry for each request;
//! the snapshot types here are the in-memory implementations.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use k8s_openapi::api::core::v1::Namespace;
use kube::ResourceExt;

use crate::crd::{QUEUE_NAME_ANNOTATION, Queue};
use crate::error::{Error, Result};

/// Access to the cluster's Queue objects
pub trait QueueLookup {
    /// Fetch one queue by name
    fn get(&self, name: &str) -> Result<Option<Queue>>;

    /// Enumerate every queue
    fn list(&self) -> Result<Vec<Queue>>;
}

/// Access to namespace annotations
pub trait NamespaceLookup {
    /// Queue-name annotation of a namespace, if the annotation is set.
    ///
    /// A namespace that cannot be read is an error, not `None`.
    fn queue_annotation(&self, namespace: &str) -> Result<Option<String>>;
}

/// Set of job plugin names known to the cluster
pub trait PluginRegistry {
    fn contains(&self, name: &str) -> bool;
}

impl PluginRegistry for BTreeSet<String> {
    fn contains(&self, name: &str) -> bool {
        BTreeSet::contains(self, name)
    }
}

impl PluginRegistry for HashSet<String> {
    fn contains(&self, name: &str) -> bool {
        HashSet::contains(self, name)
    }
}

/// Built-in job plugins
pub fn default_job_plugins() -> BTreeSet<String> {
    ["env", "svc", "ssh", "gang", "tensorflow", "mpi", "pytorch", "ray"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Immutable set of queues read once for a decision
#[derive(Clone, Debug, Default)]
pub struct QueueSnapshot {
    queues: BTreeMap<String, Queue>,
}

impl QueueSnapshot {
    pub fn new(queues: impl IntoIterator<Item = Queue>) -> Self {
        queues.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

impl FromIterator<Queue> for QueueSnapshot {
    fn from_iter<T: IntoIterator<Item = Queue>>(iter: T) -> Self {
        let queues = iter.into_iter().map(|q| (q.name_any(), q)).collect();
        Self { queues }
    }
}

impl QueueLookup for QueueSnapshot {
    fn get(&self, name: &str) -> Result<Option<Queue>> {
        Ok(self.queues.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<Queue>> {
        Ok(self.queues.values().cloned().collect())
    }
}

/// Immutable set of namespace annotations read once for a decision
#[derive(Clone, Debug, Default)]
pub struct NamespaceSnapshot {
    queue_annotations: BTreeMap<String, Option<String>>,
}

impl NamespaceSnapshot {
    /// Build from namespace objects, keeping only the queue-name annotation
    pub fn new(namespaces: impl IntoIterator<Item = Namespace>) -> Self {
        let queue_annotations = namespaces
            .into_iter()
            .map(|ns| {
                let annotation = ns.annotations().get(QUEUE_NAME_ANNOTATION).cloned();
                (ns.name_any(), annotation)
            })
            .collect();
        Self { queue_annotations }
    }
}

impl NamespaceLookup for NamespaceSnapshot {
    fn queue_annotation(&self, namespace: &str) -> Result<Option<String>> {
        self.queue_annotations
            .get(namespace)
            .cloned()
            .ok_or_else(|| Error::Lookup(format!("namespace {namespace} not found")))
    }
}
