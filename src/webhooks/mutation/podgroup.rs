//! PodGroup queue resolution.
//!
//! A PodGroup still on the default queue picks up the queue named by its
//! namespace's `scheduling.volcano.sh/queue-name` annotation.

use kube::ResourceExt;
use tracing::{debug, info, warn};

use super::patch::PatchOperation;
use crate::config::AdmissionConfig;
use crate::crd::PodGroup;
use crate::webhooks::lookup::NamespaceLookup;

/// Patch `spec.queue` from the namespace annotation.
///
/// Only a PodGroup whose queue is exactly the default queue is considered.
/// An annotation that is present but empty still applies. A failed lookup
/// leaves the queue untouched.
pub fn resolve_queue(
    podgroup: &PodGroup,
    namespaces: &dyn NamespaceLookup,
    config: &AdmissionConfig,
) -> Vec<PatchOperation> {
    if podgroup.spec.queue != config.default_queue {
        return Vec::new();
    }
    let Some(namespace) = podgroup.namespace() else {
        debug!(podgroup = %podgroup.name_any(), "PodGroup has no namespace, queue unchanged");
        return Vec::new();
    };

    match namespaces.queue_annotation(&namespace) {
        Ok(Some(queue)) if queue != podgroup.spec.queue => {
            info!(
                podgroup = %podgroup.name_any(),
                namespace = %namespace,
                queue = %queue,
                "Resolved podgroup queue from namespace"
            );
            vec![PatchOperation::replace("/spec/queue", queue)]
        }
        Ok(_) => Vec::new(),
        Err(e) => {
            warn!(
                podgroup = %podgroup.name_any(),
                namespace = %namespace,
                error = %e,
                "Namespace lookup failed, queue unchanged"
            );
            Vec::new()
        }
    }
}
