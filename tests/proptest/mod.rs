// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Property-based tests for volcano-admission.
//!
//! Uses proptest to generate random inputs and verify invariants.

#[path = "../common/fixtures.rs"]
mod fixtures;

use proptest::prelude::*;

use volcano_admission::AdmissionConfig;
use volcano_admission::crd::{
    ExactMatch, HyperNode, HyperNodeSpec, Job, MemberSelector, MemberSpec, RegexMatch,
};
use volcano_admission::graph::DependencyGraph;
use volcano_admission::webhooks::ValidationContext;
use volcano_admission::webhooks::mutation::{apply_patches, compute_defaults};
use volcano_admission::webhooks::policies::{hypernode, queue};

use fixtures::{JobBuilder, QueueBuilder, TaskBuilder};

const PLUGIN_NAMES: &[&str] = &["tensorflow", "mpi", "pytorch", "svc", "ssh", "gang", "env"];

/// Strategy for one task: optional name, replicas, optional minAvailable,
/// retry budget and host networking.
fn any_task() -> impl Strategy<Value = fixtures::TaskBuilder> {
    (
        prop::option::of("[a-z]{1,8}"),
        0..10i32,
        prop::option::of(0..10i32),
        0..4i32,
        any::<bool>(),
    )
        .prop_map(|(name, replicas, min_available, max_retry, host_network)| {
            let mut task = match name {
                Some(name) => TaskBuilder::new(name),
                None => TaskBuilder::unnamed(),
            }
            .replicas(replicas)
            .max_retry(max_retry);
            if let Some(min_available) = min_available {
                task = task.min_available(min_available.min(replicas));
            }
            if host_network {
                task = task.host_network();
            }
            task
        })
}

/// Strategy for jobs with any mix of set and unset defaultable fields.
fn any_job() -> impl Strategy<Value = Job> {
    (
        prop::option::of(prop_oneof![Just("default"), Just("gpu")]),
        prop::option::of(prop_oneof![Just("volcano"), Just("kube-batch")]),
        0..20i32,
        0..5i32,
        prop::collection::vec(any_task(), 1..6),
        prop::sample::subsequence(PLUGIN_NAMES, 0..=PLUGIN_NAMES.len()),
    )
        .prop_map(|(queue, scheduler, min_available, max_retry, tasks, plugins)| {
            let mut builder = JobBuilder::new("prop")
                .min_available(min_available)
                .max_retry(max_retry);
            if let Some(queue) = queue {
                builder = builder.queue(queue);
            }
            if let Some(scheduler) = scheduler {
                builder = builder.scheduler(scheduler);
            }
            for task in tasks {
                builder = builder.task(task.build());
            }
            for plugin in plugins {
                builder = builder.plugin(plugin, &[]);
            }
            builder.build()
        })
}

/// Whether a patch path names a field that was unset in `job`.
fn targets_unset_field(job: &Job, path: &str) -> bool {
    let spec = &job.spec;
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    match segments.as_slice() {
        ["spec", "queue"] => spec.queue.is_empty(),
        ["spec", "schedulerName"] => spec.scheduler_name.is_empty(),
        ["spec", "maxRetry"] => spec.max_retry == 0,
        ["spec", "minAvailable"] => spec.min_available == 0,
        ["spec", "plugins", name] => !spec.plugins.contains_key(*name),
        ["spec", "tasks", index, field @ ..] => {
            let task = &spec.tasks[index.parse::<usize>().unwrap()];
            match field {
                ["name"] => task.name.is_empty(),
                ["minAvailable"] => task.min_available.is_none(),
                ["maxRetry"] => task.max_retry == 0,
                ["template", "spec", "dnsPolicy"] => task
                    .template
                    .spec
                    .as_ref()
                    .is_some_and(|s| s.dns_policy.is_none()),
                _ => false,
            }
        }
        _ => false,
    }
}

fn member(exact: bool, regex: bool, label: bool) -> MemberSpec {
    MemberSpec {
        selector: MemberSelector {
            exact_match: exact.then(|| ExactMatch {
                name: "node-0".to_string(),
            }),
            regex_match: regex.then(|| RegexMatch {
                pattern: "^node-[0-9]+$".to_string(),
            }),
            label_match: label.then(Default::default),
        },
        ..Default::default()
    }
}

proptest! {
    /// Defaulting a defaulted job proposes nothing further.
    #[test]
    fn defaulting_is_idempotent(job in any_job()) {
        let config = AdmissionConfig::default();
        let patches = compute_defaults(&job, &config);
        let defaulted = apply_patches(&job, &patches).unwrap();
        let again = compute_defaults(&defaulted, &config);
        prop_assert!(again.is_empty(), "second pass produced {:?}", again);
    }

    /// Every patch targets a field that was unset; explicit values survive.
    #[test]
    fn defaulting_never_overwrites(job in any_job()) {
        let config = AdmissionConfig::default();
        for patch in compute_defaults(&job, &config) {
            prop_assert!(
                targets_unset_field(&job, &patch.path),
                "patch overwrote {}", patch.path
            );
        }

        let defaulted = apply_patches(&job, &compute_defaults(&job, &config)).unwrap();
        if !job.spec.queue.is_empty() {
            prop_assert_eq!(&defaulted.spec.queue, &job.spec.queue);
        }
        if job.spec.min_available != 0 {
            prop_assert_eq!(defaulted.spec.min_available, job.spec.min_available);
        }
        for (before, after) in job.spec.tasks.iter().zip(&defaulted.spec.tasks) {
            if !before.name.is_empty() {
                prop_assert_eq!(&after.name, &before.name);
            }
        }
    }

    /// A HyperNode passes iff every member has exactly one selector.
    #[test]
    fn hypernode_exactly_one_selector(
        selectors in prop::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 1..6)
    ) {
        let members: Vec<MemberSpec> = selectors
            .iter()
            .map(|(e, r, l)| member(*e, *r, *l))
            .collect();
        let expected = selectors
            .iter()
            .all(|(e, r, l)| usize::from(*e) + usize::from(*r) + usize::from(*l) == 1);

        let hypernode = HyperNode::new("hn", HyperNodeSpec { tier: 1, members });
        let config = AdmissionConfig::default();
        let result = hypernode::validate(&ValidationContext::create(&hypernode, &config));
        prop_assert_eq!(result.allowed, expected);
    }

    /// A chain is acyclic; closing it with a back edge creates a cycle.
    #[test]
    fn chain_with_back_edge(len in 1..50usize) {
        let names: Vec<String> = (0..len).map(|i| format!("n{i}")).collect();
        let chain: Vec<(String, Vec<String>)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), names.get(i + 1).cloned().into_iter().collect()))
            .collect();
        prop_assert!(DependencyGraph::new(chain.clone()).unwrap().is_acyclic());

        let mut closed = chain;
        closed[len - 1].1.push(names[0].clone());
        let cycle = DependencyGraph::new(closed).unwrap().find_cycle().unwrap();
        prop_assert_eq!(cycle.first(), cycle.last());
        prop_assert_eq!(cycle.len(), len + 1);
    }

    /// Ordered bounds pass; deserved above capability fails.
    #[test]
    fn queue_bounds_ordering(capability in 1..1000u32, deserved in 1..1000u32, guarantee in 1..1000u32) {
        let q = QueueBuilder::new("q")
            .capability("cpu", &capability.to_string())
            .deserved("cpu", &format!("{deserved}"))
            .guarantee("cpu", &guarantee.to_string())
            .build();
        let errors = queue::validate_resource_ordering(&q);
        let ordered = capability >= deserved && deserved >= guarantee;
        prop_assert_eq!(errors.is_empty(), ordered);
    }
}
