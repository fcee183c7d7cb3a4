// Test code is allowed to panic on failure
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

//! Scenario tests for volcano-admission.
//!
//! These tests drive the public entry points the way an admission
//! dispatcher would, with in-memory queue and namespace snapshots.

#[path = "../common/fixtures.rs"]
mod fixtures;

mod job_defaulting_tests {
    use serde_json::json;
    use volcano_admission::AdmissionConfig;
    use volcano_admission::webhooks::mutation::{compute_defaults, apply_patches};

    use crate::fixtures::{JobBuilder, TaskBuilder};

    #[test]
    fn test_min_available_aggregation() {
        let job = JobBuilder::new("agg")
            .task(TaskBuilder::new("a").replicas(2).build())
            .task(TaskBuilder::new("b").replicas(3).min_available(1).build())
            .build();

        let patches = compute_defaults(&job, &AdmissionConfig::default());
        let min_available = patches
            .iter()
            .find(|p| p.path == "/spec/minAvailable")
            .expect("minAvailable patch");
        assert_eq!(min_available.value, json!(3));
    }

    #[test]
    fn test_task_naming_with_prefix() {
        let config = AdmissionConfig::from_json(r#"{"defaultTaskPrefix": "task-"}"#).unwrap();
        let job = JobBuilder::new("named")
            .task(TaskBuilder::unnamed().build())
            .task(TaskBuilder::unnamed().build())
            .task(TaskBuilder::new("custom").build())
            .build();

        let defaulted = apply_patches(&job, &compute_defaults(&job, &config)).unwrap();
        let names: Vec<&str> = defaulted.spec.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["task-0", "task-1", "custom"]);
    }

    #[test]
    fn test_volcano_defaults() {
        // Mirrors the upstream defaulting of an MPI job with two tasks
        let job = JobBuilder::new("mpi")
            .task(TaskBuilder::unnamed().replicas(1).build())
            .task(TaskBuilder::unnamed().replicas(3).host_network().build())
            .plugin("mpi", &[])
            .plugin("svc", &["--enable-networking"])
            .build();

        let defaulted =
            apply_patches(&job, &compute_defaults(&job, &AdmissionConfig::default())).unwrap();
        let spec = &defaulted.spec;
        assert_eq!(spec.queue, "default");
        assert_eq!(spec.scheduler_name, "volcano");
        assert_eq!(spec.max_retry, 3);
        assert_eq!(spec.min_available, 4);
        assert_eq!(spec.tasks[0].name, "default0");
        assert_eq!(spec.tasks[1].name, "default1");
        assert_eq!(spec.tasks[1].min_available, Some(3));
        assert_eq!(spec.tasks[1].max_retry, 3);
        assert_eq!(
            spec.tasks[1]
                .template
                .spec
                .as_ref()
                .and_then(|s| s.dns_policy.as_deref()),
            Some("ClusterFirstWithHostNet")
        );
        assert_eq!(spec.plugins["svc"], vec!["--enable-networking".to_string()]);
        assert!(spec.plugins["ssh"].is_empty());
    }
}

mod job_validation_tests {
    use volcano_admission::AdmissionConfig;
    use volcano_admission::crd::QueueState;
    use volcano_admission::webhooks::mutation::{apply_patches, compute_defaults};
    use volcano_admission::webhooks::policies::job::validate_all;
    use volcano_admission::webhooks::{
        FieldErrorKind, QueueSnapshot, ValidationContext, default_job_plugins,
    };

    use crate::fixtures::{JobBuilder, QueueBuilder, TaskBuilder};

    fn queues() -> QueueSnapshot {
        QueueSnapshot::new(vec![
            QueueBuilder::new("default").build(),
            QueueBuilder::new("closed").state(QueueState::Closed).build(),
        ])
    }

    #[test]
    fn test_defaulted_job_is_admitted() {
        let config = AdmissionConfig::default();
        let job = JobBuilder::new("pipeline")
            .task(TaskBuilder::unnamed().replicas(2).build())
            .task(TaskBuilder::unnamed().replicas(2).depends_on(&["default0"]).build())
            .plugin("pytorch", &[])
            .build();

        let defaulted = apply_patches(&job, &compute_defaults(&job, &config)).unwrap();
        let ctx = ValidationContext::create(&defaulted, &config);
        let result = validate_all(&ctx, &queues(), &default_job_plugins());
        assert!(result.allowed, "{:?}", result.message);
    }

    #[test]
    fn test_closed_queue_rejected() {
        let config = AdmissionConfig::default();
        let job = JobBuilder::new("late")
            .queue("closed")
            .min_available(1)
            .task(TaskBuilder::new("worker").build())
            .build();

        let ctx = ValidationContext::create(&job, &config);
        let result = validate_all(&ctx, &queues(), &default_job_plugins());
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some("InvalidState"));
    }

    #[test]
    fn test_update_queue_change_rejected() {
        let config = AdmissionConfig::default();
        let old = JobBuilder::new("job")
            .queue("default")
            .min_available(2)
            .task(TaskBuilder::new("worker").replicas(2).build())
            .build();
        let new = JobBuilder::new("job")
            .queue("closed")
            .min_available(2)
            .task(TaskBuilder::new("worker").replicas(2).build())
            .build();

        let ctx = ValidationContext::update(&old, &new, &config);
        let result = validate_all(&ctx, &queues(), &default_job_plugins());
        assert!(!result.allowed);
        assert!(result.has_kind(FieldErrorKind::Immutable));
        assert!(result.has_path("spec.queue"));
    }

    #[test]
    fn test_update_scaling_accepted() {
        let config = AdmissionConfig::default();
        let old = JobBuilder::new("job")
            .queue("default")
            .min_available(2)
            .task(TaskBuilder::new("ps").replicas(1).build())
            .task(TaskBuilder::new("worker").replicas(2).build())
            .build();
        let new = JobBuilder::new("job")
            .queue("default")
            .min_available(4)
            .priority_class("high")
            .task(TaskBuilder::new("ps").replicas(1).build())
            .task(TaskBuilder::new("worker").replicas(4).build())
            .build();

        let ctx = ValidationContext::update(&old, &new, &config);
        let result = validate_all(&ctx, &queues(), &default_job_plugins());
        assert!(result.allowed, "{:?}", result.message);
    }
}

mod jobflow_tests {
    use volcano_admission::AdmissionConfig;
    use volcano_admission::crd::{Flow, FlowDependsOn, JobFlow, JobFlowSpec};
    use volcano_admission::webhooks::policies::jobflow;
    use volcano_admission::webhooks::{FieldErrorKind, ValidationContext, ValidationResult};

    fn flow(name: &str, targets: &[&str]) -> Flow {
        Flow {
            name: name.to_string(),
            depends_on: Some(FlowDependsOn {
                targets: targets.iter().map(|t| t.to_string()).collect(),
            }),
        }
    }

    fn validate(flows: Vec<Flow>) -> ValidationResult {
        let jobflow = JobFlow::new(
            "flow",
            JobFlowSpec {
                flows,
                ..Default::default()
            },
        );
        jobflow::validate(&ValidationContext::create(
            &jobflow,
            &AdmissionConfig::default(),
        ))
    }

    #[test]
    fn test_diamond_accepted() {
        let result = validate(vec![flow("a", &[]), flow("b", &["a"]), flow("c", &["a", "b"])]);
        assert!(result.allowed);
    }

    #[test]
    fn test_mutual_dependency_rejected() {
        let result = validate(vec![flow("a", &["b"]), flow("b", &["a"])]);
        assert!(!result.allowed);
        assert!(result.has_kind(FieldErrorKind::Cycle));
        assert!(result.message.unwrap().contains("a -> b -> a"));
    }
}

mod queue_tests {
    use volcano_admission::crd::Queue;
    use volcano_admission::webhooks::policies::queue::{validate_delete, validate_queue};
    use volcano_admission::webhooks::{FieldErrorKind, QueueLookup, QueueSnapshot, ValidationContext};
    use volcano_admission::{AdmissionConfig, Error, Result};

    use crate::fixtures::{QueueBuilder, init_tracing};

    struct UnavailableQueues;

    impl QueueLookup for UnavailableQueues {
        fn get(&self, _name: &str) -> Result<Option<Queue>> {
            Err(Error::Lookup("queue cache not synced".to_string()))
        }

        fn list(&self) -> Result<Vec<Queue>> {
            Err(Error::Lookup("queue cache not synced".to_string()))
        }
    }

    fn cluster() -> QueueSnapshot {
        QueueSnapshot::new(vec![
            QueueBuilder::new("root").build(),
            QueueBuilder::new("default").build(),
            QueueBuilder::new("eng").hierarchy("root/eng", "1/1").build(),
            QueueBuilder::new("ml")
                .parent("eng")
                .hierarchy("root/eng/ml", "1/1/2")
                .build(),
            QueueBuilder::new("web").parent("eng").build(),
        ])
    }

    #[test]
    fn test_deserved_exceeds_capability() {
        let config = AdmissionConfig::default();
        let queue = QueueBuilder::new("q")
            .capability("cpu", "50")
            .deserved("cpu", "80")
            .build();
        let result = validate_queue(&ValidationContext::create(&queue, &config), &cluster());
        assert!(!result.allowed);
        assert!(result.has_path("spec.deserved[cpu]"));
    }

    #[test]
    fn test_ordered_bounds_accepted() {
        let config = AdmissionConfig::default();
        let queue = QueueBuilder::new("q")
            .capability("cpu", "100")
            .deserved("cpu", "80")
            .guarantee("cpu", "20")
            .build();
        let result = validate_queue(&ValidationContext::create(&queue, &config), &cluster());
        assert!(result.allowed, "{:?}", result.message);
    }

    #[test]
    fn test_hierarchy_weight_mismatch() {
        let config = AdmissionConfig::default();
        let queue = QueueBuilder::new("ml2").hierarchy("eng/ml", "2").build();
        let result = validate_queue(&ValidationContext::create(&queue, &config), &cluster());
        assert!(!result.allowed);
        assert_eq!(result.errors[0].kind, FieldErrorKind::InvalidFormat);
    }

    #[test]
    fn test_nested_child_accepted() {
        let config = AdmissionConfig::default();
        let queue = QueueBuilder::new("vision")
            .parent("ml")
            .hierarchy("root/eng/ml/vision", "1/1/2/1")
            .build();
        let result = validate_queue(&ValidationContext::create(&queue, &config), &cluster());
        assert!(result.allowed, "{:?}", result.message);
    }

    #[test]
    fn test_update_child_of_allocated_parent() {
        init_tracing();
        let config = AdmissionConfig::default();
        let queues = QueueSnapshot::new(vec![
            QueueBuilder::new("eng").allocated("cpu", "4").build(),
            QueueBuilder::new("ml").parent("eng").build(),
        ]);
        let old = QueueBuilder::new("ml").parent("eng").build();
        let new = QueueBuilder::new("ml").parent("eng").weight(2).build();

        let result = validate_queue(&ValidationContext::update(&old, &new, &config), &queues);
        assert!(result.allowed, "{:?}", result.message);

        // A new child would make the allocated queue a parent
        let vision = QueueBuilder::new("vision").parent("eng").weight(1).build();
        let created = ValidationContext::create(&vision, &config);
        let queues = QueueSnapshot::new(vec![QueueBuilder::new("eng").allocated("cpu", "4").build()]);
        assert!(validate_queue(&created, &queues).has_kind(FieldErrorKind::InvalidState));
    }

    #[test]
    fn test_queue_listing_failure_denied() {
        init_tracing();
        let config = AdmissionConfig::default();
        let queue = QueueBuilder::new("q").weight(1).build();
        let result = validate_queue(&ValidationContext::create(&queue, &config), &UnavailableQueues);
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some("InternalError"));

        assert!(!validate_delete("q", &UnavailableQueues, &config).allowed);
    }

    #[test]
    fn test_delete_parent_lists_children() {
        let config = AdmissionConfig::default();
        let result = validate_delete("eng", &cluster(), &config);
        assert!(!result.allowed);
        assert!(result.message.unwrap().contains("ml, web"));

        assert!(!validate_delete("root", &cluster(), &config).allowed);
        assert!(validate_delete("web", &cluster(), &config).allowed);
    }
}

mod podgroup_tests {
    use volcano_admission::AdmissionConfig;
    use volcano_admission::webhooks::NamespaceSnapshot;
    use volcano_admission::webhooks::mutation::{apply_patches, resolve_queue};

    use crate::fixtures::{init_tracing, namespace, podgroup};

    fn namespaces() -> NamespaceSnapshot {
        NamespaceSnapshot::new(vec![
            namespace("team-gpu", Some("gpu-queue")),
            namespace("team-plain", None),
        ])
    }

    #[test]
    fn test_default_queue_resolved() {
        let pg = podgroup("pg", "team-gpu", "default");
        let patches = resolve_queue(&pg, &namespaces(), &AdmissionConfig::default());
        let patched = apply_patches(&pg, &patches).unwrap();
        assert_eq!(patched.spec.queue, "gpu-queue");
    }

    #[test]
    fn test_custom_queue_untouched() {
        let pg = podgroup("pg", "team-gpu", "custom");
        assert!(resolve_queue(&pg, &namespaces(), &AdmissionConfig::default()).is_empty());
    }

    #[test]
    fn test_unannotated_namespace_keeps_sentinel() {
        init_tracing();
        let pg = podgroup("pg", "team-plain", "default");
        assert!(resolve_queue(&pg, &namespaces(), &AdmissionConfig::default()).is_empty());

        let unknown = podgroup("pg", "team-unknown", "default");
        assert!(resolve_queue(&unknown, &namespaces(), &AdmissionConfig::default()).is_empty());
    }
}

mod hypernode_tests {
    use volcano_admission::AdmissionConfig;
    use volcano_admission::crd::{
        ExactMatch, HyperNode, HyperNodeSpec, MemberSelector, MemberSpec, MemberType, RegexMatch,
    };
    use volcano_admission::webhooks::ValidationContext;
    use volcano_admission::webhooks::policies::hypernode;

    #[test]
    fn test_mixed_members() {
        let hypernode = HyperNode::new(
            "rack-1",
            HyperNodeSpec {
                tier: 2,
                members: vec![
                    MemberSpec {
                        member_type: MemberType::HyperNode,
                        selector: MemberSelector {
                            exact_match: Some(ExactMatch {
                                name: "s0".to_string(),
                            }),
                            ..Default::default()
                        },
                    },
                    MemberSpec {
                        member_type: MemberType::Node,
                        selector: MemberSelector {
                            regex_match: Some(RegexMatch {
                                pattern: "node-(a|b)".to_string(),
                            }),
                            exact_match: Some(ExactMatch {
                                name: "node-c".to_string(),
                            }),
                            ..Default::default()
                        },
                    },
                ],
            },
        );

        let result = hypernode::validate(&ValidationContext::create(
            &hypernode,
            &AdmissionConfig::default(),
        ));
        assert!(!result.allowed);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "spec.members[1].selector");
    }
}

mod pod_tests {
    use k8s_openapi::api::core::v1::{Pod, PodSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;
    use volcano_admission::AdmissionConfig;
    use volcano_admission::webhooks::ValidationContext;
    use volcano_admission::webhooks::policies::pod::{self, JDB_MIN_AVAILABLE};

    #[test]
    fn test_custom_scheduler_list() {
        let config =
            AdmissionConfig::from_json(r#"{"schedulerNames": ["volcano", "batch"]}"#).unwrap();
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some("p".to_string()),
                annotations: Some(BTreeMap::from([(
                    JDB_MIN_AVAILABLE.to_string(),
                    "0".to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(PodSpec {
                scheduler_name: Some("batch".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = pod::validate(&ValidationContext::create(&pod, &config));
        assert!(!result.allowed);
        assert_eq!(result.reason.as_deref(), Some("InvalidFormat"));
    }
}
