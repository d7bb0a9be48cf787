//! Group lifecycle tests.
//!
//! Every property runs against both backends: the local store alone, and
//! the orchestrated backend over the in-process orchestrator.

use std::sync::Arc;

use scalegrid_backend::*;
use scalegrid_binder::{CreateAutoScalingGroup, CreateLaunchConfiguration};
use scalegrid_core::ErrorKind;
use scalegrid_state::StateStore;

fn template() -> EntityTemplate {
    EntityTemplate {
        engine_class: "scalegrid.engine.PreserveN".into(),
        worker_type: "worker".into(),
        deployable_type: "worker".into(),
        site: "ec2-east".into(),
    }
}

fn local() -> LocalBackend {
    LocalBackend::new(StateStore::open_in_memory().unwrap())
}

fn elastic() -> (ElasticBackend, Arc<MemoryOrchestrator>) {
    let orch = Arc::new(MemoryOrchestrator::new());
    let backend = ElasticBackend::new(local(), orch.clone(), template());
    (backend, orch)
}

fn backends() -> Vec<(&'static str, Box<dyn GroupBackend>)> {
    vec![
        ("local", Box::new(local()) as Box<dyn GroupBackend>),
        ("elastic", Box::new(elastic().0) as Box<dyn GroupBackend>),
    ]
}

fn lc(name: &str) -> CreateLaunchConfiguration {
    CreateLaunchConfiguration {
        name: name.into(),
        image_id: "ami-abc".into(),
        instance_type: "m1.small".into(),
        key_name: Some("ops".into()),
        kernel_id: None,
        ramdisk_id: None,
        user_data: None,
        security_groups: vec!["default".into()],
        block_device_mappings: vec![],
    }
}

fn group(name: &str) -> CreateAutoScalingGroup {
    CreateAutoScalingGroup {
        name: name.into(),
        launch_configuration_name: "lc".into(),
        min_size: 1,
        max_size: 5,
        desired_capacity: None,
        availability_zones: vec!["us-east-1".into()],
        tags: vec![],
        load_balancer_names: vec![],
    }
}

fn seeded(backend: &dyn GroupBackend) {
    backend.create_launch_configuration(lc("lc")).unwrap();
}

fn names(backend: &dyn GroupBackend, filter: &[&str]) -> Vec<String> {
    let filter: Vec<String> = filter.iter().map(|s| s.to_string()).collect();
    backend
        .list_groups(&filter, None, None)
        .unwrap()
        .items
        .into_iter()
        .map(|g| g.name)
        .collect()
}

// ── Properties shared by both variants ────────────────────────────

#[test]
fn create_then_list_returns_the_group() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_group(group("G1")).unwrap();

        let page = b.list_groups(&[], None, None).unwrap();
        assert_eq!(page.items.len(), 1, "{label}");
        assert_eq!(page.items[0].name, "G1", "{label}");
        assert_eq!(page.items[0].availability_zones, vec!["us-east-1"], "{label}");
        assert_eq!(page.next_token, None, "{label}");
    }
}

#[test]
fn delete_missing_group_is_invalid_and_changes_nothing() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_group(group("G1")).unwrap();

        let err = b.delete_group("missing", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue, "{label}");
        assert_eq!(names(b.as_ref(), &[]), vec!["G1"], "{label}");
    }
}

#[test]
fn second_create_already_exists() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_group(group("G1")).unwrap();

        let err = b.create_group(group("G1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists, "{label}");
        assert_eq!(names(b.as_ref(), &[]).len(), 1, "{label}");
    }
}

#[test]
fn alter_then_list_reports_new_capacity() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_group(group("G1")).unwrap();
        b.alter_group("G1", 10, false).unwrap();

        let page = b.list_groups(&["G1".into()], None, None).unwrap();
        assert_eq!(page.items[0].desired_capacity, 10, "{label}");
    }
}

#[test]
fn name_filter_ignores_creation_order() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        for name in ["g3", "g0", "g4", "g2", "g1"] {
            b.create_group(group(name)).unwrap();
        }
        assert_eq!(names(b.as_ref(), &["g4", "g1"]), vec!["g1", "g4"], "{label}");
        assert_eq!(names(b.as_ref(), &["g1", "nope"]), vec!["g1"], "{label}");
        assert!(names(b.as_ref(), &["nope"]).is_empty(), "{label}");
    }
}

#[test]
fn delete_all_leaves_nothing() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        for i in 0..5 {
            b.create_group(group(&format!("g{i}"))).unwrap();
        }
        for i in 0..5 {
            b.delete_group(&format!("g{i}"), i % 2 == 0).unwrap();
        }
        assert!(b.list_groups(&[], None, None).unwrap().items.is_empty(), "{label}");
    }
}

#[test]
fn pagination_walks_every_group_once() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        for i in 0..5 {
            b.create_group(group(&format!("g{i}"))).unwrap();
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = b.list_groups(&[], Some(2), token.as_deref()).unwrap();
            assert!(page.items.len() <= 2, "{label}");
            seen.extend(page.items.into_iter().map(|g| g.name));
            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        assert_eq!(seen, vec!["g0", "g1", "g2", "g3", "g4"], "{label}");
    }
}

#[test]
fn bad_paging_arguments_are_invalid() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_group(group("G1")).unwrap();
        let err = b.list_groups(&[], Some(0), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue, "{label}");
        let err = b.list_groups(&[], None, Some("not-hex")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue, "{label}");
    }
}

#[test]
fn launch_configuration_lifecycle() {
    for (label, b) in backends() {
        seeded(b.as_ref());
        b.create_launch_configuration(lc("other")).unwrap();
        assert_eq!(
            b.create_launch_configuration(lc("lc")).unwrap_err().kind(),
            ErrorKind::AlreadyExists,
            "{label}"
        );

        let page = b.list_launch_configurations(&["other".into()], None, None).unwrap();
        assert_eq!(page.items.len(), 1, "{label}");
        assert_eq!(page.items[0].key_name.as_deref(), Some("ops"), "{label}");

        // deleting a referenced configuration does not cascade
        b.create_group(group("G1")).unwrap();
        b.delete_launch_configuration("lc").unwrap();
        assert_eq!(names(b.as_ref(), &[]), vec!["G1"], "{label}");
        assert_eq!(
            b.delete_launch_configuration("lc").unwrap_err().kind(),
            ErrorKind::InvalidParameterValue,
            "{label}"
        );
    }
}

#[test]
fn group_requires_existing_launch_configuration() {
    for (label, b) in backends() {
        let err = b.create_group(group("G1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue, "{label}");
        assert!(names(b.as_ref(), &[]).is_empty(), "{label}");
    }
}

// ── Orchestrated variant ──────────────────────────────────────────

#[test]
fn create_sends_templated_entity() {
    let (b, orch) = elastic();
    seeded(&b);
    let mut req = group("G1");
    req.desired_capacity = Some(2);
    req.availability_zones = vec!["us-west-2a".into()];
    b.create_group(req).unwrap();

    let cfg = orch.config_of("G1").unwrap();
    assert_eq!(cfg.engine_conf.preserve_n, Some(2));
    assert_eq!(cfg.engine_conf.worker_image_id.as_deref(), Some("ami-abc"));
    assert_eq!(cfg.engine_conf.allocation.as_deref(), Some("m1.small"));
    // declared zones do not pick the site
    assert_eq!(cfg.engine_conf.site.as_deref(), Some("ec2-east"));
    assert_eq!(cfg.health.map(|h| h.monitor_health), Some(false));
}

#[test]
fn duplicate_create_adds_no_second_entity() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    assert!(b.create_group(group("G1")).is_err());
    assert_eq!(orch.calls(Operation::Add), 1);
    assert_eq!(orch.list_entities().unwrap(), vec!["G1"]);
}

#[test]
fn externally_removed_entity_is_internal_failure() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    assert!(orch.forget("G1"));

    let err = b.list_groups(&[], None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalFailure);
    assert!(err.detail().contains("G1"));
}

#[test]
fn list_reports_remote_instances() {
    let (b, _orch) = elastic();
    seeded(&b);
    let mut req = group("G1");
    req.desired_capacity = Some(3);
    b.create_group(req).unwrap();

    let page = b.list_groups(&[], None, None).unwrap();
    let instances = page.items[0].instances.as_ref().unwrap();
    assert_eq!(instances.len(), 3);
    for inst in instances {
        assert_eq!(inst.health_status, "running");
        assert_eq!(inst.lifecycle_state, "running");
        assert_eq!(inst.availability_zone, "ec2-east");
        assert_eq!(inst.auto_scaling_group_name, "G1");
        assert_eq!(inst.launch_configuration_name, "lc");
    }
}

#[test]
fn remote_capacity_wins_on_read() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    orch.reconfigure_entity("G1", &EntityConfig::capacity_patch(4)).unwrap();

    let page = b.list_groups(&[], None, None).unwrap();
    assert_eq!(page.items[0].desired_capacity, 4);
    // local cache still holds the write-time value
    let cached = b.local().require_group("G1").unwrap();
    assert_eq!(cached.desired_capacity, 1);
}

#[test]
fn failed_remote_add_persists_nothing() {
    let (b, orch) = elastic();
    seeded(&b);
    orch.fail_next(Operation::Add, OrchestratorError::Transport("broker down".into()));

    let err = b.create_group(group("G1")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalFailure);
    assert!(err.detail().contains("broker down"));
    assert!(b.local().store().get_group("G1").unwrap().is_none());
}

#[test]
fn failed_remote_reconfigure_keeps_local_capacity() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    orch.fail_next(Operation::Reconfigure, OrchestratorError::Rejected("no".into()));

    assert!(b.alter_group("G1", 9, false).is_err());
    assert_eq!(b.local().require_group("G1").unwrap().desired_capacity, 1);
    assert_eq!(orch.describe_entity("G1").unwrap().instances.len(), 1);
}

#[test]
fn oversized_capacity_is_rejected_remotely() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();

    let err = b.alter_group("G1", u32::MAX, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalFailure);
    assert_eq!(b.local().require_group("G1").unwrap().desired_capacity, 1);
    assert_eq!(orch.describe_entity("G1").unwrap().instances.len(), 1);

    let mut req = group("G2");
    req.desired_capacity = Some(DEFAULT_MAX_INSTANCES + 1);
    assert!(b.create_group(req).is_err());
    assert!(b.local().store().get_group("G2").unwrap().is_none());
}

#[test]
fn failed_describe_fails_the_listing() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    b.create_group(group("G2")).unwrap();
    orch.fail_next(Operation::Describe, OrchestratorError::Transport("timeout".into()));

    let err = b.list_groups(&[], None, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InternalFailure);
    assert!(err.detail().contains("timeout"));

    // the failure is not sticky, and nothing was merged into the store
    let page = b.list_groups(&[], None, None).unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(b.local().require_group("G1").unwrap().instances.is_none());
}

#[test]
fn failed_remote_remove_keeps_local_record() {
    let (b, orch) = elastic();
    seeded(&b);
    b.create_group(group("G1")).unwrap();
    orch.fail_next(Operation::Remove, OrchestratorError::Transport("timeout".into()));

    assert!(b.delete_group("G1", true).is_err());
    assert!(b.local().store().get_group("G1").unwrap().is_some());
    b.delete_group("G1", true).unwrap();
    assert!(orch.list_entities().unwrap().is_empty());
}

#[test]
fn unknown_group_never_reaches_orchestrator() {
    let (b, orch) = elastic();
    assert!(b.alter_group("ghost", 2, false).is_err());
    assert!(b.delete_group("ghost", false).is_err());
    assert_eq!(orch.calls(Operation::Reconfigure), 0);
    assert_eq!(orch.calls(Operation::Remove), 0);
}

/// Deletes the launch configuration right after the remote add succeeds,
/// so the following local commit fails.
struct RacingClient {
    inner: MemoryOrchestrator,
    store: StateStore,
}

impl OrchestratorClient for RacingClient {
    fn add_entity(&self, name: &str, config: &EntityConfig) -> OrchestratorResult<()> {
        self.inner.add_entity(name, config)?;
        self.store.delete_launch_configuration("lc").unwrap();
        Ok(())
    }

    fn reconfigure_entity(&self, name: &str, patch: &EntityConfig) -> OrchestratorResult<()> {
        self.inner.reconfigure_entity(name, patch)
    }

    fn remove_entity(&self, name: &str) -> OrchestratorResult<()> {
        self.inner.remove_entity(name)
    }

    fn list_entities(&self) -> OrchestratorResult<Vec<String>> {
        self.inner.list_entities()
    }

    fn describe_entity(&self, name: &str) -> OrchestratorResult<EntityDescription> {
        self.inner.describe_entity(name)
    }
}

#[test]
fn local_commit_failure_orphans_remote_entity() {
    let store = StateStore::open_in_memory().unwrap();
    let client = Arc::new(RacingClient {
        inner: MemoryOrchestrator::new(),
        store: store.clone(),
    });
    let b = ElasticBackend::new(LocalBackend::new(store), client.clone(), template());
    seeded(&b);

    let err = b.create_group(group("G1")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameterValue);
    assert!(b.local().store().get_group("G1").unwrap().is_none());
    // no compensation: the remote entity stays behind
    assert_eq!(client.list_entities().unwrap(), vec!["G1"]);
}

#[test]
fn empty_listing_skips_orchestrator() {
    let (b, orch) = elastic();
    orch.fail_next(Operation::List, OrchestratorError::Transport("down".into()));
    assert!(b.list_groups(&[], None, None).unwrap().items.is_empty());
}

#[test]
fn concurrent_creates_of_one_name_add_one_entity() {
    let (b, orch) = elastic();
    seeded(&b);

    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4).map(|_| s.spawn(|| b.create_group(group("G1")))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(orch.list_entities().unwrap(), vec!["G1"]);
    assert_eq!(orch.calls(Operation::Add), 1);
}
