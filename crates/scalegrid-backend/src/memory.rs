//! In-process orchestrator.
//!
//! Keeps `preserve_n` instances per entity, all `running` at the entity's
//! site. Serves the daemon's `memory` mode and the test suites; failures
//! can be queued per operation to exercise the backend's error paths.
//!
//! A config asking for more than `max_instances` is rejected before
//! anything is materialised.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::orchestrator::{
    EntityConfig, EntityDescription, OrchestratorClient, OrchestratorError, OrchestratorResult,
    RemoteInstance,
};

const RUNNING: &str = "running";
const UNKNOWN_SITE: &str = "unknown";

/// Per-entity instance cap used by [`MemoryOrchestrator::new`].
pub const DEFAULT_MAX_INSTANCES: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Reconfigure,
    Remove,
    List,
    Describe,
}

#[derive(Debug)]
struct Entity {
    config: EntityConfig,
    instances: Vec<RemoteInstance>,
}

#[derive(Debug, Default)]
struct Inner {
    entities: BTreeMap<String, Entity>,
    next_instance: u64,
    failures: HashMap<Operation, VecDeque<OrchestratorError>>,
    calls: HashMap<Operation, usize>,
}

impl Inner {
    /// Count the call and pop a queued failure for it, if any.
    fn enter(&mut self, op: Operation) -> OrchestratorResult<()> {
        *self.calls.entry(op).or_default() += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn scale(&mut self, name: &str) {
        let Some(entity) = self.entities.get_mut(name) else {
            return;
        };
        let target = entity.config.engine_conf.preserve_n.unwrap_or(0) as usize;
        let site = entity
            .config
            .engine_conf
            .site
            .clone()
            .unwrap_or_else(|| UNKNOWN_SITE.to_string());
        entity.instances.truncate(target);
        while entity.instances.len() < target {
            self.next_instance = self.next_instance.wrapping_add(1);
            entity.instances.push(RemoteInstance {
                instance_id: format!("i-{:08x}", self.next_instance),
                state: RUNNING.to_string(),
                site: site.clone(),
            });
        }
        debug!(entity = %name, instances = target, "entity scaled");
    }
}

#[derive(Debug)]
pub struct MemoryOrchestrator {
    inner: Mutex<Inner>,
    max_instances: u32,
}

impl Default for MemoryOrchestrator {
    fn default() -> Self {
        Self::with_max_instances(DEFAULT_MAX_INSTANCES)
    }
}

impl MemoryOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_instances(max_instances: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_instances,
        }
    }

    fn check_capacity(&self, name: &str, preserve_n: Option<u32>) -> OrchestratorResult<()> {
        match preserve_n {
            Some(n) if n > self.max_instances => Err(OrchestratorError::Rejected(format!(
                "entity {name} asks for {n} instances, the limit is {}",
                self.max_instances
            ))),
            _ => Ok(()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call to `op` fail with `err`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, op: Operation, err: OrchestratorError) {
        self.inner().failures.entry(op).or_default().push_back(err);
    }

    /// Number of calls made to `op`, failed ones included.
    pub fn calls(&self, op: Operation) -> usize {
        self.inner().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn config_of(&self, name: &str) -> Option<EntityConfig> {
        self.inner().entities.get(name).map(|e| e.config.clone())
    }

    /// Drop an entity behind the backend's back.
    pub fn forget(&self, name: &str) -> bool {
        self.inner().entities.remove(name).is_some()
    }
}

impl OrchestratorClient for MemoryOrchestrator {
    fn add_entity(&self, name: &str, config: &EntityConfig) -> OrchestratorResult<()> {
        let mut inner = self.inner();
        inner.enter(Operation::Add)?;
        if inner.entities.contains_key(name) {
            return Err(OrchestratorError::DuplicateEntity(name.to_string()));
        }
        self.check_capacity(name, config.engine_conf.preserve_n)?;
        inner.entities.insert(
            name.to_string(),
            Entity {
                config: config.clone(),
                instances: Vec::new(),
            },
        );
        inner.scale(name);
        Ok(())
    }

    fn reconfigure_entity(&self, name: &str, patch: &EntityConfig) -> OrchestratorResult<()> {
        let mut inner = self.inner();
        inner.enter(Operation::Reconfigure)?;
        let entity = inner
            .entities
            .get_mut(name)
            .ok_or_else(|| OrchestratorError::UnknownEntity(name.to_string()))?;
        self.check_capacity(name, patch.engine_conf.preserve_n)?;
        entity.config.apply(patch);
        inner.scale(name);
        Ok(())
    }

    fn remove_entity(&self, name: &str) -> OrchestratorResult<()> {
        let mut inner = self.inner();
        inner.enter(Operation::Remove)?;
        inner
            .entities
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| OrchestratorError::UnknownEntity(name.to_string()))
    }

    fn list_entities(&self) -> OrchestratorResult<Vec<String>> {
        let mut inner = self.inner();
        inner.enter(Operation::List)?;
        Ok(inner.entities.keys().cloned().collect())
    }

    fn describe_entity(&self, name: &str) -> OrchestratorResult<EntityDescription> {
        let mut inner = self.inner();
        inner.enter(Operation::Describe)?;
        let entity = inner
            .entities
            .get(name)
            .ok_or_else(|| OrchestratorError::UnknownEntity(name.to_string()))?;
        Ok(EntityDescription {
            name: name.to_string(),
            config: entity.config.clone(),
            instances: entity.instances.clone(),
        })
    }
}
