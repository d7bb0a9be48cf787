//! The seam to the remote orchestrator that maintains instance counts.
//!
//! An entity is the orchestrator's view of one group: a named config whose
//! engine section carries the instance count to preserve. Reconfiguration
//! sends a partial config; fields left `None` keep their remote value.

use scalegrid_core::Fault;
use scalegrid_core::config::OrchestratorConfig;
use scalegrid_state::LaunchConfiguration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    #[error("orchestrator unreachable: {0}")]
    Transport(String),

    #[error("orchestrator rejected the request: {0}")]
    Rejected(String),

    #[error("orchestrator has no entity named {0}")]
    UnknownEntity(String),

    #[error("orchestrator already has an entity named {0}")]
    DuplicateEntity(String),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

impl From<OrchestratorError> for Fault {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::DuplicateEntity(name) => {
                Fault::exists(format!("auto scaling group {name} already exists"))
            }
            other => Fault::internal(other.to_string()),
        }
    }
}

// ── Entity config ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralConf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthConf>,
    #[serde(default)]
    pub engine_conf: EngineConf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConf {
    pub engine_class: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthConf {
    pub monitor_health: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConf {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_n: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_image_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployable_type: Option<String>,
}

impl EntityConfig {
    /// A partial config that only changes the preserved instance count.
    pub fn capacity_patch(preserve_n: u32) -> Self {
        Self {
            engine_conf: EngineConf {
                preserve_n: Some(preserve_n),
                ..EngineConf::default()
            },
            ..Self::default()
        }
    }

    /// Overlay every field `patch` sets.
    pub fn apply(&mut self, patch: &EntityConfig) {
        if let Some(general) = &patch.general {
            self.general = Some(general.clone());
        }
        if let Some(health) = &patch.health {
            self.health = Some(health.clone());
        }
        let (dst, src) = (&mut self.engine_conf, &patch.engine_conf);
        if src.preserve_n.is_some() {
            dst.preserve_n = src.preserve_n;
        }
        overlay(&mut dst.worker_type, &src.worker_type);
        overlay(&mut dst.worker_image_id, &src.worker_image_id);
        overlay(&mut dst.site, &src.site);
        overlay(&mut dst.allocation, &src.allocation);
        overlay(&mut dst.deployable_type, &src.deployable_type);
    }
}

fn overlay(dst: &mut Option<String>, src: &Option<String>) {
    if let Some(v) = src {
        *dst = Some(v.clone());
    }
}

/// Fixed values every new entity is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTemplate {
    pub engine_class: String,
    pub worker_type: String,
    pub deployable_type: String,
    pub site: String,
}

impl From<&OrchestratorConfig> for EntityTemplate {
    fn from(cfg: &OrchestratorConfig) -> Self {
        Self {
            engine_class: cfg.engine_class.clone(),
            worker_type: cfg.worker_type.clone(),
            deployable_type: cfg.deployable_type.clone(),
            site: cfg.default_site.clone(),
        }
    }
}

impl EntityTemplate {
    /// Full config for a new entity launching `lc` with `preserve_n` workers.
    ///
    /// The group's availability zones are not consulted; every entity goes
    /// to the configured site.
    pub fn entity_config(&self, lc: &LaunchConfiguration, preserve_n: u32) -> EntityConfig {
        EntityConfig {
            general: Some(GeneralConf {
                engine_class: self.engine_class.clone(),
            }),
            health: Some(HealthConf {
                monitor_health: false,
            }),
            engine_conf: EngineConf {
                preserve_n: Some(preserve_n),
                worker_type: Some(self.worker_type.clone()),
                worker_image_id: Some(lc.image_id.clone()),
                site: Some(self.site.clone()),
                allocation: Some(lc.instance_type.clone()),
                deployable_type: Some(self.deployable_type.clone()),
            },
        }
    }
}

// ── Descriptions ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteInstance {
    pub instance_id: String,
    pub state: String,
    pub site: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescription {
    pub name: String,
    pub config: EntityConfig,
    #[serde(default)]
    pub instances: Vec<RemoteInstance>,
}

// ── Client ────────────────────────────────────────────────────────

/// Operations the elastic backend needs from the orchestrator.
///
/// Calls block until the orchestrator answers.
pub trait OrchestratorClient: Send + Sync {
    fn add_entity(&self, name: &str, config: &EntityConfig) -> OrchestratorResult<()>;

    fn reconfigure_entity(&self, name: &str, patch: &EntityConfig) -> OrchestratorResult<()>;

    fn remove_entity(&self, name: &str) -> OrchestratorResult<()>;

    fn list_entities(&self) -> OrchestratorResult<Vec<String>>;

    fn describe_entity(&self, name: &str) -> OrchestratorResult<EntityDescription>;
}
