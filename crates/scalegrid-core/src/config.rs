//! scalegrid.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScalegridConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the redb database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Which group backend the daemon runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorMode {
    /// The local store is the only source of truth.
    #[default]
    Local,
    /// Groups are driven through the in-process orchestrator.
    Memory,
}

impl std::str::FromStr for OrchestratorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(OrchestratorMode::Local),
            "memory" => Ok(OrchestratorMode::Memory),
            other => Err(format!("unknown orchestrator mode '{other}' (expected local or memory)")),
        }
    }
}

/// Template values for remote entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub mode: OrchestratorMode,
    /// Site given to every remote entity, whatever zones the group declares.
    #[serde(default = "default_site")]
    pub default_site: String,
    #[serde(default = "default_engine_class")]
    pub engine_class: String,
    #[serde(default = "default_worker_type")]
    pub worker_type: String,
    #[serde(default = "default_worker_type")]
    pub deployable_type: String,
    /// Largest instance count the in-process orchestrator will keep for
    /// one entity.
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("/var/lib/scalegrid/scalegrid.redb")
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8445))
}

fn default_site() -> String {
    "ec2-east".to_string()
}

fn default_engine_class() -> String {
    "scalegrid.engine.PreserveN".to_string()
}

fn default_worker_type() -> String {
    "worker".to_string()
}

fn default_max_instances() -> u32 {
    1024
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            mode: OrchestratorMode::default(),
            default_site: default_site(),
            engine_class: default_engine_class(),
            worker_type: default_worker_type(),
            deployable_type: default_worker_type(),
            max_instances: default_max_instances(),
        }
    }
}

impl ScalegridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScalegridConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
