//! Domain types for the scalegrid state store.
//!
//! Field names serialize in PascalCase so the same records can be handed
//! to the query API unchanged.

use serde::{Deserialize, Serialize};

// ── Launch configuration ──────────────────────────────────────────

/// Immutable template describing how to launch a worker instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct LaunchConfiguration {
    #[serde(rename = "LaunchConfigurationName")]
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ramdisk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    /// Unix timestamp (seconds) when this configuration was created.
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub struct BlockDeviceMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_name: Option<String>,
}

// ── Auto-scaling group ────────────────────────────────────────────

/// A named group binding one launch configuration to capacity bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct AutoScalingGroup {
    #[serde(rename = "AutoScalingGroupName")]
    pub name: String,
    pub launch_configuration_name: String,
    pub min_size: u32,
    pub max_size: u32,
    /// With an orchestrator this is a write-time cache; reads take the
    /// remote value.
    pub desired_capacity: u32,
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub load_balancer_names: Vec<String>,
    /// Unix timestamp (seconds) when this group was created.
    pub created_at: u64,
    /// Derived on read from the orchestrator; never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<Instance>>,
}

/// A worker instance reported by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Instance {
    pub instance_id: String,
    pub availability_zone: String,
    pub health_status: String,
    pub lifecycle_state: String,
    pub auto_scaling_group_name: String,
    pub launch_configuration_name: String,
}
