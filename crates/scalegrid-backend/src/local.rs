//! Store-only backend.

use std::time::{SystemTime, UNIX_EPOCH};

use scalegrid_binder::{CreateAutoScalingGroup, CreateLaunchConfiguration};
use scalegrid_core::{Fault, FaultResult};
use scalegrid_state::{AutoScalingGroup, BlockDeviceMapping, LaunchConfiguration, StateStore};
use tracing::{debug, info};

use crate::backend::{GroupBackend, Page};
use crate::paging::{into_page, list_query};

/// Backend whose only source of truth is the local state store.
#[derive(Clone)]
pub struct LocalBackend {
    store: StateStore,
}

impl LocalBackend {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Validate a create request and build the records it would commit.
    ///
    /// Returns the group and the launch configuration it references.
    /// Nothing is written.
    pub fn prepare_group(
        &self,
        req: &CreateAutoScalingGroup,
    ) -> FaultResult<(AutoScalingGroup, LaunchConfiguration)> {
        let lc = self
            .store
            .get_launch_configuration(&req.launch_configuration_name)?
            .ok_or_else(|| {
                Fault::invalid(format!(
                    "launch configuration {} does not exist",
                    req.launch_configuration_name
                ))
            })?;
        if self.store.get_group(&req.name)?.is_some() {
            return Err(Fault::exists(format!(
                "auto scaling group {} already exists",
                req.name
            )));
        }
        let group = AutoScalingGroup {
            name: req.name.clone(),
            launch_configuration_name: req.launch_configuration_name.clone(),
            min_size: req.min_size,
            max_size: req.max_size,
            desired_capacity: req.desired_capacity.unwrap_or(req.min_size),
            availability_zones: req.availability_zones.clone(),
            tags: req.tags.clone(),
            load_balancer_names: req.load_balancer_names.clone(),
            created_at: epoch_secs(),
            instances: None,
        };
        Ok((group, lc))
    }

    /// Persist a prepared group. The store rechecks both preconditions.
    pub fn commit_group(&self, group: &AutoScalingGroup) -> FaultResult<()> {
        self.store.insert_group(group)?;
        info!(group = %group.name, desired = group.desired_capacity, "group created");
        Ok(())
    }

    /// Fetch a group or fail with `InvalidParameterValue`.
    pub fn require_group(&self, name: &str) -> FaultResult<AutoScalingGroup> {
        self.store
            .get_group(name)?
            .ok_or_else(|| group_not_found(name))
    }

    pub fn commit_desired_capacity(&self, name: &str, desired: u32) -> FaultResult<()> {
        if !self.store.set_desired_capacity(name, desired)? {
            return Err(group_not_found(name));
        }
        info!(group = %name, desired, "desired capacity set");
        Ok(())
    }

    pub fn commit_delete(&self, name: &str) -> FaultResult<()> {
        if !self.store.delete_group(name)? {
            return Err(group_not_found(name));
        }
        info!(group = %name, "group deleted");
        Ok(())
    }
}

fn group_not_found(name: &str) -> Fault {
    Fault::invalid(format!("auto scaling group {name} does not exist"))
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl GroupBackend for LocalBackend {
    fn create_launch_configuration(&self, req: CreateLaunchConfiguration) -> FaultResult<()> {
        let lc = LaunchConfiguration {
            name: req.name,
            image_id: req.image_id,
            instance_type: req.instance_type,
            key_name: req.key_name,
            kernel_id: req.kernel_id,
            ramdisk_id: req.ramdisk_id,
            user_data: req.user_data,
            security_groups: req.security_groups,
            block_device_mappings: req
                .block_device_mappings
                .into_iter()
                .map(|m| BlockDeviceMapping {
                    device_name: m.device_name,
                    virtual_name: m.virtual_name,
                })
                .collect(),
            created_at: epoch_secs(),
        };
        self.store.insert_launch_configuration(&lc)?;
        info!(name = %lc.name, image = %lc.image_id, "launch configuration created");
        Ok(())
    }

    fn delete_launch_configuration(&self, name: &str) -> FaultResult<()> {
        if !self.store.delete_launch_configuration(name)? {
            return Err(Fault::invalid(format!(
                "launch configuration {name} does not exist"
            )));
        }
        info!(%name, "launch configuration deleted");
        Ok(())
    }

    fn list_launch_configurations(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<LaunchConfiguration>> {
        let query = list_query(names, max, start_token)?;
        let stored = self.store.list_launch_configurations(&query)?;
        Ok(into_page(stored, |lc| lc.name.as_str()))
    }

    fn create_group(&self, req: CreateAutoScalingGroup) -> FaultResult<()> {
        let (group, _) = self.prepare_group(&req)?;
        self.commit_group(&group)
    }

    fn alter_group(&self, name: &str, desired_capacity: u32, force: bool) -> FaultResult<()> {
        debug!(group = %name, desired_capacity, force, "altering group");
        self.commit_desired_capacity(name, desired_capacity)
    }

    fn list_groups(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<AutoScalingGroup>> {
        let query = list_query(names, max, start_token)?;
        let stored = self.store.list_groups(&query)?;
        Ok(into_page(stored, |g| g.name.as_str()))
    }

    fn delete_group(&self, name: &str, force: bool) -> FaultResult<()> {
        debug!(group = %name, force, "deleting group");
        self.commit_delete(name)
    }
}
