//! Orchestrator-driven backend.

use std::collections::BTreeSet;
use std::sync::Arc;

use scalegrid_binder::{CreateAutoScalingGroup, CreateLaunchConfiguration};
use scalegrid_core::{Fault, FaultResult};
use scalegrid_state::{AutoScalingGroup, Instance, LaunchConfiguration};
use tracing::{debug, error, info, warn};

use crate::backend::{GroupBackend, Page};
use crate::local::LocalBackend;
use crate::locks::NameLocks;
use crate::orchestrator::{
    EntityConfig, EntityDescription, EntityTemplate, OrchestratorClient, OrchestratorError,
};

/// Backend where the orchestrator owns instance counts and the local store
/// keeps every other group attribute.
///
/// Writes go remote first and commit locally only on remote success.
pub struct ElasticBackend {
    local: LocalBackend,
    client: Arc<dyn OrchestratorClient>,
    template: EntityTemplate,
    locks: NameLocks,
}

impl ElasticBackend {
    pub fn new(
        local: LocalBackend,
        client: Arc<dyn OrchestratorClient>,
        template: EntityTemplate,
    ) -> Self {
        Self {
            local,
            client,
            template,
            locks: NameLocks::new(),
        }
    }

    pub fn local(&self) -> &LocalBackend {
        &self.local
    }

    fn remote(&self, op: &str, name: &str, e: OrchestratorError) -> Fault {
        warn!(group = %name, op, error = %e, "orchestrator call failed");
        e.into()
    }
}

/// Overlay the orchestrator's view onto a locally stored group.
fn merge_description(group: &mut AutoScalingGroup, desc: EntityDescription) {
    match desc.config.engine_conf.preserve_n {
        Some(n) => group.desired_capacity = n,
        None => warn!(
            group = %group.name,
            cached = group.desired_capacity,
            "orchestrator reported no preserve_n, keeping cached desired capacity"
        ),
    }
    let instances = desc
        .instances
        .into_iter()
        .map(|inst| Instance {
            instance_id: inst.instance_id,
            availability_zone: inst.site,
            health_status: inst.state.clone(),
            lifecycle_state: inst.state,
            auto_scaling_group_name: group.name.clone(),
            launch_configuration_name: group.launch_configuration_name.clone(),
        })
        .collect();
    group.instances = Some(instances);
}

impl GroupBackend for ElasticBackend {
    fn create_launch_configuration(&self, req: CreateLaunchConfiguration) -> FaultResult<()> {
        self.local.create_launch_configuration(req)
    }

    fn delete_launch_configuration(&self, name: &str) -> FaultResult<()> {
        self.local.delete_launch_configuration(name)
    }

    fn list_launch_configurations(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<LaunchConfiguration>> {
        self.local.list_launch_configurations(names, max, start_token)
    }

    fn create_group(&self, req: CreateAutoScalingGroup) -> FaultResult<()> {
        let _guard = self.locks.lock(&req.name);
        let (group, lc) = self.local.prepare_group(&req)?;
        let config = self.template.entity_config(&lc, group.desired_capacity);

        self.client
            .add_entity(&group.name, &config)
            .map_err(|e| self.remote("add", &group.name, e))?;
        debug!(group = %group.name, site = %self.template.site, "remote entity added");

        if let Err(e) = self.local.commit_group(&group) {
            error!(
                group = %group.name,
                error = %e,
                "remote entity created but local commit failed, entity is orphaned"
            );
            return Err(e);
        }
        Ok(())
    }

    fn alter_group(&self, name: &str, desired_capacity: u32, force: bool) -> FaultResult<()> {
        let _guard = self.locks.lock(name);
        self.local.require_group(name)?;
        debug!(group = %name, desired_capacity, force, "reconfiguring remote entity");

        self.client
            .reconfigure_entity(name, &EntityConfig::capacity_patch(desired_capacity))
            .map_err(|e| self.remote("reconfigure", name, e))?;
        self.local.commit_desired_capacity(name, desired_capacity)
    }

    fn list_groups(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<AutoScalingGroup>> {
        let mut page = self.local.list_groups(names, max, start_token)?;
        if page.items.is_empty() {
            return Ok(page);
        }

        let known: BTreeSet<String> = self
            .client
            .list_entities()
            .map_err(|e| self.remote("list", "*", e))?
            .into_iter()
            .collect();

        for group in &mut page.items {
            if !known.contains(&group.name) {
                error!(group = %group.name, "group exists locally but not in the orchestrator");
                return Err(Fault::internal(format!(
                    "auto scaling group {} is unknown to the orchestrator",
                    group.name
                )));
            }
            let desc = self
                .client
                .describe_entity(&group.name)
                .map_err(|e| self.remote("describe", &group.name, e))?;
            merge_description(group, desc);
        }
        Ok(page)
    }

    fn delete_group(&self, name: &str, force: bool) -> FaultResult<()> {
        let _guard = self.locks.lock(name);
        self.local.require_group(name)?;
        if force {
            info!(group = %name, "force delete requested, removing without draining");
        }

        self.client
            .remove_entity(name)
            .map_err(|e| self.remote("remove", name, e))?;
        self.local.commit_delete(name)
    }
}
