//! Typed requests for every supported action.

use scalegrid_core::{Fault, FaultResult};

use crate::bind::bind;
use crate::bound::Bound;
use crate::params::Params;
use crate::schema::{Kind, Schema};

/// A request type with a declared schema.
pub trait Bind: Sized {
    fn schema() -> Schema;

    fn from_bound(bound: &Bound) -> FaultResult<Self>;

    /// Validate `params` and build the typed request.
    fn bind(params: &Params) -> FaultResult<Self> {
        let bound = bind(&Self::schema(), params)?;
        Self::from_bound(&bound)
    }
}

fn to_u32(key: &str, value: i64) -> FaultResult<u32> {
    u32::try_from(value)
        .map_err(|_| Fault::invalid(format!("parameter {key} value {value} is out of range")))
}

fn opt_u32(bound: &Bound, key: &str) -> FaultResult<Option<u32>> {
    bound.opt_int(key)?.map(|v| to_u32(key, v)).transpose()
}

fn req_u32(bound: &Bound, key: &str) -> FaultResult<u32> {
    to_u32(key, bound.req_int(key)?)
}

fn opt_flag(bound: &Bound, key: &str) -> FaultResult<bool> {
    match bound.opt_str(key)? {
        None => Ok(false),
        Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
        Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
        Some(raw) => Err(Fault::invalid(format!(
            "parameter {key} value '{raw}' is not a boolean"
        ))),
    }
}

// ── Launch configurations ──────────────────────────────────────

/// One `BlockDeviceMappings` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockDeviceMappingInput {
    pub device_name: Option<String>,
    pub virtual_name: Option<String>,
}

impl Bind for BlockDeviceMappingInput {
    fn schema() -> Schema {
        Schema::new("BlockDeviceMapping")
            .optional("DeviceName", Kind::Str)
            .optional("VirtualName", Kind::Str)
            .optional("Ebs", Kind::Ignored)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            device_name: bound.opt_str("DeviceName")?,
            virtual_name: bound.opt_str("VirtualName")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateLaunchConfiguration {
    pub name: String,
    pub image_id: String,
    pub instance_type: String,
    pub key_name: Option<String>,
    pub kernel_id: Option<String>,
    pub ramdisk_id: Option<String>,
    pub user_data: Option<String>,
    pub security_groups: Vec<String>,
    pub block_device_mappings: Vec<BlockDeviceMappingInput>,
}

impl Bind for CreateLaunchConfiguration {
    fn schema() -> Schema {
        Schema::new("CreateLaunchConfiguration")
            .required("LaunchConfigurationName", Kind::Str)
            .required("ImageId", Kind::Str)
            .required("InstanceType", Kind::Str)
            .optional("KeyName", Kind::Str)
            .optional("KernelId", Kind::Str)
            .optional("RamdiskId", Kind::Str)
            .optional("UserData", Kind::Str)
            .optional("InstanceMonitoring", Kind::Ignored)
            .optional_list("SecurityGroups", Kind::Str)
            .optional_list(
                "BlockDeviceMappings",
                Kind::Nested(BlockDeviceMappingInput::schema),
            )
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        let block_device_mappings = bound
            .object_list("BlockDeviceMappings")?
            .into_iter()
            .map(BlockDeviceMappingInput::from_bound)
            .collect::<FaultResult<Vec<_>>>()?;
        Ok(Self {
            name: bound.req_str("LaunchConfigurationName")?,
            image_id: bound.req_str("ImageId")?,
            instance_type: bound.req_str("InstanceType")?,
            key_name: bound.opt_str("KeyName")?,
            kernel_id: bound.opt_str("KernelId")?,
            ramdisk_id: bound.opt_str("RamdiskId")?,
            user_data: bound.opt_str("UserData")?,
            security_groups: bound.str_list("SecurityGroups")?,
            block_device_mappings,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteLaunchConfiguration {
    pub name: String,
}

impl Bind for DeleteLaunchConfiguration {
    fn schema() -> Schema {
        Schema::new("DeleteLaunchConfiguration").required("LaunchConfigurationName", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            name: bound.req_str("LaunchConfigurationName")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeLaunchConfigurations {
    pub names: Vec<String>,
    pub max_records: Option<u32>,
    pub next_token: Option<String>,
}

impl Bind for DescribeLaunchConfigurations {
    fn schema() -> Schema {
        Schema::new("DescribeLaunchConfigurations")
            .optional("MaxRecords", Kind::Int)
            .optional("NextToken", Kind::Str)
            .optional_list("LaunchConfigurationNames", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            names: bound.str_list("LaunchConfigurationNames")?,
            max_records: opt_u32(bound, "MaxRecords")?,
            next_token: bound.opt_str("NextToken")?,
        })
    }
}

// ── Auto-scaling groups ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAutoScalingGroup {
    pub name: String,
    pub launch_configuration_name: String,
    pub min_size: u32,
    pub max_size: u32,
    pub desired_capacity: Option<u32>,
    pub availability_zones: Vec<String>,
    pub tags: Vec<String>,
    pub load_balancer_names: Vec<String>,
}

impl Bind for CreateAutoScalingGroup {
    fn schema() -> Schema {
        Schema::new("CreateAutoScalingGroup")
            .required("AutoScalingGroupName", Kind::Str)
            .required("LaunchConfigurationName", Kind::Str)
            .required("MaxSize", Kind::Int)
            .required("MinSize", Kind::Int)
            .required_list("AvailabilityZones", Kind::Str)
            .optional("DesiredCapacity", Kind::Int)
            .optional("DefaultCooldown", Kind::Ignored)
            .optional("HealthCheckGracePeriod", Kind::Ignored)
            .optional("HealthCheckType", Kind::Ignored)
            .optional("PlacementGroup", Kind::Ignored)
            .optional("VPCZoneIdentifier", Kind::Ignored)
            .optional_list("Tags", Kind::Str)
            .optional_list("LoadBalancerNames", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            name: bound.req_str("AutoScalingGroupName")?,
            launch_configuration_name: bound.req_str("LaunchConfigurationName")?,
            min_size: req_u32(bound, "MinSize")?,
            max_size: req_u32(bound, "MaxSize")?,
            desired_capacity: opt_u32(bound, "DesiredCapacity")?,
            availability_zones: bound.str_list("AvailabilityZones")?,
            tags: bound.str_list("Tags")?,
            load_balancer_names: bound.str_list("LoadBalancerNames")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAutoScalingGroup {
    pub name: String,
    pub force_delete: bool,
}

impl Bind for DeleteAutoScalingGroup {
    fn schema() -> Schema {
        Schema::new("DeleteAutoScalingGroup")
            .required("AutoScalingGroupName", Kind::Str)
            .optional("ForceDelete", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            name: bound.req_str("AutoScalingGroupName")?,
            force_delete: opt_flag(bound, "ForceDelete")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeAutoScalingGroups {
    pub names: Vec<String>,
    pub max_records: Option<u32>,
    pub next_token: Option<String>,
}

impl Bind for DescribeAutoScalingGroups {
    fn schema() -> Schema {
        Schema::new("DescribeAutoScalingGroups")
            .optional("MaxRecords", Kind::Int)
            .optional("NextToken", Kind::Str)
            .optional_list("AutoScalingGroupNames", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            names: bound.str_list("AutoScalingGroupNames")?,
            max_records: opt_u32(bound, "MaxRecords")?,
            next_token: bound.opt_str("NextToken")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDesiredCapacity {
    pub name: String,
    pub desired_capacity: u32,
    pub honor_cooldown: bool,
}

impl Bind for SetDesiredCapacity {
    fn schema() -> Schema {
        Schema::new("SetDesiredCapacity")
            .required("AutoScalingGroupName", Kind::Str)
            .required("DesiredCapacity", Kind::Int)
            .optional("HonorCooldown", Kind::Str)
    }

    fn from_bound(bound: &Bound) -> FaultResult<Self> {
        Ok(Self {
            name: bound.req_str("AutoScalingGroupName")?,
            desired_capacity: req_u32(bound, "DesiredCapacity")?,
            honor_cooldown: opt_flag(bound, "HonorCooldown")?,
        })
    }
}
