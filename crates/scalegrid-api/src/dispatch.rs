//! Action dispatch: bind the parameters, call the backend, shape the result.
//!
//! Transport-agnostic; the axum handlers are one caller.

use std::fmt;
use std::str::FromStr;

use scalegrid_backend::GroupBackend;
use scalegrid_binder::{
    Bind, CreateAutoScalingGroup, CreateLaunchConfiguration, DeleteAutoScalingGroup,
    DeleteLaunchConfiguration, DescribeAutoScalingGroups, DescribeLaunchConfigurations, Params,
    SetDesiredCapacity,
};
use scalegrid_core::{Fault, FaultResult};
use scalegrid_state::{AutoScalingGroup, LaunchConfiguration};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateLaunchConfiguration,
    DeleteLaunchConfiguration,
    DescribeLaunchConfigurations,
    CreateAutoScalingGroup,
    DeleteAutoScalingGroup,
    DescribeAutoScalingGroups,
    SetDesiredCapacity,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::CreateLaunchConfiguration,
        Action::DeleteLaunchConfiguration,
        Action::DescribeLaunchConfigurations,
        Action::CreateAutoScalingGroup,
        Action::DeleteAutoScalingGroup,
        Action::DescribeAutoScalingGroups,
        Action::SetDesiredCapacity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::CreateLaunchConfiguration => "CreateLaunchConfiguration",
            Action::DeleteLaunchConfiguration => "DeleteLaunchConfiguration",
            Action::DescribeLaunchConfigurations => "DescribeLaunchConfigurations",
            Action::CreateAutoScalingGroup => "CreateAutoScalingGroup",
            Action::DeleteAutoScalingGroup => "DeleteAutoScalingGroup",
            Action::DescribeAutoScalingGroups => "DescribeAutoScalingGroups",
            Action::SetDesiredCapacity => "SetDesiredCapacity",
        }
    }

    /// Read the `Action` parameter.
    pub fn from_params(params: &Params) -> FaultResult<Self> {
        match params.get("Action") {
            Some(raw) if !raw.is_empty() => raw.parse(),
            _ => Err(Fault::missing("parameter Action missing")),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = Fault;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| Fault::invalid(format!("action {s} is not supported")))
    }
}

/// Typed result of one action, serialized as the `<Action>Result` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    #[serde(rename_all = "PascalCase")]
    LaunchConfigurations {
        launch_configurations: Vec<LaunchConfiguration>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_token: Option<String>,
    },
    #[serde(rename_all = "PascalCase")]
    AutoScalingGroups {
        auto_scaling_groups: Vec<AutoScalingGroup>,
        #[serde(skip_serializing_if = "Option::is_none")]
        next_token: Option<String>,
    },
    /// Mutating actions return an empty result.
    Empty {},
}

/// Run one action end to end. Binding errors abort before the backend is
/// touched.
pub fn dispatch(
    backend: &dyn GroupBackend,
    action: Action,
    params: &Params,
) -> FaultResult<ActionOutput> {
    debug!(%action, params = params.len(), "dispatching");
    match action {
        Action::CreateLaunchConfiguration => {
            backend.create_launch_configuration(CreateLaunchConfiguration::bind(params)?)?;
            Ok(ActionOutput::Empty {})
        }
        Action::DeleteLaunchConfiguration => {
            let req = DeleteLaunchConfiguration::bind(params)?;
            backend.delete_launch_configuration(&req.name)?;
            Ok(ActionOutput::Empty {})
        }
        Action::DescribeLaunchConfigurations => {
            let req = DescribeLaunchConfigurations::bind(params)?;
            let page = backend.list_launch_configurations(
                &req.names,
                req.max_records,
                req.next_token.as_deref(),
            )?;
            Ok(ActionOutput::LaunchConfigurations {
                launch_configurations: page.items,
                next_token: page.next_token,
            })
        }
        Action::CreateAutoScalingGroup => {
            backend.create_group(CreateAutoScalingGroup::bind(params)?)?;
            Ok(ActionOutput::Empty {})
        }
        Action::DeleteAutoScalingGroup => {
            let req = DeleteAutoScalingGroup::bind(params)?;
            backend.delete_group(&req.name, req.force_delete)?;
            Ok(ActionOutput::Empty {})
        }
        Action::DescribeAutoScalingGroups => {
            let req = DescribeAutoScalingGroups::bind(params)?;
            let page =
                backend.list_groups(&req.names, req.max_records, req.next_token.as_deref())?;
            Ok(ActionOutput::AutoScalingGroups {
                auto_scaling_groups: page.items,
                next_token: page.next_token,
            })
        }
        Action::SetDesiredCapacity => {
            let req = SetDesiredCapacity::bind(params)?;
            // skipping the cooldown is the forced form of the change
            backend.alter_group(&req.name, req.desired_capacity, !req.honor_cooldown)?;
            Ok(ActionOutput::Empty {})
        }
    }
}
