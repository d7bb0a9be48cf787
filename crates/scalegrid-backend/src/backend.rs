//! The backend interface the query API dispatches to.

use scalegrid_binder::{CreateAutoScalingGroup, CreateLaunchConfiguration};
use scalegrid_core::FaultResult;
use scalegrid_state::{AutoScalingGroup, LaunchConfiguration};

/// One page of a listing plus the token for the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

/// Group and launch-configuration lifecycle.
///
/// Every call is synchronous; it returns once local (and, if orchestrated,
/// remote) work is done or has failed.
pub trait GroupBackend: Send + Sync {
    fn create_launch_configuration(&self, req: CreateLaunchConfiguration) -> FaultResult<()>;

    fn delete_launch_configuration(&self, name: &str) -> FaultResult<()>;

    /// An empty `names` slice means no filter.
    fn list_launch_configurations(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<LaunchConfiguration>>;

    fn create_group(&self, req: CreateAutoScalingGroup) -> FaultResult<()>;

    fn alter_group(&self, name: &str, desired_capacity: u32, force: bool) -> FaultResult<()>;

    /// An empty `names` slice means no filter. Unknown names are skipped.
    fn list_groups(
        &self,
        names: &[String],
        max: Option<u32>,
        start_token: Option<&str>,
    ) -> FaultResult<Page<AutoScalingGroup>>;

    fn delete_group(&self, name: &str, force: bool) -> FaultResult<()>;
}
