//! redb table definitions for the scalegrid state store.
//!
//! Both tables use `&str` name keys and `&[u8]` values (JSON-serialized records).

use redb::TableDefinition;

/// A name-keyed table of JSON records.
pub type NamedTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Launch configurations keyed by `LaunchConfigurationName`.
pub const LAUNCH_CONFIGURATIONS: NamedTable = TableDefinition::new("launch_configurations");

/// Auto-scaling groups keyed by `AutoScalingGroupName`.
pub const GROUPS: NamedTable = TableDefinition::new("groups");
