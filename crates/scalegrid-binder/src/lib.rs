//! scalegrid-binder — typed request binding for the query API.
//!
//! Converts a flat, possibly repeated parameter map (as delivered by the
//! Auto Scaling query protocol) into strongly typed request objects.
//!
//! # Binding
//!
//! Each operation declares a [`Schema`]: required and optional scalar keys
//! plus required and optional *list groups*. A list group names a key
//! prefix, and every parameter starting with that prefix is converted and
//! appended, in scan order, to the group's sequence:
//!
//! ```text
//! SecurityGroups.member.1=default          -> SecurityGroups = ["default", "web"]
//! SecurityGroups.member.2=web
//! BlockDeviceMappings.member.1.DeviceName  -> BlockDeviceMappings[0].DeviceName
//! ```
//!
//! Required keys are checked before anything else is converted, so a
//! request missing one never yields a partial object. Empty values are
//! treated as not provided.

pub mod bind;
pub mod bound;
pub mod params;
pub mod requests;
pub mod schema;

pub use bind::bind;
pub use bound::{Bound, Value};
pub use params::Params;
pub use requests::*;
pub use schema::{Kind, Schema};
