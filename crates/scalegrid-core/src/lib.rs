//! scalegrid-core — shared fault taxonomy and daemon configuration.
//!
//! Every layer of scalegrid (binder, store adapter, backends, dispatcher)
//! reports failures as a [`Fault`], which the query API translates into the
//! protocol's `Error { Code, Message }` representation.

pub mod config;
pub mod error;

pub use config::{OrchestratorMode, ScalegridConfig};
pub use error::{ErrorKind, Fault, FaultResult};
