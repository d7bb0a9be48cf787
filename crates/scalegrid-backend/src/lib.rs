//! scalegrid-backend — group and launch-configuration lifecycle.
//!
//! Two [`GroupBackend`] variants share one interface:
//!
//! - [`LocalBackend`]: the redb store is the only source of truth.
//! - [`ElasticBackend`]: composes `LocalBackend` and drives an
//!   [`OrchestratorClient`] that actually maintains instance counts.
//!
//! # Consistency
//!
//! The orchestrated variant always calls the orchestrator first and commits
//! locally only after the remote call succeeds. The two steps are not
//! atomic together: a remote success followed by a failed local commit
//! leaves an orphaned remote entity, and nothing compensates for it.
//! Operations on the same group name are serialized by [`NameLocks`].
//!
//! On read, every listed group must be known to the orchestrator; a group
//! missing remotely fails the whole listing with `InternalFailure`.

pub mod backend;
pub mod elastic;
pub mod local;
pub mod locks;
pub mod memory;
pub mod orchestrator;
pub mod paging;

pub use backend::{GroupBackend, Page};
pub use elastic::ElasticBackend;
pub use local::LocalBackend;
pub use locks::NameLocks;
pub use memory::{DEFAULT_MAX_INSTANCES, MemoryOrchestrator, Operation};
pub use orchestrator::{
    EngineConf, EntityConfig, EntityDescription, EntityTemplate, OrchestratorClient,
    OrchestratorError, OrchestratorResult, RemoteInstance,
};
