//! scalegrid-state — embedded state store for scalegrid.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for launch configurations and auto-scaling groups. This is the
//! authoritative local store behind both group backends.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value columns and keyed
//! by name, so table iteration order is name order. Every mutation runs in
//! exactly one write transaction; uniqueness and reference checks happen
//! inside that transaction.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::{ListQuery, StateStore, StoredPage};
pub use types::*;
