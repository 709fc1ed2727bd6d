//! # Town Store
//!
//! File-backed home for the engine's three stores. The whole network is
//! one JSON document:
//!
//! ```text
//! { "schema_version": 1,
//!   "towns": { "<town>": { "memberships": [..], "overrides": [..], "edges": [..] } } }
//! ```
//!
//! Reads and increments happen against the in-memory stores; `save`
//! writes the document back. Writers that may run side by side open the
//! file with [`SnapshotStore::open_exclusive`], which holds an advisory
//! lock on `<path>.lock` until the store is dropped, so each
//! read-modify-write cycle sees the previous writer's result.

mod error;
mod snapshot;

pub use error::{Result, StoreError};
pub use snapshot::{SnapshotStore, TownRecord, TownSnapshot};
