//! # Town Graph
//!
//! Per-town category flow graph: "what do locals do next".
//!
//! ## Architecture
//!
//! ```text
//! observed visit (from, to)
//!     │
//!     ├──> FlowGraphStore (atomic weight += 1 per (town, from, to))
//!     │
//!     └──> FlowGraph (petgraph, rebuilt per request from list_edges)
//!            ├─ derive_chain: single greedy walk from the heaviest edge
//!            └─ next_stops:   heaviest outgoing destinations
//! ```
//!
//! The store does no feature gating; whether graph routes are shown is
//! decided by the composer.

mod error;
mod graph;
mod store;
mod types;

pub use error::{GraphError, Result};
pub use graph::{derive_chain, format_chain, FlowGraph, DEFAULT_CHAIN_LENGTH};
pub use store::{record_observed, validate_transition, FlowGraphStore, InMemoryFlowGraphStore};
pub use types::{Contribution, FlowEdge};
