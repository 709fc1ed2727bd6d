use serde::{Deserialize, Serialize};
use town_protocol::Category;

/// Directed, weighted edge: customers at `from` are often next seen at `to`.
///
/// The owning town is implied by the store the edge came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: Category,
    pub to: Category,
    pub weight: u64,
}

impl FlowEdge {
    #[must_use]
    pub const fn new(from: Category, to: Category, weight: u64) -> Self {
        Self { from, to, weight }
    }
}

/// Outcome of [`crate::record_observed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    Recorded { weight: u64 },
    /// The observing business is hidden or inactive.
    Skipped,
}
