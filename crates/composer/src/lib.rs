//! # Town Composer
//!
//! Builds the daily recommendation pack.
//!
//! ```text
//! FlowGraphStore ─┐
//! MembershipStore ├──> TownContextLoader ──> TownContext ─┐
//! OverrideStore ──┘     (logs + degrades)                 ├──> compose ──> DailyRecommendationPack
//!                        BaseContent + BoostPayloads ─────┘     (pure)
//! ```
//!
//! Boost order is fixed: local → town → story → graph → micro-route →
//! seasonal.

mod compose;
mod loader;
mod types;

pub use compose::compose;
pub use loader::{next_stop_copy, window_anchor, TownContext, TownContextLoader};
pub use types::{
    BaseContent, BoostGate, BoostKind, BoostPayloads, ComposeContext, DailyRecommendationPack,
    Section, SectionKind, SkipReason, SkippedBoost,
};
