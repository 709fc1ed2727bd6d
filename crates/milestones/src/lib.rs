//! # Town Milestones
//!
//! Maps a town's count of active, visible businesses to the set of
//! features unlocked for everyone in that town.
//!
//! | active businesses | unlocked |
//! |---|---|
//! | < 3  | nothing |
//! | ≥ 3  | `town_stories` |
//! | ≥ 5  | + `town_pulse_learning` |
//! | ≥ 10 | + `town_graph_routes` |

mod error;
mod store;
mod summary;

pub use error::{MilestoneError, Result};
pub use store::{feature_unlocked, summarize, InMemoryMembershipStore, MembershipStore};
pub use summary::{count_active, is_feature_unlocked, MilestoneSummary, NextMilestone, MILESTONES};
