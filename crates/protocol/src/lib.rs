//! # Town Protocol
//!
//! Vocabulary shared by every component of the town recommendation engine:
//! business categories, milestone feature keys, season keys, route windows
//! and town memberships. All wire types serialize as snake_case strings.

mod category;
mod context;
mod error;
mod membership;

pub use category::Category;
pub use context::{FeatureKey, RouteWindow, SeasonKey};
pub use error::{ProtocolError, Result};
pub use membership::{ParticipationLevel, TownId, TownMembership};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;
