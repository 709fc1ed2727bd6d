//! # Town Season
//!
//! Resolves which season tags and which route window apply to a town
//! right now.
//!
//! Per season tag, first match wins:
//!
//! 1. override row encodes force-off  → excluded (`forced_off`)
//! 2. override window covers the date → included (`override`)
//! 3. override window misses the date → excluded (`override`), no fallback
//! 4. no override row                 → calendar auto-detection (`auto`)
//!
//! The route window takes an explicit caller override if given, otherwise
//! buckets the injected clock's local time.

mod calendar;
mod error;
mod overrides;
mod resolver;
mod window;

pub use calendar::{MonthDay, SeasonCalendar, SeasonRule};
pub use error::{Result, SeasonError};
pub use overrides::{
    InMemoryOverrideStore, OverrideState, OverrideStore, SeasonOverride, FORCE_OFF_SENTINEL,
};
pub use resolver::{resolve_tags, ResolvedSeason, SeasonDecision, SeasonResolver, SeasonSource};
pub use window::{resolve_window, window_for, Clock, FixedClock, ResolvedWindow, SystemClock, WindowSource};
