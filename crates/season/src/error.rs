use chrono::NaiveDate;
use thiserror::Error;
use town_protocol::{SeasonKey, TownId};

pub type Result<T> = std::result::Result<T, SeasonError>;

#[derive(Error, Debug)]
pub enum SeasonError {
    #[error("Unknown town: {0}")]
    UnknownTown(TownId),

    #[error("Override conflict for {season} in {town}: a row already exists")]
    OverrideConflict { town: TownId, season: SeasonKey },

    #[error("Invalid override window for {season}: {start} is after {end}")]
    InvalidWindow {
        season: SeasonKey,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Invalid calendar rule: {0}")]
    InvalidRule(String),

    #[error("Store error: {0}")]
    Store(String),
}
