use thiserror::Error;
use town_protocol::TownId;

pub type Result<T> = std::result::Result<T, MilestoneError>;

#[derive(Error, Debug)]
pub enum MilestoneError {
    #[error("Unknown town: {0}")]
    UnknownTown(TownId),

    #[error("Store error: {0}")]
    Store(String),
}
