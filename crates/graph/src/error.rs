use thiserror::Error;
use town_protocol::{Category, TownId};

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid transition in town {town}: {category} -> {category} is a self-loop")]
    InvalidTransition { town: TownId, category: Category },

    #[error("Unknown town: {0}")]
    UnknownTown(TownId),

    #[error("Store error: {0}")]
    Store(String),
}
