use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Unknown route window: {0}")]
    UnknownWindow(String),

    #[error("Unknown participation level: {0}")]
    UnknownParticipation(String),

    #[error("Invalid season key: {0:?}")]
    InvalidSeasonKey(String),
}
