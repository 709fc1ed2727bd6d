use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Graph store error: {0}")]
    Graph(#[from] town_graph::GraphError),

    #[error("Membership store error: {0}")]
    Milestone(#[from] town_milestones::MilestoneError),

    #[error("Override store error: {0}")]
    Season(#[from] town_season::SeasonError),

    #[error("Snapshot lock {path}: {message}")]
    Lock { path: String, message: String },

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Town {key} holds a {kind} row for {row_town}")]
    MisfiledRow {
        key: String,
        kind: &'static str,
        row_town: String,
    },

    #[error("Unsupported snapshot schema_version {found} (expected {expected})")]
    UnsupportedSchema { found: u32, expected: u32 },
}
