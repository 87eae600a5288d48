use thiserror::Error;

#[derive(Debug, Error)]
pub enum WaypointError {
    #[error("not initialized: run 'waypoint init'")]
    NotInitialized,

    #[error("decision tree not found: {0}")]
    TreeNotFound(String),

    #[error("cannot diff: {0} tree is missing")]
    MissingTree(&'static str),

    #[error("decision record not found: {0}")]
    DecisionNotFound(String),

    #[error("patch target not found: {0}")]
    PatchTarget(String),

    #[error("invalid context entry '{0}': expected key=true|false")]
    InvalidContextEntry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WaypointError>;
