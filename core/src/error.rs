use thiserror::Error;

use crate::models::{GOAL_MAX, GOAL_MIN};

/// Errors produced by the state layer.
///
/// None of these are fatal: storage failures degrade to defaults or are
/// logged, resolution failures mark a single entry as failed, and the
/// user-facing variants abort only the operation that raised them.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("failed to read '{key}' from storage: {message}")]
    StorageRead { key: String, message: String },

    #[error("failed to write '{key}' to storage: {message}")]
    StorageWrite { key: String, message: String },

    #[error("food lookup failed: {0}")]
    Resolution(String),

    #[error("no saved recipe for '{0}'")]
    RecipeNotFound(String),

    #[error("calorie goal must be an integer between {GOAL_MIN} and {GOAL_MAX}")]
    InvalidGoal,

    #[error("missing {0} API key")]
    MissingCredential(&'static str),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
