//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Chart not found: {path}")]
    ChartNotFound { path: String },

    #[error("Invalid Chart.yaml: {message}")]
    InvalidChart { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Values merge error: {message}")]
    ValuesMerge { message: String },

    #[error("Cannot set '{path}': '{segment}' already holds a non-mapping value")]
    PathConflict { path: String, segment: String },

    #[error("Release '{name}' not found")]
    ReleaseNotFound { name: String },

    #[error("No previous release to roll back to")]
    NoRollbackTarget,
}

pub type Result<T> = std::result::Result<T, CoreError>;
