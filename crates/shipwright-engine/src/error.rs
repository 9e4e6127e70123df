//! Error types for the templating engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template error in '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Templates directory not found: {path}")]
    TemplatesDirNotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
