//! CLI error types with exit code handling
//!
//! Maps the library-layer errors to a unified diagnostic type carrying an
//! appropriate process exit code.

use miette::Diagnostic;
use shipwright_core::CoreError;
use shipwright_engine::EngineError;
use shipwright_runtime::RuntimeError;
use thiserror::Error;

use crate::exit_codes;

pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Chart structure or loading error
    #[error("Chart error: {message}")]
    #[diagnostic(code(shipwright::cli::chart))]
    Chart { message: String },

    /// Values loading, merging or assignment error
    #[error("Values error: {message}")]
    #[diagnostic(code(shipwright::cli::values))]
    Values { message: String },

    /// Manifest rendering failed
    #[error("Template error: {message}")]
    #[diagnostic(code(shipwright::cli::template))]
    Template { message: String },

    /// Release store error
    #[error("Release error: {message}")]
    #[diagnostic(code(shipwright::cli::release))]
    Release { message: String },

    /// Runtime orchestration error (compose, engine, hooks, rolling)
    #[error("{message}")]
    #[diagnostic(code(shipwright::cli::runtime))]
    Runtime { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(shipwright::cli::io))]
    Io { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Values { .. } => exit_codes::VALUES_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Release { .. } => exit_codes::ERROR,
            CliError::Runtime { .. } => exit_codes::ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ChartNotFound { .. } | CoreError::InvalidChart { .. } => CliError::Chart {
                message: err.to_string(),
            },
            CoreError::ValuesMerge { .. }
            | CoreError::PathConflict { .. }
            | CoreError::YamlParse(_)
            | CoreError::JsonParse(_) => CliError::Values {
                message: err.to_string(),
            },
            CoreError::ReleaseNotFound { .. } | CoreError::NoRollbackTarget => {
                CliError::Release {
                    message: err.to_string(),
                }
            }
            CoreError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            _ => CliError::Template {
                message: err.to_string(),
            },
        }
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Core(core) => core.into(),
            RuntimeError::Engine(engine) => engine.into(),
            RuntimeError::Io(io) => CliError::Io {
                message: io.to_string(),
            },
            other => CliError::Runtime {
                message: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}
