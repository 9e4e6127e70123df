//! Error types for runtime orchestration

use thiserror::Error;

/// Result type for shipwright-runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Errors that can occur while driving the container runtime
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Docker Engine API error
    #[error("Docker API error: {0}")]
    Api(#[from] bollard::errors::Error),

    /// Compose subprocess exited non-zero
    #[error("'{command}' failed with {status}")]
    CommandFailed { command: String, status: String },

    /// Hook execution failed
    #[error("hook '{name}' failed: {message}")]
    HookFailed { name: String, message: String },

    /// Hook container exited non-zero
    #[error("hook '{name}' container exited with code {code}")]
    HookExitCode { name: String, code: i64 },

    /// Hook declared an unparsable timeout
    #[error("invalid timeout '{timeout}' for hook '{name}': {message}")]
    InvalidTimeout {
        name: String,
        timeout: String,
        message: String,
    },

    /// A waited-for service never reached the running state
    #[error("timeout waiting for service '{service}'")]
    ServiceTimeout { service: String },

    /// Rolling update could not observe enough new containers in time
    #[error(
        "rolling update of '{service}' timed out: {observed} of {expected} new containers appeared"
    )]
    ScaleUpTimeout {
        service: String,
        expected: usize,
        observed: usize,
    },

    /// A configuration key held the wrong type
    #[error("invalid value for '{key}': expected {expected}")]
    InvalidConfigValue { key: String, expected: String },

    /// Rolling update requires at least one replica
    #[error("service '{service}' declares {replicas} replicas, need at least 1")]
    InvalidReplicas { service: String, replicas: i64 },

    /// Dependency fetch failed
    #[error("failed to fetch dependency '{name}': {message}")]
    DependencyFetch { name: String, message: String },

    /// Local dependency path does not exist
    #[error("local chart path does not exist: {path}")]
    DependencyPathMissing { path: String },

    /// Manifest validation failure, validator output passed through
    #[error("manifest validation failed for {path}")]
    LintFailed {
        path: String,
        #[source]
        source: Box<RuntimeError>,
    },

    /// Core-layer failure (chart loading, values, release store)
    #[error(transparent)]
    Core(#[from] shipwright_core::CoreError),

    /// Rendering failure
    #[error(transparent)]
    Engine(#[from] shipwright_engine::EngineError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
