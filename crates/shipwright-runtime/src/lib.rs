//! Shipwright Runtime - Container runtime collaborators and orchestration
//!
//! This crate holds everything that talks to the outside world:
//! - `ComposeRuntime`: the compose subprocess contract (plus mock)
//! - `ContainerEngine`: the Docker Engine API contract (plus mock)
//! - `HookRunner`: pre/post lifecycle hooks with readiness waits
//! - `RollingUpdater`: zero-downtime per-service replacement
//! - `Deployer`: the resolve → render → version → apply pipeline
//! - `DependencyFetcher`: git/packaged/local chart dependencies

pub mod compose;
pub mod deploy;
pub mod docker;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod rolling;

pub use compose::{list_services, ComposeRuntime, DockerCompose, MockCompose, COMPOSE_FILE_ENV};
pub use deploy::{
    ComposeFactory, DeployOptions, DeployOutcome, Deployer, DockerComposeFactory,
};
pub use docker::{ContainerEngine, ContainerInfo, DockerEngine, MockEngine};
pub use error::{Result, RuntimeError};
pub use fetch::DependencyFetcher;
pub use hooks::{HookRunner, DEFAULT_HOOK_TIMEOUT};
pub use rolling::{
    has_rolling_enabled, main_service, RollingUpdateConfig, RollingUpdater, UpdateState,
};
