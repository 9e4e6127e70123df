//! Shipwright Core - Core types and utilities for the compose release manager
//!
//! This crate provides the foundational types used throughout Shipwright:
//! - `Chart`: The stack definition (services, dependencies, hooks)
//! - `Values`: Configuration values with deep merge and content hashing
//! - `ValueResolver`: Layered resolution of defaults, files and overrides
//! - `ReleaseStore`: Content-addressed, append-only release directories

pub mod chart;
pub mod error;
pub mod release;
pub mod resolver;
pub mod values;

pub use chart::{
    Chart, ContainerSpec, Dependency, GlobalValues, Hook, HookKind, LoadedChart, NetworkValues,
    ValuesFile, DEFAULT_MAX_RELEASES,
};
pub use error::{CoreError, Result};
pub use release::{
    copy_tree, ReleaseEntry, ReleasePlan, ReleaseStore, MANIFESTS_DIR, MANIFEST_FILE,
    SNAPSHOT_FILE,
};
pub use resolver::{OverrideSpec, ResolvedValues, ValueResolver};
pub use values::{
    hash8, parse_set_file_values, parse_set_string_values, parse_set_values, Values,
};
