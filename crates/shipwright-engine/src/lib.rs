//! Shipwright Engine - Jinja2 templating for compose manifests
//!
//! This crate provides a MiniJinja-based template engine with:
//! - The merged values exposed under the `Values` namespace
//! - Lenient undefined handling (missing keys render empty)
//! - Compose-oriented filters (toyaml, quote)

pub mod error;
pub mod filters;
pub mod renderer;

pub use error::{EngineError, Result};
pub use renderer::{output_name, Renderer, MANIFEST_EXT, TEMPLATE_SUFFIX};
