//! CLI commands

pub mod apply;
pub mod dep;
pub mod lint;
pub mod releases;
pub mod rollback;
