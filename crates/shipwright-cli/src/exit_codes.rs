//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Values error - loading, merging or dot-path assignment failed
pub const VALUES_ERROR: i32 = 2;

/// Template error - manifest rendering failed
pub const TEMPLATE_ERROR: i32 = 3;

/// Chart error - invalid chart structure or Chart.yaml
pub const CHART_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;
