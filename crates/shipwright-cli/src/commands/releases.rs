//! Releases command - list generated configuration versions

use shipwright_core::{ReleaseStore, DEFAULT_MAX_RELEASES};

use crate::display;
use crate::error::Result;

/// List every release in `dist/`, newest first
pub fn run() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let store = ReleaseStore::new(cwd.join("dist"), DEFAULT_MAX_RELEASES);
    let entries = store.list()?;
    display::print_releases(&entries);
    Ok(())
}
