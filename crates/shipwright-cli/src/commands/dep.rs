//! Dependency commands - fetch and list chart dependencies

use console::style;
use shipwright_core::LoadedChart;
use shipwright_runtime::DependencyFetcher;
use std::path::Path;

use crate::error::Result;

/// Fetch every declared dependency into `charts/`
pub async fn update(dir: &Path) -> Result<()> {
    let chart = LoadedChart::load(dir)?;
    DependencyFetcher::new(&chart).update().await?;
    println!("{} Dependencies updated", style("✓").green().bold());
    Ok(())
}

/// List the chart's declared dependencies
pub fn list(dir: &Path) -> Result<()> {
    let chart = LoadedChart::load(dir)?;
    println!("Chart dependencies:");
    for line in DependencyFetcher::new(&chart).list() {
        println!("- {line}");
    }
    Ok(())
}
