//! Lint command - render everything and validate the manifests

use console::style;
use shipwright_core::LoadedChart;
use shipwright_runtime::{Deployer, DockerComposeFactory, DockerEngine};

use crate::error::Result;

/// Render the whole chart into a scratch directory and run the runtime's
/// config check over every manifest
pub async fn run() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let chart = LoadedChart::load(&cwd)?;
    let engine = DockerEngine::connect()?;
    let factory = DockerComposeFactory;
    let deployer = Deployer::new(&chart, &engine, &factory);

    deployer.lint().await?;
    println!(
        "{} All compose manifests linted successfully",
        style("✓").green().bold()
    );
    Ok(())
}
