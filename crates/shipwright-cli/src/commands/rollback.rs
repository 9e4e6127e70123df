//! Rollback command - re-apply a previous release as a new version

use shipwright_core::LoadedChart;
use shipwright_runtime::{Deployer, DockerComposeFactory, DockerEngine};

use crate::display;
use crate::error::Result;

/// Roll back to an explicit release (`v<N>-<hash>`) or the previous one.
/// Remaining args pass through to the compose runtime.
pub async fn run(args: Vec<String>) -> Result<()> {
    let (target, compose_args) = match args.split_first() {
        Some((first, rest)) if first.starts_with('v') => {
            (Some(first.clone()), rest.to_vec())
        }
        _ => (None, args),
    };

    let cwd = std::env::current_dir()?;
    let chart = LoadedChart::load(&cwd)?;
    let engine = DockerEngine::connect()?;
    let factory = DockerComposeFactory;
    let deployer = Deployer::new(&chart, &engine, &factory);

    match deployer.rollback(target.as_deref(), &compose_args).await {
        Ok(release) => {
            display::print_banner(&release, true);
            println!(
                "New release {} created from {}",
                release,
                target.as_deref().unwrap_or("the previous release")
            );
            Ok(())
        }
        Err(e) => {
            display::print_banner(target.as_deref().unwrap_or("previous"), false);
            Err(e.into())
        }
    }
}
