//! Default action - resolve, render, version and apply the stack

use shipwright_core::{LoadedChart, OverrideSpec};
use shipwright_runtime::{DeployOptions, Deployer, DockerComposeFactory, DockerEngine};
use std::path::PathBuf;

use crate::display;
use crate::error::Result;

/// Run the default apply action from the current directory
#[allow(clippy::too_many_arguments)]
pub async fn run(
    values: Vec<PathBuf>,
    set: Vec<String>,
    set_string: Vec<String>,
    set_file: Vec<String>,
    force: bool,
    mut compose_args: Vec<String>,
) -> Result<()> {
    // Tolerate --force anywhere in the passthrough args
    let force = force || compose_args.iter().any(|a| a == "--force");
    compose_args.retain(|a| a != "--force");

    let cwd = std::env::current_dir()?;
    let chart = LoadedChart::load(&cwd)?;
    let engine = DockerEngine::connect()?;
    let factory = DockerComposeFactory;
    let deployer = Deployer::new(&chart, &engine, &factory);

    let opts = DeployOptions {
        overrides: OverrideSpec {
            values_files: values,
            set,
            set_string,
            set_file,
        },
        force,
        compose_args,
    };

    let outcome = deployer.run(&opts).await?;
    if outcome.reused {
        display::print_reused(&outcome.release);
    }
    display::print_banner(&outcome.release, true);
    Ok(())
}
