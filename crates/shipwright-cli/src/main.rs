//! Shipwright CLI - release manager for docker compose stacks

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "shipwright")]
#[command(version)]
#[command(about = "Release manager for multi-service docker compose stacks", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Values file(s) to overlay, in order
    #[arg(short = 'f', long = "values")]
    values: Vec<PathBuf>,

    /// Set values on the command line (key.path=value)
    #[arg(long = "set")]
    set: Vec<String>,

    /// Set STRING values on the command line (key.path=value)
    #[arg(long = "set-string")]
    set_string: Vec<String>,

    /// Set values from files (key.path=path)
    #[arg(long = "set-file")]
    set_file: Vec<String>,

    /// Force a fresh render and recreate containers
    #[arg(long)]
    force: bool,

    /// Arguments passed through to the compose runtime (default: up -d)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    compose_args: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all generated release versions
    Releases,

    /// Re-apply a previous release as a new version
    Rollback {
        /// Optional release name (v<N>-<hash>) followed by compose args
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Render the chart and validate every manifest
    Lint,

    /// Manage chart dependencies
    Dependency {
        #[command(subcommand)]
        command: DependencyCommands,
    },
}

#[derive(Subcommand)]
enum DependencyCommands {
    /// Fetch every declared dependency into charts/
    Update {
        /// Chart directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },

    /// List declared dependencies
    List {
        /// Chart directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

/// Install the tracing subscriber once, level taken from LOG_LEVEL
fn init_logging() {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<()> {
    miette::set_panic_hook();
    init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        None => {
            commands::apply::run(
                cli.values,
                cli.set,
                cli.set_string,
                cli.set_file,
                cli.force,
                cli.compose_args,
            )
            .await
        }
        Some(Commands::Releases) => commands::releases::run(),
        Some(Commands::Rollback { args }) => commands::rollback::run(args).await,
        Some(Commands::Lint) => commands::lint::run().await,
        Some(Commands::Dependency { command }) => match command {
            DependencyCommands::Update { dir } => commands::dep::update(&dir).await,
            DependencyCommands::List { dir } => commands::dep::list(&dir),
        },
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            std::process::exit(code);
        }
    }
}
