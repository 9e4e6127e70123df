//! The deploy pipeline
//!
//! Wires the components end to end: resolve values, hash them, plan the
//! release, render and persist if a new one is needed, sweep retention,
//! then bracket the compose apply with pre/post hooks. Services with
//! rolling updates enabled are replaced one by one instead of a full
//! recreate.

use shipwright_core::{
    HookKind, LoadedChart, OverrideSpec, ReleasePlan, ReleaseStore, ValueResolver,
};
use shipwright_engine::Renderer;
use std::path::Path;
use tracing::{debug, info};

use crate::compose::{list_services, ComposeRuntime, DockerCompose};
use crate::docker::ContainerEngine;
use crate::error::{Result, RuntimeError};
use crate::hooks::HookRunner;
use crate::rolling::{has_rolling_enabled, RollingUpdateConfig, RollingUpdater};

/// Builds a compose runtime bound to one release's manifests
pub trait ComposeFactory: Send + Sync {
    fn create(&self, working_dir: &Path, compose_files: &[String]) -> Box<dyn ComposeRuntime>;
}

/// Factory for the real `docker compose` subprocess runtime
pub struct DockerComposeFactory;

impl ComposeFactory for DockerComposeFactory {
    fn create(&self, working_dir: &Path, compose_files: &[String]) -> Box<dyn ComposeRuntime> {
        Box::new(DockerCompose::new(working_dir, compose_files))
    }
}

/// Options for one apply invocation
#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    pub overrides: OverrideSpec,
    pub force: bool,
    /// Passed through to the compose runtime; defaults to `up -d`
    pub compose_args: Vec<String>,
}

/// What an apply run produced
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub release: String,
    pub reused: bool,
}

/// Orchestrates resolve → render → version → hooks → apply
pub struct Deployer<'a> {
    chart: &'a LoadedChart,
    engine: &'a dyn ContainerEngine,
    compose_factory: &'a dyn ComposeFactory,
}

impl<'a> Deployer<'a> {
    pub fn new(
        chart: &'a LoadedChart,
        engine: &'a dyn ContainerEngine,
        compose_factory: &'a dyn ComposeFactory,
    ) -> Self {
        Self {
            chart,
            engine,
            compose_factory,
        }
    }

    fn store(&self) -> ReleaseStore {
        ReleaseStore::new(
            self.chart.root.join("dist"),
            self.chart.chart.max_releases(),
        )
    }

    /// The default action: resolve, version, apply
    pub async fn run(&self, opts: &DeployOptions) -> Result<DeployOutcome> {
        let resolver = ValueResolver::new(self.chart);
        let resolved = resolver.resolve(&opts.overrides)?;
        let hash = resolved.merged.content_hash()?;

        let store = self.store();
        let plan = store.plan(&hash, opts.force)?;
        let reused = matches!(plan, ReleasePlan::Reuse { .. });

        if reused {
            info!(release = %plan.name(), "no changes detected, reusing release");
        } else {
            let renderer = Renderer::new();
            let mut manifests: Vec<(String, String)> = renderer
                .render_dir(&self.chart.templates_dir(), &resolved.merged)?
                .into_iter()
                .collect();

            for (child_name, child_dir) in self.chart.child_chart_dirs()? {
                let templates = child_dir.join("templates");
                if !templates.is_dir() {
                    continue;
                }
                let context = resolver.child_context(&resolved, &child_name)?;
                for (file, content) in renderer.render_dir(&templates, &context)? {
                    manifests.push((format!("{child_name}/{file}"), content));
                }
            }

            let snapshot = resolved.merged.to_yaml()?;
            store.persist(
                &plan,
                &snapshot,
                manifests.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )?;
            info!(release = %plan.name(), "created release");
        }

        store.retain()?;

        let release = plan.name().to_string();
        let network = resolved.network_name();
        let hooks = HookRunner::new(self.engine);

        debug!("running pre-hooks");
        hooks
            .run(&self.chart.chart.hooks, HookKind::Pre, &network)
            .await?;

        let compose_files = store.compose_files(&release)?;
        let compose = self
            .compose_factory
            .create(&store.manifests_dir(&release), &compose_files);

        if has_rolling_enabled(&resolved.merged)? {
            let project = resolved.project_name();
            let updater = RollingUpdater::new(compose.as_ref(), self.engine, &project);
            for service in list_services(compose.as_ref()).await? {
                let config = RollingUpdateConfig::resolve(&resolved.merged, &service)?;
                updater.update_service(&service, &config).await?;
            }
        } else {
            compose.exec(&apply_args(opts)).await?;
        }

        debug!("running post-hooks");
        hooks
            .run(&self.chart.chart.hooks, HookKind::Post, &network)
            .await?;

        Ok(DeployOutcome { release, reused })
    }

    /// Copy a prior release forward and apply it
    pub async fn rollback(
        &self,
        target: Option<&str>,
        compose_args: &[String],
    ) -> Result<String> {
        let store = self.store();
        let release = store.rollback(target)?;
        info!(release = %release, "created rollback release");

        let compose_files = store.compose_files(&release)?;
        let compose = self
            .compose_factory
            .create(&store.manifests_dir(&release), &compose_files);

        let args = if compose_args.is_empty() {
            vec!["up".to_string(), "-d".to_string()]
        } else {
            compose_args.to_vec()
        };
        compose.exec(&args).await?;

        Ok(release)
    }

    /// Render everything into a scratch directory and run the runtime's
    /// config check over each manifest. Validator output passes through.
    pub async fn lint(&self) -> Result<()> {
        let resolver = ValueResolver::new(self.chart);
        let resolved = resolver.resolve(&OverrideSpec::default())?;
        let renderer = Renderer::new();

        let scratch = tempfile::Builder::new().prefix("shipwright-lint-").tempdir()?;

        for (file, content) in renderer.render_dir(&self.chart.templates_dir(), &resolved.merged)? {
            std::fs::write(scratch.path().join(file), content)?;
        }
        for (child_name, child_dir) in self.chart.child_chart_dirs()? {
            let templates = child_dir.join("templates");
            if !templates.is_dir() {
                continue;
            }
            let context = resolver.child_context(&resolved, &child_name)?;
            let child_out = scratch.path().join(&child_name);
            std::fs::create_dir_all(&child_out)?;
            for (file, content) in renderer.render_dir(&templates, &context)? {
                std::fs::write(child_out.join(file), content)?;
            }
        }

        let compose = self
            .compose_factory
            .create(scratch.path(), &[]);
        for entry in walkdir::WalkDir::new(scratch.path()) {
            let entry = entry.map_err(|e| {
                RuntimeError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walkdir error without io cause")
                }))
            })?;
            if !entry.file_type().is_file()
                || !entry.path().extension().is_some_and(|e| e == "yml")
            {
                continue;
            }
            let path = entry.path().display().to_string();
            info!(manifest = %path, "linting");
            compose
                .exec(&["-f".to_string(), path.clone(), "config".to_string()])
                .await
                .map_err(|source| RuntimeError::LintFailed {
                    path,
                    source: Box::new(source),
                })?;
        }

        Ok(())
    }
}

fn apply_args(opts: &DeployOptions) -> Vec<String> {
    let mut args = if opts.compose_args.is_empty() {
        vec!["up".to_string(), "-d".to_string()]
    } else {
        opts.compose_args.clone()
    };
    if opts.force
        && let Some(pos) = args.iter().position(|a| a == "up")
    {
        args.insert(pos + 1, "--force-recreate".to_string());
    }
    args
}
