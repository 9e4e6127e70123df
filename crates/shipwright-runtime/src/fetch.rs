//! Dependency chart fetching
//!
//! `dependency update` materializes every declared dependency under the
//! chart's `charts/` directory: local paths are copied, git repositories
//! are cloned (or fetched) and checked out at the pinned version, and
//! anything else is pulled as a packaged chart and extracted. All remote
//! tooling runs as subprocesses.

use shipwright_core::{copy_tree, Dependency, LoadedChart};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

use crate::error::{Result, RuntimeError};

/// Fetches a chart's declared dependencies into `charts/`
pub struct DependencyFetcher<'a> {
    chart: &'a LoadedChart,
}

impl<'a> DependencyFetcher<'a> {
    pub fn new(chart: &'a LoadedChart) -> Self {
        Self { chart }
    }

    /// Fetch or refresh every dependency
    pub async fn update(&self) -> Result<()> {
        let charts_dir = self.chart.root.join("charts");
        std::fs::create_dir_all(&charts_dir)?;

        for dep in &self.chart.chart.dependencies {
            info!(name = %dep.name, "updating dependency");
            let target = charts_dir.join(&dep.name);

            if let Some(path) = &dep.path {
                self.copy_local(dep, path, &target)?;
            } else if dep.is_git() {
                fetch_git(dep, &target).await?;
            } else {
                fetch_packaged(dep, &target).await?;
            }
        }

        Ok(())
    }

    /// One formatted line per dependency
    pub fn list(&self) -> Vec<String> {
        self.chart
            .chart
            .dependencies
            .iter()
            .map(|dep| {
                let version = dep.version.as_deref().unwrap_or("*");
                let source = dep
                    .repository
                    .as_deref()
                    .or(dep.path.as_deref())
                    .unwrap_or("<unknown>");
                format!("{} ({}) from {}", dep.name, version, source)
            })
            .collect()
    }

    fn copy_local(&self, dep: &Dependency, path: &str, target: &Path) -> Result<()> {
        let source = self.chart.root.join(path);
        if !source.exists() {
            return Err(RuntimeError::DependencyPathMissing {
                path: source.display().to_string(),
            });
        }
        if target.exists() {
            std::fs::remove_dir_all(target)?;
        }
        copy_tree(&source, target).map_err(|e| RuntimeError::DependencyFetch {
            name: dep.name.clone(),
            message: e.to_string(),
        })
    }
}

async fn run_tool(dep: &Dependency, program: &str, args: &[&str]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| RuntimeError::DependencyFetch {
            name: dep.name.clone(),
            message: format!("{program}: {e}"),
        })?;
    if !status.success() {
        return Err(RuntimeError::DependencyFetch {
            name: dep.name.clone(),
            message: format!("{program} {} failed with {status}", args.join(" ")),
        });
    }
    Ok(())
}

async fn fetch_git(dep: &Dependency, target: &Path) -> Result<()> {
    let repository = dep.repository.as_deref().unwrap_or_default();
    let target_str = target.display().to_string();

    if target.exists() {
        run_tool(dep, "git", &["-C", &target_str, "fetch", "origin"]).await?;
    } else {
        run_tool(dep, "git", &["clone", repository, &target_str]).await?;
    }

    if let Some(version) = &dep.version {
        run_tool(dep, "git", &["-C", &target_str, "checkout", version]).await?;
    }
    Ok(())
}

async fn fetch_packaged(dep: &Dependency, target: &Path) -> Result<()> {
    let repository = dep.repository.as_deref().unwrap_or_default();
    let version = dep
        .version
        .as_deref()
        .ok_or_else(|| RuntimeError::DependencyFetch {
            name: dep.name.clone(),
            message: "packaged dependencies require a version".to_string(),
        })?;

    let tmp = tempfile::Builder::new().prefix("shipwright-chart-").tempdir()?;
    let tmp_str = tmp.path().display().to_string();

    run_tool(
        dep,
        "helm",
        &[
            "pull",
            "--repo",
            repository,
            "--version",
            version,
            "--destination",
            &tmp_str,
            &dep.name,
        ],
    )
    .await?;

    let archive = tmp.path().join(format!("{}-{}.tgz", dep.name, version));
    let archive_str = archive.display().to_string();
    run_tool(dep, "tar", &["-xf", &archive_str, "-C", &tmp_str]).await?;

    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(tmp.path().join(&dep.name), target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipwright_core::LoadedChart;

    fn chart_with(dir: &Path, chart_yaml: &str) -> LoadedChart {
        std::fs::write(dir.join("Chart.yaml"), chart_yaml).unwrap();
        LoadedChart::load(dir).unwrap()
    }

    #[tokio::test]
    async fn test_local_dependency_copied() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("vendor/redis");
        std::fs::create_dir_all(local.join("templates")).unwrap();
        std::fs::write(local.join("Chart.yaml"), "name: redis\n").unwrap();
        std::fs::write(local.join("templates/docker-compose.yml.tmpl"), "x\n").unwrap();

        let chart = chart_with(
            dir.path(),
            "name: app\ndependencies:\n  - name: redis\n    path: vendor/redis\n",
        );
        DependencyFetcher::new(&chart).update().await.unwrap();

        let copied = dir.path().join("charts/redis");
        assert!(copied.join("Chart.yaml").exists());
        assert!(copied.join("templates/docker-compose.yml.tmpl").exists());
    }

    #[tokio::test]
    async fn test_local_dependency_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("vendor/redis");
        std::fs::create_dir_all(&local).unwrap();
        std::fs::write(local.join("Chart.yaml"), "name: redis\n").unwrap();

        let stale = dir.path().join("charts/redis");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::write(stale.join("stale.txt"), "old\n").unwrap();

        let chart = chart_with(
            dir.path(),
            "name: app\ndependencies:\n  - name: redis\n    path: vendor/redis\n",
        );
        DependencyFetcher::new(&chart).update().await.unwrap();

        assert!(!stale.join("stale.txt").exists());
        assert!(stale.join("Chart.yaml").exists());
    }

    #[tokio::test]
    async fn test_missing_local_path() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart_with(
            dir.path(),
            "name: app\ndependencies:\n  - name: redis\n    path: vendor/nope\n",
        );
        let err = DependencyFetcher::new(&chart).update().await.unwrap_err();
        assert!(matches!(err, RuntimeError::DependencyPathMissing { .. }));
    }

    #[test]
    fn test_list_formatting() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart_with(
            dir.path(),
            concat!(
                "name: app\n",
                "dependencies:\n",
                "  - name: redis\n",
                "    repository: https://charts.example.com\n",
                "    version: 1.2.3\n",
                "  - name: local\n",
                "    path: vendor/local\n",
            ),
        );
        let lines = DependencyFetcher::new(&chart).list();
        assert_eq!(
            lines,
            vec![
                "redis (1.2.3) from https://charts.example.com",
                "local (*) from vendor/local",
            ]
        );
    }
}
