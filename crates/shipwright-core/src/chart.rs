//! Chart definition and loading
//!
//! A chart bundles a `Chart.yaml` descriptor, default `values.yaml`, a
//! `templates/` directory, and optionally child charts under `charts/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Default number of releases kept by the retention sweep
pub const DEFAULT_MAX_RELEASES: usize = 20;

/// The Chart.yaml descriptor. Loaded once per invocation, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    /// Chart name (required)
    pub name: String,

    /// Chart version (opaque string; git refs and package versions both
    /// flow through it)
    #[serde(default)]
    pub version: Option<String>,

    /// Child chart dependencies
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Lifecycle hooks, executed in declaration order within their kind
    #[serde(default)]
    pub hooks: Vec<Hook>,

    /// Maximum number of release directories kept under dist/
    #[serde(default)]
    pub max_releases: Option<usize>,
}

impl Chart {
    /// Retention limit, defaulting to [`DEFAULT_MAX_RELEASES`]
    pub fn max_releases(&self) -> usize {
        match self.max_releases {
            Some(n) if n > 0 => n,
            _ => DEFAULT_MAX_RELEASES,
        }
    }

    /// Hooks of the given kind, declaration order preserved
    pub fn hooks_of_kind(&self, kind: HookKind) -> Vec<&Hook> {
        self.hooks.iter().filter(|h| h.kind == kind).collect()
    }
}

/// A chart dependency: local path, git repository, or package repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,

    /// Remote source (git URL or package repo); optional for local charts
    #[serde(default)]
    pub repository: Option<String>,

    /// Version or git ref to fetch
    #[serde(default)]
    pub version: Option<String>,

    /// Path to a local chart, relative to the root chart
    #[serde(default)]
    pub path: Option<String>,
}

impl Dependency {
    /// Does the repository URL point at a git remote?
    pub fn is_git(&self) -> bool {
        self.repository
            .as_deref()
            .is_some_and(|r| r.ends_with(".git") || r.starts_with("git@"))
    }
}

/// When a hook runs relative to the main apply operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookKind {
    Pre,
    Post,
}

impl std::fmt::Display for HookKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookKind::Pre => write!(f, "pre"),
            HookKind::Post => write!(f, "post"),
        }
    }
}

/// A lifecycle hook: either an external command or a one-shot container
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hook {
    pub name: String,

    /// "pre" or "post"
    #[serde(rename = "type")]
    pub kind: HookKind,

    /// External command action (argv); empty when a container is used
    #[serde(default)]
    pub command: Vec<String>,

    /// One-shot container action
    #[serde(default)]
    pub container: Option<ContainerSpec>,

    /// Services that must report a running container before execution
    #[serde(default)]
    pub wait_for: Vec<String>,

    /// Readiness/execution timeout, e.g. "30s" or "1m" (default 5m)
    #[serde(default)]
    pub timeout: Option<String>,
}

/// One-shot container spec for container hooks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image: String,

    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: std::collections::BTreeMap<String, String>,

    /// Docker network to attach to; empty means the deployment's network
    #[serde(default)]
    pub network: String,
}

/// Global configuration block of the values descriptor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalValues {
    #[serde(default)]
    pub project_name: String,

    #[serde(default)]
    pub environment: String,

    #[serde(default)]
    pub default_image_pull_policy: String,

    #[serde(default)]
    pub network: NetworkValues,
}

/// Network configuration inside the global block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkValues {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub alias: String,

    #[serde(default)]
    pub driver: String,
}

/// The values.yaml descriptor: a typed global block plus arbitrary inline
/// chart namespaces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuesFile {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub global: GlobalValues,

    #[serde(flatten)]
    pub values: serde_json::Map<String, serde_json::Value>,
}

/// A chart loaded from disk, with its root path
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub root: PathBuf,
    pub chart: Chart,
}

impl LoadedChart {
    /// Load Chart.yaml from a chart directory
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let descriptor = root.join("Chart.yaml");
        if !descriptor.exists() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(&descriptor)?;
        let chart: Chart = serde_yaml::from_str(&content)?;
        if chart.name.is_empty() {
            return Err(CoreError::InvalidChart {
                message: "chart name must not be empty".to_string(),
            });
        }

        Ok(Self { root, chart })
    }

    /// Path to the chart's default values file
    pub fn values_path(&self) -> PathBuf {
        self.root.join("values.yaml")
    }

    /// Path to the chart's templates directory
    pub fn templates_dir(&self) -> PathBuf {
        self.root.join("templates")
    }

    /// Load the typed values descriptor
    pub fn load_values_file(&self) -> Result<ValuesFile> {
        let content = std::fs::read_to_string(self.values_path())?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load the chart's default values as a raw tree (global block included
    /// as plain data; the resolver recomputes it last)
    pub fn load_default_values(&self) -> Result<Values> {
        Values::from_file(self.values_path())
    }

    /// Child chart directories under charts/, sorted by name. Missing
    /// directory is not an error; charts without children are common.
    pub fn child_chart_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let charts_dir = self.root.join("charts");
        let mut children = Vec::new();
        let entries = match std::fs::read_dir(&charts_dir) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(children),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_dir()
                && let Some(name) = entry.file_name().to_str()
            {
                children.push((name.to_string(), entry.path()));
            }
        }
        children.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_chart(dir: &Path, yaml: &str) {
        std::fs::write(dir.join("Chart.yaml"), yaml).unwrap();
    }

    #[test]
    fn test_load_chart_with_hooks() {
        let dir = tempfile::tempdir().unwrap();
        write_chart(
            dir.path(),
            r#"
name: webapp
version: "1.2.0"
maxReleases: 5
hooks:
  - name: migrate
    type: pre
    command: ["sh", "-c", "echo migrate"]
    waitFor: ["db"]
    timeout: "30s"
  - name: notify
    type: post
    container:
      image: curlimages/curl
      args: ["-X", "POST", "http://hooks.local"]
"#,
        );

        let loaded = LoadedChart::load(dir.path()).unwrap();
        assert_eq!(loaded.chart.name, "webapp");
        assert_eq!(loaded.chart.max_releases(), 5);

        let pre = loaded.chart.hooks_of_kind(HookKind::Pre);
        assert_eq!(pre.len(), 1);
        assert_eq!(pre[0].name, "migrate");
        assert_eq!(pre[0].wait_for, vec!["db"]);

        let post = loaded.chart.hooks_of_kind(HookKind::Post);
        assert_eq!(post.len(), 1);
        assert!(post[0].container.is_some());
    }

    #[test]
    fn test_max_releases_default() {
        let dir = tempfile::tempdir().unwrap();
        write_chart(dir.path(), "name: app\n");
        let loaded = LoadedChart::load(dir.path()).unwrap();
        assert_eq!(loaded.chart.max_releases(), DEFAULT_MAX_RELEASES);
    }

    #[test]
    fn test_missing_chart_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedChart::load(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::ChartNotFound { .. }));
    }

    #[test]
    fn test_dependency_is_git() {
        let dep = |repo: &str| Dependency {
            name: "d".into(),
            repository: Some(repo.into()),
            version: None,
            path: None,
        };
        assert!(dep("https://github.com/acme/charts.git").is_git());
        assert!(dep("git@github.com:acme/charts.git").is_git());
        assert!(!dep("https://charts.acme.io").is_git());
    }

    #[test]
    fn test_values_file_inline_keys() {
        let vf: ValuesFile = serde_yaml::from_str(
            r#"
version: "1"
global:
  projectName: Demo
  environment: staging
  network:
    name: demo-net
    driver: bridge
appName: demo
redis:
  replicas: 2
"#,
        )
        .unwrap();

        assert_eq!(vf.global.project_name, "Demo");
        assert_eq!(vf.global.network.name, "demo-net");
        assert!(vf.values.contains_key("appName"));
        assert!(vf.values.contains_key("redis"));
        assert!(!vf.values.contains_key("global"));
    }

    #[test]
    fn test_child_chart_dirs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_chart(dir.path(), "name: root\n");
        std::fs::create_dir_all(dir.path().join("charts/zeta")).unwrap();
        std::fs::create_dir_all(dir.path().join("charts/alpha")).unwrap();
        std::fs::write(dir.path().join("charts/readme.txt"), "x").unwrap();

        let loaded = LoadedChart::load(dir.path()).unwrap();
        let children = loaded.child_chart_dirs().unwrap();
        let names: Vec<_> = children.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }
}
