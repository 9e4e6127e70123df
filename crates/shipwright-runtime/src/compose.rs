//! Compose runtime collaborator
//!
//! The orchestration core never shells out directly; it goes through the
//! `ComposeRuntime` trait so hook and rolling-update logic can be tested
//! against a recording mock. The real implementation invokes
//! `docker compose` as a subprocess from a release's manifests directory,
//! with the colon-joined manifest list exported as `COMPOSE_FILE`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, RuntimeError};

/// Environment variable naming the active manifest set
pub const COMPOSE_FILE_ENV: &str = "COMPOSE_FILE";

/// A compose-capable runtime accepting verbs (`up`, `config`, `down`, ...)
///
/// Implementations must be Send + Sync for use across async call chains.
#[async_trait]
pub trait ComposeRuntime: Send + Sync {
    /// Run a compose verb, inheriting standard streams
    async fn exec(&self, args: &[String]) -> Result<()>;

    /// Run a compose verb and capture its standard output
    async fn exec_captured(&self, args: &[String]) -> Result<String>;
}

#[async_trait]
impl<T: ComposeRuntime + ?Sized> ComposeRuntime for std::sync::Arc<T> {
    async fn exec(&self, args: &[String]) -> Result<()> {
        (**self).exec(args).await
    }

    async fn exec_captured(&self, args: &[String]) -> Result<String> {
        (**self).exec_captured(args).await
    }
}

/// List the services defined by the active manifest set
pub async fn list_services(runtime: &dyn ComposeRuntime) -> Result<Vec<String>> {
    let output = runtime
        .exec_captured(&["config".to_string(), "--services".to_string()])
        .await?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

/// Subprocess `docker compose` bound to one release's manifests
pub struct DockerCompose {
    working_dir: PathBuf,
    compose_file: String,
}

impl DockerCompose {
    /// `compose_files` are paths relative to `working_dir`, root manifest
    /// first; they become the colon-joined `COMPOSE_FILE` value.
    pub fn new<P: AsRef<Path>>(working_dir: P, compose_files: &[String]) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            compose_file: compose_files.join(":"),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .args(args)
            .current_dir(&self.working_dir)
            .env(COMPOSE_FILE_ENV, &self.compose_file);
        cmd
    }

    fn describe(args: &[String]) -> String {
        format!("docker compose {}", args.join(" "))
    }
}

#[async_trait]
impl ComposeRuntime for DockerCompose {
    async fn exec(&self, args: &[String]) -> Result<()> {
        debug!(compose_file = %self.compose_file, args = ?args, "running docker compose");
        let status = self.command(args).status().await?;
        if !status.success() {
            return Err(RuntimeError::CommandFailed {
                command: Self::describe(args),
                status: status.to_string(),
            });
        }
        Ok(())
    }

    async fn exec_captured(&self, args: &[String]) -> Result<String> {
        let output = self
            .command(args)
            .stdout(Stdio::piped())
            .output()
            .await?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: Self::describe(args),
                status: output.status.to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Recording mock for orchestration tests
#[derive(Default)]
pub struct MockCompose {
    calls: std::sync::Mutex<Vec<Vec<String>>>,
    captured: std::sync::Mutex<std::collections::HashMap<String, String>>,
    fail_on: std::sync::Mutex<Vec<String>>,
}

impl MockCompose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every invocation, in order, as its argument vector
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Canned stdout for a captured invocation, keyed by joined args
    pub fn set_captured(&self, args: &str, output: &str) {
        self.captured
            .lock()
            .unwrap()
            .insert(args.to_string(), output.to_string());
    }

    /// Fail any invocation whose joined args contain this substring
    pub fn fail_on(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    fn record(&self, args: &[String]) -> Result<String> {
        let joined = args.join(" ");
        self.calls.lock().unwrap().push(args.to_vec());
        for needle in self.fail_on.lock().unwrap().iter() {
            if joined.contains(needle.as_str()) {
                return Err(RuntimeError::CommandFailed {
                    command: format!("docker compose {joined}"),
                    status: "exit status: 1".to_string(),
                });
            }
        }
        Ok(self
            .captured
            .lock()
            .unwrap()
            .get(&joined)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ComposeRuntime for MockCompose {
    async fn exec(&self, args: &[String]) -> Result<()> {
        self.record(args).map(|_| ())
    }

    async fn exec_captured(&self, args: &[String]) -> Result<String> {
        self.record(args)
    }
}
