//! Hook orchestration
//!
//! Hooks of the requested kind run in declaration order. All timeout
//! strings are parsed before anything executes, so a malformed timeout
//! aborts the batch without side effects. Each hook first waits for its
//! `waitFor` services to report running, then runs either an external
//! command (inheriting standard streams) or a one-shot container through
//! the engine's create/start/wait/logs/inspect/remove lifecycle.

use shipwright_core::{ContainerSpec, Hook, HookKind};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::docker::ContainerEngine;
use crate::error::{Result, RuntimeError};

/// Applied when a hook declares no timeout
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Executes a chart's pre/post hooks against the container engine
pub struct HookRunner<'a> {
    engine: &'a dyn ContainerEngine,
    poll_interval: Duration,
}

impl<'a> HookRunner<'a> {
    pub fn new(engine: &'a dyn ContainerEngine) -> Self {
        Self {
            engine,
            poll_interval: Duration::from_secs(1),
        }
    }

    /// Override the readiness polling interval (tests)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run every hook of `kind`, in declaration order. The first failure
    /// aborts the batch; hooks not yet started are never attempted.
    pub async fn run(&self, hooks: &[Hook], kind: HookKind, network: &str) -> Result<()> {
        let selected: Vec<&Hook> = hooks.iter().filter(|h| h.kind == kind).collect();

        // Parse every timeout before any hook runs.
        let mut timeouts = Vec::with_capacity(selected.len());
        for hook in &selected {
            timeouts.push(hook_timeout(hook)?);
        }

        for (hook, timeout) in selected.iter().zip(timeouts) {
            info!(kind = %hook.kind, name = %hook.name, "executing hook");
            self.wait_for_services(&hook.wait_for, timeout, &hook.name)
                .await?;
            self.execute(hook, network).await?;
        }

        Ok(())
    }

    /// Poll until each service has a running container under its exact
    /// name, or the hook's timeout elapses.
    async fn wait_for_services(
        &self,
        services: &[String],
        timeout: Duration,
        hook_name: &str,
    ) -> Result<()> {
        if services.is_empty() {
            return Ok(());
        }

        let deadline = Instant::now() + timeout;
        for service in services {
            info!(service = %service, hook = %hook_name, "waiting for service");
            loop {
                let containers = self.engine.list_named(&format!("^{service}$")).await?;
                if containers.iter().any(|c| c.is_running()) {
                    info!(service = %service, "service is ready");
                    break;
                }
                if Instant::now() >= deadline {
                    return Err(RuntimeError::ServiceTimeout {
                        service: service.clone(),
                    });
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Ok(())
    }

    async fn execute(&self, hook: &Hook, network: &str) -> Result<()> {
        if !hook.command.is_empty() {
            return run_command_hook(hook).await;
        }
        if let Some(container) = &hook.container {
            return self.run_container_hook(hook, container, network).await;
        }
        Ok(())
    }

    async fn run_container_hook(
        &self,
        hook: &Hook,
        container: &ContainerSpec,
        network: &str,
    ) -> Result<()> {
        let mut spec = container.clone();
        if spec.network.is_empty() {
            spec.network = network.to_string();
        }

        let container_name = format!("{}-hook-{}", hook.kind, hook.name);
        let id = self.engine.create(&container_name, &spec).await?;

        self.engine.start(&id).await?;
        self.engine.wait_stopped(&id).await?;
        self.engine.print_logs(&id).await?;

        let code = self.engine.exit_code(&id).await?;
        if code != 0 {
            // The container is left in place for inspection.
            return Err(RuntimeError::HookExitCode {
                name: hook.name.clone(),
                code,
            });
        }

        self.engine.remove(&id).await?;
        self.engine.wait_removed(&id).await?;
        debug!(id, "hook container removed");
        Ok(())
    }
}

/// Parse a hook's timeout string, defaulting to five minutes
fn hook_timeout(hook: &Hook) -> Result<Duration> {
    match &hook.timeout {
        None => Ok(DEFAULT_HOOK_TIMEOUT),
        Some(s) => humantime::parse_duration(s).map_err(|e| RuntimeError::InvalidTimeout {
            name: hook.name.clone(),
            timeout: s.clone(),
            message: e.to_string(),
        }),
    }
}

async fn run_command_hook(hook: &Hook) -> Result<()> {
    let status = tokio::process::Command::new(&hook.command[0])
        .args(&hook.command[1..])
        .status()
        .await
        .map_err(|e| RuntimeError::HookFailed {
            name: hook.name.clone(),
            message: e.to_string(),
        })?;
    if !status.success() {
        return Err(RuntimeError::HookFailed {
            name: hook.name.clone(),
            message: status.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::MockEngine;
    use std::collections::BTreeMap;

    fn container_hook(name: &str, kind: HookKind) -> Hook {
        Hook {
            name: name.to_string(),
            kind,
            command: vec![],
            container: Some(ContainerSpec {
                image: "migrate:latest".to_string(),
                command: vec!["migrate".to_string()],
                args: vec![],
                env: BTreeMap::new(),
                network: String::new(),
            }),
            wait_for: vec![],
            timeout: None,
        }
    }

    fn command_hook(name: &str, kind: HookKind, command: &[&str]) -> Hook {
        Hook {
            name: name.to_string(),
            kind,
            command: command.iter().map(|s| s.to_string()).collect(),
            container: None,
            wait_for: vec![],
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_container_hook_lifecycle() {
        let engine = MockEngine::new();
        let runner = HookRunner::new(&engine);
        let hooks = vec![container_hook("migrate", HookKind::Pre)];

        runner.run(&hooks, HookKind::Pre, "appnet").await.unwrap();

        assert_eq!(
            engine.events(),
            vec![
                "create pre-hook-migrate",
                "start pre-hook-migrate",
                "wait pre-hook-migrate",
                "logs pre-hook-migrate",
                "inspect pre-hook-migrate",
                "remove pre-hook-migrate",
                "wait-removed pre-hook-migrate",
            ]
        );
    }

    #[tokio::test]
    async fn test_kind_filter() {
        let engine = MockEngine::new();
        let runner = HookRunner::new(&engine);
        let hooks = vec![
            container_hook("before", HookKind::Pre),
            container_hook("after", HookKind::Post),
        ];

        runner.run(&hooks, HookKind::Post, "appnet").await.unwrap();

        assert!(
            engine
                .events()
                .iter()
                .all(|e| !e.contains("before"))
        );
        assert!(engine.events().contains(&"create post-hook-after".to_string()));
    }

    #[tokio::test]
    async fn test_bad_timeout_aborts_before_any_hook() {
        let engine = MockEngine::new();
        let runner = HookRunner::new(&engine);
        let mut bad = container_hook("second", HookKind::Pre);
        bad.timeout = Some("not-a-duration".to_string());
        let hooks = vec![container_hook("first", HookKind::Pre), bad];

        let err = runner.run(&hooks, HookKind::Pre, "appnet").await.unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidTimeout { .. }));
        assert!(engine.events().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_timeout_skips_hook() {
        let engine = MockEngine::new();
        let runner = HookRunner::new(&engine).with_poll_interval(Duration::from_millis(5));
        let mut hook = container_hook("migrate", HookKind::Pre);
        hook.wait_for = vec!["db".to_string()];
        hook.timeout = Some("30ms".to_string());

        let err = runner.run(&[hook], HookKind::Pre, "appnet").await.unwrap_err();
        assert!(matches!(err, RuntimeError::ServiceTimeout { .. }));
        assert!(engine.events().iter().all(|e| !e.starts_with("create")));
    }

    #[tokio::test]
    async fn test_wait_for_running_service() {
        let engine = MockEngine::new();
        engine.add_container("1", "db", "running");
        let runner = HookRunner::new(&engine).with_poll_interval(Duration::from_millis(5));
        let mut hook = container_hook("migrate", HookKind::Pre);
        hook.wait_for = vec!["db".to_string()];

        runner.run(&[hook], HookKind::Pre, "appnet").await.unwrap();
        assert!(engine.events().contains(&"create pre-hook-migrate".to_string()));
    }

    #[tokio::test]
    async fn test_nonzero_exit_aborts_remaining_hooks() {
        let engine = MockEngine::new();
        engine.set_exit_code("pre-hook-first", 2);
        let runner = HookRunner::new(&engine);
        let hooks = vec![
            container_hook("first", HookKind::Pre),
            container_hook("second", HookKind::Pre),
        ];

        let err = runner.run(&hooks, HookKind::Pre, "appnet").await.unwrap_err();
        assert!(matches!(err, RuntimeError::HookExitCode { code: 2, .. }));
        // Failed container is left in place, second hook never starts
        assert!(engine.events().iter().all(|e| !e.contains("second")));
        assert!(!engine.events().contains(&"remove pre-hook-first".to_string()));
    }

    #[tokio::test]
    async fn test_command_hook_success_and_failure() {
        let engine = MockEngine::new();
        let runner = HookRunner::new(&engine);

        let ok = command_hook("ok", HookKind::Pre, &["true"]);
        runner.run(&[ok], HookKind::Pre, "appnet").await.unwrap();

        let bad = command_hook("bad", HookKind::Pre, &["false"]);
        let err = runner.run(&[bad], HookKind::Pre, "appnet").await.unwrap_err();
        assert!(matches!(err, RuntimeError::HookFailed { .. }));
    }
}
