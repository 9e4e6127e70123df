//! Rolling update coordinator
//!
//! Replaces a service's running containers with zero downtime: scale to
//! twice the replica count without recreating, wait for the new containers
//! to appear, drain the originals one by one, then scale back down.
//! Services without rolling updates enabled get a plain recreate instead.

use shipwright_core::Values;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::compose::ComposeRuntime;
use crate::docker::ContainerEngine;
use crate::error::{Result, RuntimeError};

/// Root-level / per-service key enabling rolling updates
const ROLLING_KEY: &str = "rolling-update";
/// Root-level / per-service replica count key
const REPLICAS_KEY: &str = "replicas";
/// Root-level key naming the main service
const APP_NAME_KEY: &str = "appName";

/// Per-service rolling update configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollingUpdateConfig {
    pub enabled: bool,
    pub replicas: usize,
}

impl Default for RollingUpdateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            replicas: 1,
        }
    }
}

/// The main service is the lower-cased application name, if declared
pub fn main_service(values: &Values) -> Result<Option<String>> {
    match values.get(APP_NAME_KEY) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            Some(name) => Ok(Some(name.to_lowercase())),
            None => Err(RuntimeError::InvalidConfigValue {
                key: APP_NAME_KEY.to_string(),
                expected: "string".to_string(),
            }),
        },
    }
}

fn extract_bool(map: &serde_json::Value, key: &str, context: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None => Ok(None),
        Some(v) => match v.as_bool() {
            Some(b) => Ok(Some(b)),
            None => Err(RuntimeError::InvalidConfigValue {
                key: format!("{context}{key}"),
                expected: "boolean".to_string(),
            }),
        },
    }
}

fn extract_replicas(map: &serde_json::Value, key: &str, context: &str, service: &str) -> Result<Option<usize>> {
    match map.get(key) {
        None => Ok(None),
        Some(v) => match v.as_i64() {
            Some(n) if n >= 1 => Ok(Some(n as usize)),
            Some(n) => Err(RuntimeError::InvalidReplicas {
                service: service.to_string(),
                replicas: n,
            }),
            None => Err(RuntimeError::InvalidConfigValue {
                key: format!("{context}{key}"),
                expected: "integer".to_string(),
            }),
        },
    }
}

impl RollingUpdateConfig {
    /// Resolve the configuration for one service. The main service reads
    /// the root-level keys; every other service reads its own sub-mapping.
    /// Wrongly-typed keys are errors, never silent defaults.
    pub fn resolve(values: &Values, service: &str) -> Result<Self> {
        let mut config = Self::default();
        let root = values.inner();

        if main_service(values)?.as_deref() == Some(service) {
            if let Some(enabled) = extract_bool(root, ROLLING_KEY, "")? {
                config.enabled = enabled;
            }
            if let Some(replicas) = extract_replicas(root, REPLICAS_KEY, "", service)? {
                config.replicas = replicas;
            }
            return Ok(config);
        }

        if let Some(section) = root.get(service) {
            if !section.is_object() {
                return Err(RuntimeError::InvalidConfigValue {
                    key: service.to_string(),
                    expected: "mapping".to_string(),
                });
            }
            let context = format!("{service}.");
            if let Some(enabled) = extract_bool(section, ROLLING_KEY, &context)? {
                config.enabled = enabled;
            }
            if let Some(replicas) = extract_replicas(section, REPLICAS_KEY, &context, service)? {
                config.replicas = replicas;
            }
        }

        Ok(config)
    }
}

/// Whether any service in the values tree enables rolling updates
pub fn has_rolling_enabled(values: &Values) -> Result<bool> {
    let root = values.inner();
    if extract_bool(root, ROLLING_KEY, "")? == Some(true) {
        return Ok(true);
    }

    let main = main_service(values)?;
    if let Some(map) = root.as_object() {
        for (name, section) in map {
            if name == ROLLING_KEY
                || name == REPLICAS_KEY
                || name == "global"
                || Some(name.as_str()) == main.as_deref()
            {
                continue;
            }
            if section.is_object()
                && extract_bool(section, ROLLING_KEY, &format!("{name}."))? == Some(true)
            {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// State machine positions of one rolling replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    EnsureStarted,
    ScaledUp,
    DrainingOld,
    ScaledDown,
    Done,
    Failed,
}

/// Drives per-service updates against the compose runtime and engine
pub struct RollingUpdater<'a> {
    compose: &'a dyn ComposeRuntime,
    engine: &'a dyn ContainerEngine,
    project: String,
    poll_interval: Duration,
    poll_attempts: usize,
}

impl<'a> RollingUpdater<'a> {
    pub fn new(
        compose: &'a dyn ComposeRuntime,
        engine: &'a dyn ContainerEngine,
        project: &str,
    ) -> Self {
        Self {
            compose,
            engine,
            project: project.to_string(),
            poll_interval: Duration::from_secs(1),
            poll_attempts: 30,
        }
    }

    /// Override the scale-up polling budget (tests)
    pub fn with_poll_budget(mut self, attempts: usize, interval: Duration) -> Self {
        self.poll_attempts = attempts;
        self.poll_interval = interval;
        self
    }

    /// Update one service, with a rolling replacement when enabled and a
    /// plain recreate otherwise.
    pub async fn update_service(&self, service: &str, config: &RollingUpdateConfig) -> Result<()> {
        if !config.enabled {
            info!(service, "updating service without rolling update");
            return self
                .compose
                .exec(&up_args(&["--no-deps", service]))
                .await;
        }

        info!(service, replicas = config.replicas, "performing rolling update");
        match self.rolling_replace(service, config).await {
            Ok(()) => {
                self.transition(service, UpdateState::Done);
                Ok(())
            }
            Err(e) => {
                self.transition(service, UpdateState::Failed);
                Err(e)
            }
        }
    }

    async fn rolling_replace(&self, service: &str, config: &RollingUpdateConfig) -> Result<()> {
        self.transition(service, UpdateState::EnsureStarted);
        self.compose
            .exec(&up_args(&["--no-deps", "--no-recreate", service]))
            .await?;

        // Compose names containers <project>-<service>-<index>.
        let filter = format!("^{}-{}-", self.project, service);
        let original: Vec<String> = self
            .engine
            .list_named(&filter)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();

        self.transition(service, UpdateState::ScaledUp);
        let doubled = format!("{service}={}", config.replicas * 2);
        self.compose
            .exec(&up_args(&[
                "--no-deps",
                "--scale",
                &doubled,
                "--no-recreate",
                service,
            ]))
            .await?;

        let mut observed = 0;
        let mut ready = false;
        for attempt in 0..self.poll_attempts {
            let current = self.engine.list_named(&filter).await?;
            observed = current
                .iter()
                .filter(|c| !original.contains(&c.id))
                .count();
            if observed >= config.replicas {
                ready = true;
                break;
            }
            debug!(service, attempt, observed, expected = config.replicas, "waiting for new containers");
            tokio::time::sleep(self.poll_interval).await;
        }
        if !ready {
            // Nothing is torn down; every pre-existing container stays up.
            return Err(RuntimeError::ScaleUpTimeout {
                service: service.to_string(),
                expected: config.replicas,
                observed,
            });
        }

        self.transition(service, UpdateState::DrainingOld);
        for id in &original {
            self.engine.stop(id).await?;
            self.engine.remove(id).await?;
        }

        self.transition(service, UpdateState::ScaledDown);
        let restored = format!("{service}={}", config.replicas);
        self.compose
            .exec(&up_args(&[
                "--no-deps",
                "--scale",
                &restored,
                "--no-recreate",
                service,
            ]))
            .await?;

        Ok(())
    }

    fn transition(&self, service: &str, state: UpdateState) {
        if state == UpdateState::Failed {
            warn!(service, ?state, "rolling update state");
        } else {
            debug!(service, ?state, "rolling update state");
        }
    }
}

fn up_args(rest: &[&str]) -> Vec<String> {
    let mut args = vec!["up".to_string(), "-d".to_string()];
    args.extend(rest.iter().map(|s| s.to_string()));
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::MockCompose;
    use crate::docker::MockEngine;

    fn values(yaml: &str) -> Values {
        Values::from_yaml(yaml).unwrap()
    }

    #[test]
    fn test_main_service_root_level_config() {
        let vals = values("appName: Web\nrolling-update: true\nreplicas: 3\n");
        let config = RollingUpdateConfig::resolve(&vals, "web").unwrap();
        assert_eq!(
            config,
            RollingUpdateConfig {
                enabled: true,
                replicas: 3
            }
        );
    }

    #[test]
    fn test_other_service_sub_mapping() {
        let vals = values("appName: Web\nredis:\n  rolling-update: true\n  replicas: 2\n");
        let config = RollingUpdateConfig::resolve(&vals, "redis").unwrap();
        assert_eq!(
            config,
            RollingUpdateConfig {
                enabled: true,
                replicas: 2
            }
        );
        // main service does not see redis's settings
        let main = RollingUpdateConfig::resolve(&vals, "web").unwrap();
        assert_eq!(main, RollingUpdateConfig::default());
    }

    #[test]
    fn test_absent_service_defaults() {
        let vals = values("appName: Web\n");
        let config = RollingUpdateConfig::resolve(&vals, "postgres").unwrap();
        assert_eq!(config, RollingUpdateConfig::default());
    }

    #[test]
    fn test_wrong_type_is_error_not_default() {
        let vals = values("appName: Web\nrolling-update: \"yes\"\n");
        let err = RollingUpdateConfig::resolve(&vals, "web").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_zero_replicas_rejected() {
        let vals = values("appName: Web\nreplicas: 0\n");
        let err = RollingUpdateConfig::resolve(&vals, "web").unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidReplicas { replicas: 0, .. }));
    }

    #[test]
    fn test_has_rolling_enabled() {
        assert!(has_rolling_enabled(&values("rolling-update: true\n")).unwrap());
        assert!(has_rolling_enabled(&values("redis:\n  rolling-update: true\n")).unwrap());
        assert!(!has_rolling_enabled(&values("redis:\n  rolling-update: false\n")).unwrap());
        assert!(!has_rolling_enabled(&values("a: 1\n")).unwrap());
    }

    #[tokio::test]
    async fn test_disabled_service_plain_recreate() {
        let compose = MockCompose::new();
        let engine = MockEngine::new();
        let updater = RollingUpdater::new(&compose, &engine, "demo");

        updater
            .update_service("web", &RollingUpdateConfig::default())
            .await
            .unwrap();

        assert_eq!(
            compose.calls(),
            vec![vec!["up", "-d", "--no-deps", "web"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()]
        );
        assert!(engine.events().is_empty());
    }

    #[tokio::test]
    async fn test_rolling_replacement_happy_path() {
        let compose = MockCompose::new();
        let engine = MockEngine::new();
        engine.add_container("old1", "demo-web-1", "running");
        // New container comes up after the post-scale listing starts
        engine.add_container_after(1, "new1", "demo-web-2", "running");

        let updater = RollingUpdater::new(&compose, &engine, "demo")
            .with_poll_budget(5, Duration::from_millis(5));
        let config = RollingUpdateConfig {
            enabled: true,
            replicas: 1,
        };

        updater.update_service("web", &config).await.unwrap();

        let calls = compose.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].contains(&"web=2".to_string()));
        assert!(calls[2].contains(&"web=1".to_string()));

        let events = engine.events();
        assert!(events.contains(&"stop old1".to_string()));
        assert!(events.contains(&"remove old1".to_string()));
        // Only the new container remains
        let present = engine.present();
        assert_eq!(present.len(), 1);
        assert_eq!(present[0].id, "new1");
    }

    #[tokio::test]
    async fn test_scale_up_timeout_keeps_originals() {
        let compose = MockCompose::new();
        let engine = MockEngine::new();
        engine.add_container("old1", "demo-web-1", "running");

        let updater = RollingUpdater::new(&compose, &engine, "demo")
            .with_poll_budget(2, Duration::from_millis(5));
        let config = RollingUpdateConfig {
            enabled: true,
            replicas: 1,
        };

        let err = updater.update_service("web", &config).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ScaleUpTimeout { observed: 0, .. }));

        // No teardown happened: original container still present and running
        let present = engine.present();
        assert_eq!(present.len(), 1);
        assert!(present[0].is_running());
        assert!(engine.events().iter().all(|e| !e.starts_with("stop")));
        assert!(engine.events().iter().all(|e| !e.starts_with("remove")));
    }

    #[tokio::test]
    async fn test_drain_aborts_on_first_failure() {
        let compose = MockCompose::new();
        let engine = MockEngine::new();
        engine.add_container("old1", "demo-web-1", "running");
        engine.fail_on("stop old1");
        engine.add_container_after(1, "new1", "demo-web-2", "running");

        let updater = RollingUpdater::new(&compose, &engine, "demo")
            .with_poll_budget(5, Duration::from_millis(5));
        let config = RollingUpdateConfig {
            enabled: true,
            replicas: 1,
        };

        let err = updater.update_service("web", &config).await.unwrap_err();
        assert!(matches!(err, RuntimeError::CommandFailed { .. }));
        // No scale-down after an aborted drain
        assert_eq!(compose.calls().len(), 2);
    }
}
