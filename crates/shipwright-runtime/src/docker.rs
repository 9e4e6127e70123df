//! Container engine collaborator
//!
//! Wraps the Docker Engine API behind the `ContainerEngine` trait: hook
//! execution needs the one-shot container lifecycle
//! (create/start/wait/logs/inspect/remove) and both hooks and rolling
//! updates need name-filtered listing. The real implementation uses
//! bollard; tests use the scripted `MockEngine`.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use shipwright_core::ContainerSpec;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

use crate::error::{Result, RuntimeError};

/// A container as reported by the engine's listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub state: String,
}

impl ContainerInfo {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Container-engine client contract
///
/// Implementations must be Send + Sync for use across async call chains.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List running containers matching a name filter (anchored regex)
    async fn list_named(&self, filter: &str) -> Result<Vec<ContainerInfo>>;

    /// Create a container from a hook's container spec; returns its id
    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String>;

    async fn start(&self, id: &str) -> Result<()>;

    /// Block until the container is no longer running
    async fn wait_stopped(&self, id: &str) -> Result<()>;

    /// Stream the container's logs to the inherited standard streams
    async fn print_logs(&self, id: &str) -> Result<()>;

    async fn exit_code(&self, id: &str) -> Result<i64>;

    async fn stop(&self, id: &str) -> Result<()>;

    async fn remove(&self, id: &str) -> Result<()>;

    /// Block until the engine has finished removing the container
    async fn wait_removed(&self, id: &str) -> Result<()>;
}

/// bollard-backed Docker Engine client
pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// Connect using the environment's defaults (socket or DOCKER_HOST)
    pub fn connect() -> Result<Self> {
        Ok(Self {
            client: Docker::connect_with_local_defaults()?,
        })
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_named(&self, filter: &str) -> Result<Vec<ContainerInfo>> {
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![filter.to_string()]);
        let summaries = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                filters,
                ..Default::default()
            }))
            .await?;

        Ok(summaries
            .into_iter()
            .map(|s| ContainerInfo {
                id: s.id.unwrap_or_default(),
                name: s
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default(),
                state: s.state.unwrap_or_default(),
            })
            .collect())
    }

    async fn create(&self, name: &str, spec: &ContainerSpec) -> Result<String> {
        let env: Vec<String> = spec.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let mut cmd = spec.command.clone();
        cmd.extend(spec.args.iter().cloned());

        debug!(image = %spec.image, network = %spec.network, "creating container");
        let response = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name,
                    platform: None,
                }),
                Config {
                    image: Some(spec.image.clone()),
                    cmd: if cmd.is_empty() { None } else { Some(cmd) },
                    env: if env.is_empty() { None } else { Some(env) },
                    tty: Some(false),
                    open_stdin: Some(false),
                    host_config: Some(HostConfig {
                        network_mode: if spec.network.is_empty() {
                            None
                        } else {
                            Some(spec.network.clone())
                        },
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await?;
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<()> {
        debug!(id, "starting container");
        self.client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn wait_stopped(&self, id: &str) -> Result<()> {
        let mut stream = self.client.wait_container(
            id,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        while let Some(result) = stream.next().await {
            match result {
                Ok(_) => {}
                // Non-zero exits surface here; the caller reads the code
                // from inspect instead.
                Err(bollard::errors::Error::DockerContainerWaitError { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(id, "container finished");
        Ok(())
    }

    async fn print_logs(&self, id: &str) -> Result<()> {
        let mut stream = self.client.logs(
            id,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                ..Default::default()
            }),
        );
        while let Some(chunk) = stream.next().await {
            match chunk? {
                LogOutput::StdErr { message } => std::io::stderr().write_all(&message)?,
                output => std::io::stdout().write_all(&output.into_bytes())?,
            }
        }
        Ok(())
    }

    async fn exit_code(&self, id: &str) -> Result<i64> {
        let inspect = self.client.inspect_container(id, None).await?;
        Ok(inspect.state.and_then(|s| s.exit_code).unwrap_or(0))
    }

    async fn stop(&self, id: &str) -> Result<()> {
        debug!(id, "stopping container");
        self.client.stop_container(id, None).await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        debug!(id, "removing container");
        self.client
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn wait_removed(&self, id: &str) -> Result<()> {
        let mut stream = self.client.wait_container(
            id,
            Some(WaitContainerOptions {
                condition: "removed",
            }),
        );
        while let Some(result) = stream.next().await {
            match result {
                Ok(_) => {}
                Err(bollard::errors::Error::DockerContainerWaitError { .. }) => {}
                // Already gone
                Err(bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                }) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }
        debug!(id, "container removed");
        Ok(())
    }
}

/// Scripted in-memory engine for orchestration tests
#[derive(Default)]
pub struct MockEngine {
    containers: std::sync::Mutex<Vec<ContainerInfo>>,
    deferred: std::sync::Mutex<Vec<(usize, ContainerInfo)>>,
    list_calls: std::sync::Mutex<usize>,
    exit_codes: std::sync::Mutex<HashMap<String, i64>>,
    events: std::sync::Mutex<Vec<String>>,
    fail_on: std::sync::Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a container visible to `list_named`
    pub fn add_container(&self, id: &str, name: &str, state: &str) {
        self.containers.lock().unwrap().push(ContainerInfo {
            id: id.to_string(),
            name: name.to_string(),
            state: state.to_string(),
        });
    }

    /// Make a container visible only once `list_named` has been called
    /// `after_lists` times, simulating containers that come up later
    pub fn add_container_after(&self, after_lists: usize, id: &str, name: &str, state: &str) {
        self.deferred.lock().unwrap().push((
            after_lists,
            ContainerInfo {
                id: id.to_string(),
                name: name.to_string(),
                state: state.to_string(),
            },
        ));
    }

    /// Exit code returned by `exit_code` for a given id (default 0)
    pub fn set_exit_code(&self, id: &str, code: i64) {
        self.exit_codes.lock().unwrap().insert(id.to_string(), code);
    }

    /// Fail any operation whose event string contains this substring
    pub fn fail_on(&self, needle: &str) {
        self.fail_on.lock().unwrap().push(needle.to_string());
    }

    /// Every operation performed, in order, as `"<op> <arg>"` strings
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Containers currently present, regardless of state
    pub fn present(&self) -> Vec<ContainerInfo> {
        self.containers.lock().unwrap().clone()
    }

    fn record(&self, event: String) -> Result<()> {
        for needle in self.fail_on.lock().unwrap().iter() {
            if event.contains(needle.as_str()) {
                self.events.lock().unwrap().push(format!("{event} (failed)"));
                return Err(RuntimeError::CommandFailed {
                    command: event,
                    status: "exit status: 1".to_string(),
                });
            }
        }
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    fn matches_filter(name: &str, filter: &str) -> bool {
        let pattern = filter.trim_start_matches('^');
        match pattern.strip_suffix('$') {
            Some(exact) => name == exact,
            None => name.starts_with(pattern),
        }
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn list_named(&self, filter: &str) -> Result<Vec<ContainerInfo>> {
        self.record(format!("list {filter}"))?;
        let calls = {
            let mut calls = self.list_calls.lock().unwrap();
            *calls += 1;
            *calls
        };
        {
            let mut deferred = self.deferred.lock().unwrap();
            let mut containers = self.containers.lock().unwrap();
            deferred.retain(|(after, info)| {
                if calls > *after {
                    containers.push(info.clone());
                    false
                } else {
                    true
                }
            });
        }
        Ok(self
            .containers
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_running() && Self::matches_filter(&c.name, filter))
            .cloned()
            .collect())
    }

    async fn create(&self, name: &str, _spec: &ContainerSpec) -> Result<String> {
        self.record(format!("create {name}"))?;
        self.containers.lock().unwrap().push(ContainerInfo {
            id: name.to_string(),
            name: name.to_string(),
            state: "created".to_string(),
        });
        Ok(name.to_string())
    }

    async fn start(&self, id: &str) -> Result<()> {
        self.record(format!("start {id}"))
    }

    async fn wait_stopped(&self, id: &str) -> Result<()> {
        self.record(format!("wait {id}"))
    }

    async fn print_logs(&self, id: &str) -> Result<()> {
        self.record(format!("logs {id}"))
    }

    async fn exit_code(&self, id: &str) -> Result<i64> {
        self.record(format!("inspect {id}"))?;
        Ok(self.exit_codes.lock().unwrap().get(id).copied().unwrap_or(0))
    }

    async fn stop(&self, id: &str) -> Result<()> {
        self.record(format!("stop {id}"))?;
        if let Some(c) = self
            .containers
            .lock()
            .unwrap()
            .iter_mut()
            .find(|c| c.id == id)
        {
            c.state = "exited".to_string();
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<()> {
        self.record(format!("remove {id}"))?;
        self.containers.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }

    async fn wait_removed(&self, id: &str) -> Result<()> {
        self.record(format!("wait-removed {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_exact_name_filter() {
        let engine = MockEngine::new();
        engine.add_container("1", "db", "running");
        engine.add_container("2", "db-backup", "running");
        engine.add_container("3", "db-old", "exited");

        let exact = engine.list_named("^db$").await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].name, "db");

        let prefixed = engine.list_named("^db-").await.unwrap();
        assert_eq!(prefixed.len(), 1);
        assert_eq!(prefixed[0].name, "db-backup");
    }

    #[tokio::test]
    async fn test_mock_remove_drops_container() {
        let engine = MockEngine::new();
        engine.add_container("1", "web", "running");
        engine.remove("1").await.unwrap();
        assert!(engine.present().is_empty());
    }
}
