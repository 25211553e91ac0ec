// ─── Server Supervisor ───
// Owns the lifecycle of a single managed server instance:
// Offline → configure → Offline (configured) → start → Starting →
// Running → stop → Stopping → Offline. The process gateway's exit
// event is the sole authority that returns the instance to Offline;
// `stop` only arms the graceful path and the bounded kill fallback.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::core::error::{HostError, HostResult};
use crate::core::fs;
use crate::core::java::RuntimeProvider;
use crate::core::process::{ProcessEvent, ProcessSpawner};
use crate::core::server::command::build_start_command;
use crate::core::server::config::ServerConfig;

const SERVER_PROPERTIES: &str = "server.properties";
const EULA_FILE: &str = "eula.txt";
const EULA_CONTENTS: &[u8] = b"eula=true\n";
const SHUTDOWN_COMMAND: &str = "stop\n";
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Offline,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ServerStatus::Offline => "offline",
            ServerStatus::Starting => "starting",
            ServerStatus::Running => "running",
            ServerStatus::Stopping => "stopping",
        };
        write!(f, "{}", name)
    }
}

/// Notification delivered to the attached presentation layer, in the
/// order the server produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ServerEvent {
    Output { line: String },
    Stderr { line: String },
    Exited { code: Option<i32> },
}

/// When the instance is declared Running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// As soon as the spawn is confirmed.
    #[default]
    Immediate,
    /// Only once the server prints its ready line.
    AwaitReadyLine,
}

struct Instance {
    config: Option<ServerConfig>,
    runtime_path: Option<PathBuf>,
    status: ServerStatus,
    process_id: Option<u32>,
}

/// Supervises exactly one server instance. All state transitions go
/// through the single instance lock, so an explicit `stop` and a
/// crash-induced exit can never race each other into a lost update.
pub struct ServerSupervisor {
    instance: Arc<Mutex<Instance>>,
    spawner: Arc<dyn ProcessSpawner>,
    runtimes: Arc<dyn RuntimeProvider>,
    events: mpsc::UnboundedSender<ServerEvent>,
    readiness: ReadinessPolicy,
    grace_period: Duration,
}

impl ServerSupervisor {
    pub fn new(
        spawner: Arc<dyn ProcessSpawner>,
        runtimes: Arc<dyn RuntimeProvider>,
        events: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            instance: Arc::new(Mutex::new(Instance {
                config: None,
                runtime_path: None,
                status: ServerStatus::Offline,
                process_id: None,
            })),
            spawner,
            runtimes,
            events,
            readiness: ReadinessPolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    pub fn with_readiness_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.readiness = policy;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub async fn status(&self) -> ServerStatus {
        self.instance.lock().await.status
    }

    pub async fn config(&self) -> Option<ServerConfig> {
        self.instance.lock().await.config.clone()
    }

    pub async fn process_id(&self) -> Option<u32> {
        self.instance.lock().await.process_id
    }

    /// Accept a configuration for the next run.
    ///
    /// Validates before any side effect: the working directory must
    /// hold a jar artifact and the requested runtime must be made
    /// available. On success writes a default `server.properties`
    /// (only when none exists) and rewrites the `eula.txt` acceptance
    /// marker.
    pub async fn configure(&self, config: ServerConfig) -> HostResult<()> {
        config.validate()?;

        let mut instance = self.instance.lock().await;
        if matches!(
            instance.status,
            ServerStatus::Running | ServerStatus::Stopping
        ) {
            return Err(HostError::InvalidState {
                operation: "configure",
                status: instance.status,
            });
        }

        if !super::validate_server_directory(&config.server_dir).await {
            return Err(HostError::InvalidConfiguration(format!(
                "no server jar found in {:?}",
                config.server_dir
            )));
        }

        let runtime_path = self.runtimes.ensure(config.runtime).await?;

        let properties_path = config.server_dir.join(SERVER_PROPERTIES);
        if !fs::exists(&properties_path).await {
            fs::write(
                &properties_path,
                config.default_properties().as_bytes(),
                false,
            )
            .await?;
        }
        fs::write(&config.server_dir.join(EULA_FILE), EULA_CONTENTS, false).await?;

        info!(
            "Configured server in {:?} (loader {}, Java {})",
            config.server_dir, config.loader, config.runtime
        );
        instance.config = Some(config);
        instance.runtime_path = Some(runtime_path);
        Ok(())
    }

    /// Launch the configured server. Returns the process id.
    pub async fn start(&self) -> HostResult<u32> {
        let mut instance = self.instance.lock().await;
        if instance.status != ServerStatus::Offline {
            return Err(HostError::InvalidState {
                operation: "start",
                status: instance.status,
            });
        }
        let (Some(config), Some(java_bin)) =
            (instance.config.clone(), instance.runtime_path.clone())
        else {
            return Err(HostError::InvalidConfiguration(
                "server is not configured".into(),
            ));
        };

        let command = build_start_command(&java_bin, &config);
        instance.status = ServerStatus::Starting;

        let (tx, rx) = mpsc::unbounded_channel();
        let id = match self
            .spawner
            .start(&command.program, &command.args, &config.server_dir, tx)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                instance.status = ServerStatus::Offline;
                return Err(e);
            }
        };

        instance.process_id = Some(id);
        if self.readiness == ReadinessPolicy::Immediate {
            instance.status = ServerStatus::Running;
        }
        info!(
            "Server process {} spawned: {}",
            id,
            command.to_command_line()
        );

        self.spawn_event_pump(rx);
        Ok(id)
    }

    /// Request a graceful shutdown. No-op unless Running.
    ///
    /// Returns once the shutdown command is sent and the kill fallback
    /// is armed; completion is signaled by the exit event, not by this
    /// call.
    pub async fn stop(&self) -> HostResult<()> {
        let id = {
            let mut instance = self.instance.lock().await;
            if instance.status != ServerStatus::Running {
                return Ok(());
            }
            let Some(id) = instance.process_id else {
                return Ok(());
            };
            instance.status = ServerStatus::Stopping;
            id
        };

        if let Err(e) = self.spawner.send_input(id, SHUTDOWN_COMMAND).await {
            // The exit event will still arrive if the process died on
            // its own; the kill fallback covers everything else.
            warn!("Failed to send shutdown command to process {}: {}", id, e);
        }

        let instance = Arc::clone(&self.instance);
        let spawner = Arc::clone(&self.spawner);
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;

            let still_stopping = {
                let instance = instance.lock().await;
                instance.status == ServerStatus::Stopping && instance.process_id == Some(id)
            };
            if still_stopping {
                warn!(
                    "Process {} did not exit within {:?}, force killing",
                    id, grace_period
                );
                let _ = spawner.kill(id).await;
            }
        });

        Ok(())
    }

    /// Forward process notifications to the attached sink and apply
    /// the exit transition. Runs until the process's channel closes.
    fn spawn_event_pump(&self, mut rx: mpsc::UnboundedReceiver<ProcessEvent>) {
        let instance = Arc::clone(&self.instance);
        let events = self.events.clone();
        let readiness = self.readiness;

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    ProcessEvent::Output { line, .. } => {
                        if readiness == ReadinessPolicy::AwaitReadyLine && is_ready_line(&line) {
                            let mut instance = instance.lock().await;
                            if instance.status == ServerStatus::Starting {
                                instance.status = ServerStatus::Running;
                                info!("Server reported ready");
                            }
                        }
                        let _ = events.send(ServerEvent::Output { line });
                    }
                    ProcessEvent::Stderr { line, .. } => {
                        let _ = events.send(ServerEvent::Stderr { line });
                    }
                    ProcessEvent::Exited { id, code } => {
                        let mut instance = instance.lock().await;
                        if instance.process_id != Some(id) {
                            // Stale exit for a process this instance
                            // no longer owns.
                            continue;
                        }
                        instance.process_id = None;
                        instance.status = ServerStatus::Offline;
                        drop(instance);

                        info!("Server process {} exited with code {:?}", id, code);
                        let _ = events.send(ServerEvent::Exited { code });
                    }
                }
            }
        });
    }
}

/// The third-party server's "fully started" line.
fn is_ready_line(line: &str) -> bool {
    line.contains("Done") && line.contains("For help, type")
}
