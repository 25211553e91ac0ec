// ─── Process Gateway ───
// Spawns, tracks, signals, and streams output from OS child processes.
// Each child is owned by exactly one supervising task; the registry
// keeps the stdin handle and a kill signal so callers never touch the
// Child directly. The exit event fires exactly once, after both output
// streams are drained, and is the only place a process leaves the table.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt as _, AsyncWriteExt as _, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, warn};

use crate::core::error::{HostError, HostResult};

/// Notification from a supervised process, delivered in arrival order
/// per stream. `Exited` is sent exactly once, last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output { id: u32, line: String },
    Stderr { id: u32, line: String },
    Exited { id: u32, code: Option<i32> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Running,
    Stopped,
}

/// Registry entry visible to diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessInfo {
    pub id: u32,
    pub command: String,
    pub status: ProcessStatus,
    pub started_at: DateTime<Utc>,
}

/// The seam the supervisor spawns through; tests substitute a
/// recording fake.
#[async_trait]
pub trait ProcessSpawner: Send + Sync {
    /// Spawn `program` with `args` in `working_dir` and stream its
    /// lifecycle through `events`. Returns the registry id.
    async fn start(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        events: mpsc::UnboundedSender<ProcessEvent>,
    ) -> HostResult<u32>;

    /// Write `text` to the process's stdin.
    async fn send_input(&self, id: u32, text: &str) -> HostResult<()>;

    /// Request forceful termination. Idempotent: unknown or already
    /// exited ids are a no-op.
    async fn kill(&self, id: u32) -> HostResult<()>;

    /// Diagnostics only — control decisions come from exit events.
    async fn query(&self, id: u32) -> ProcessStatus;
}

struct ProcessEntry {
    info: ProcessInfo,
    stdin: Option<ChildStdin>,
    kill: Arc<Notify>,
}

/// Registry of supervised child processes keyed by a monotonically
/// increasing id.
pub struct ProcessGateway {
    table: Arc<Mutex<HashMap<u32, ProcessEntry>>>,
    next_id: AtomicU32,
}

impl ProcessGateway {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU32::new(1),
        }
    }

    /// Diagnostics snapshot of a single process.
    pub async fn info(&self, id: u32) -> Option<ProcessInfo> {
        let table = self.table.lock().await;
        table.get(&id).map(|entry| entry.info.clone())
    }

    /// Diagnostics snapshot of every tracked process.
    pub async fn processes(&self) -> Vec<ProcessInfo> {
        let table = self.table.lock().await;
        table.values().map(|entry| entry.info.clone()).collect()
    }
}

impl Default for ProcessGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSpawner for ProcessGateway {
    async fn start(
        &self,
        program: &Path,
        args: &[String],
        working_dir: &Path,
        events: mpsc::UnboundedSender<ProcessEvent>,
    ) -> HostResult<u32> {
        let mut child = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HostError::Spawn(format!("{}: {}", program.display(), e)))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let kill = Arc::new(Notify::new());

        {
            let mut table = self.table.lock().await;
            table.insert(
                id,
                ProcessEntry {
                    info: ProcessInfo {
                        id,
                        command: render_command(program, args),
                        status: ProcessStatus::Running,
                        started_at: Utc::now(),
                    },
                    stdin,
                    kill: Arc::clone(&kill),
                },
            );
        }

        let stdout_task = stdout.map(|out| {
            let events = events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(out).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if events.send(ProcessEvent::Output { id, line }).is_err() {
                        break;
                    }
                }
            })
        });

        let stderr_task = stderr.map(|err| {
            let events = events.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(err).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if events.send(ProcessEvent::Stderr { id, line }).is_err() {
                        break;
                    }
                }
            })
        });

        let table = Arc::clone(&self.table);
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = kill.notified() => {
                    debug!("Force killing process {}", id);
                    let _ = child.start_kill();
                    child.wait().await
                }
            };

            {
                let mut table = table.lock().await;
                if let Some(entry) = table.get_mut(&id) {
                    entry.info.status = ProcessStatus::Stopped;
                    entry.stdin = None;
                }
            }

            // Drain both streams before announcing the exit so no
            // output event can follow it.
            if let Some(task) = stdout_task {
                let _ = task.await;
            }
            if let Some(task) = stderr_task {
                let _ = task.await;
            }

            let code = status.as_ref().ok().and_then(|s| s.code());
            match &status {
                Ok(status) => debug!("Process {} exited with {}", id, status),
                Err(e) => warn!("Failed to await process {}: {}", id, e),
            }

            let _ = events.send(ProcessEvent::Exited { id, code });
            table.lock().await.remove(&id);
        });

        Ok(id)
    }

    async fn send_input(&self, id: u32, text: &str) -> HostResult<()> {
        let mut table = self.table.lock().await;
        let entry = table.get_mut(&id).ok_or(HostError::ProcessNotFound(id))?;

        if entry.info.status != ProcessStatus::Running {
            return Err(HostError::ProcessNotRunning(id));
        }

        let stdin = entry
            .stdin
            .as_mut()
            .ok_or(HostError::ProcessNotRunning(id))?;
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|_| HostError::ProcessNotRunning(id))?;
        stdin
            .flush()
            .await
            .map_err(|_| HostError::ProcessNotRunning(id))?;
        Ok(())
    }

    async fn kill(&self, id: u32) -> HostResult<()> {
        let table = self.table.lock().await;
        if let Some(entry) = table.get(&id) {
            entry.kill.notify_one();
        }
        Ok(())
    }

    async fn query(&self, id: u32) -> ProcessStatus {
        let table = self.table.lock().await;
        table
            .get(&id)
            .map(|entry| entry.info.status)
            .unwrap_or(ProcessStatus::Stopped)
    }
}

fn render_command(program: &Path, args: &[String]) -> String {
    let mut rendered = shell_escape(&program.to_string_lossy());
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&shell_escape(arg));
    }
    rendered
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=' | '+')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> (std::path::PathBuf, Vec<String>) {
        (
            std::path::PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), script.to_string()],
        )
    }

    async fn collect_until_exit(
        rx: &mut mpsc::UnboundedReceiver<ProcessEvent>,
    ) -> Vec<ProcessEvent> {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            let done = matches!(event, ProcessEvent::Exited { .. });
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streams_output_in_order_and_exits_once() {
        let gateway = ProcessGateway::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (program, args) = sh("echo one; echo two; echo oops >&2; exit 3");
        let dir = tempfile::tempdir().unwrap();

        let id = gateway.start(&program, &args, dir.path(), tx).await.unwrap();
        let events = collect_until_exit(&mut rx).await;

        let stdout: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::Output { line, .. } => Some(line.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);

        let stderr: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::Stderr { line, .. } => Some(line.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(stderr, vec!["oops"]);

        assert_eq!(
            events.last(),
            Some(&ProcessEvent::Exited { id, code: Some(3) })
        );
        // No further events after the exit, and the entry is gone.
        assert!(rx.try_recv().is_err());
        assert_eq!(gateway.query(id).await, ProcessStatus::Stopped);
        assert!(gateway.info(id).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn send_input_reaches_stdin() {
        let gateway = ProcessGateway::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (program, args) = sh("read line; echo \"got $line\"");
        let dir = tempfile::tempdir().unwrap();

        let id = gateway.start(&program, &args, dir.path(), tx).await.unwrap();
        gateway.send_input(id, "stop\n").await.unwrap();

        let events = collect_until_exit(&mut rx).await;
        assert!(events.contains(&ProcessEvent::Output {
            id,
            line: "got stop".to_string()
        }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn kill_terminates_a_stuck_process() {
        let gateway = ProcessGateway::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (program, args) = sh("sleep 600");
        let dir = tempfile::tempdir().unwrap();

        let id = gateway.start(&program, &args, dir.path(), tx).await.unwrap();
        assert_eq!(gateway.query(id).await, ProcessStatus::Running);

        gateway.kill(id).await.unwrap();
        let events = collect_until_exit(&mut rx).await;

        // SIGKILL means no exit code on unix.
        assert_eq!(events.last(), Some(&ProcessEvent::Exited { id, code: None }));
    }

    #[tokio::test]
    async fn kill_is_idempotent_for_unknown_ids() {
        let gateway = ProcessGateway::new();
        gateway.kill(4242).await.unwrap();
    }

    #[tokio::test]
    async fn send_input_to_unknown_process_fails() {
        let gateway = ProcessGateway::new();
        match gateway.send_input(4242, "stop\n").await {
            Err(HostError::ProcessNotFound(4242)) => {}
            other => panic!("expected ProcessNotFound, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn spawn_failure_is_synchronous() {
        let gateway = ProcessGateway::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let dir = tempfile::tempdir().unwrap();

        let result = gateway
            .start(Path::new("/definitely/not/a/binary"), &[], dir.path(), tx)
            .await;
        assert!(matches!(result, Err(HostError::Spawn(_))));
    }

    #[test]
    fn command_rendering_quotes_when_needed() {
        assert_eq!(
            render_command(Path::new("/opt/java/bin/java"), &["-Xmx4G".to_string()]),
            "/opt/java/bin/java -Xmx4G"
        );
        assert_eq!(
            render_command(Path::new("/opt/my jdk/java"), &[]),
            "\"/opt/my jdk/java\""
        );
    }
}
