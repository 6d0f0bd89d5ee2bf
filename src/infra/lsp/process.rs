//! Language server subprocesses
//!
//! Spawns the server, pumps its stdout/stderr into the session inbox as raw
//! chunks, writes framed messages to its stdin, and reports its exit.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::LspError;
use crate::models::config::ServerConfig;

const READ_CHUNK: usize = 16 * 1024;

/// Unique per spawn, so events from a dead process never reach a newer
/// connection that reuses its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something the subprocess did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    Exited(Option<i32>),
}

/// Where process tasks deliver their events
pub type EventSink = Arc<dyn Fn(ConnectionId, ServerEvent) + Send + Sync>;

/// Framed bytes bound for the server's stdin
pub type Outbound = mpsc::UnboundedSender<Vec<u8>>;

/// The two ends a connection needs: a way to write, and the process to retire
pub struct ServerLink {
    pub outbound: Outbound,
    pub process: Option<ServerProcess>,
}

/// Starts servers; the session only ever sees this seam
pub trait Launcher {
    fn launch(
        &mut self,
        id: ConnectionId,
        config: &ServerConfig,
        root: &Path,
        sink: EventSink,
    ) -> Result<ServerLink, LspError>;
}

/// Handle on a running server process
pub struct ServerProcess {
    terminate: Option<oneshot::Sender<Duration>>,
    waiter: JoinHandle<()>,
}

impl ServerProcess {
    /// Ask the process to exit; it is killed if still alive after `grace`
    pub fn terminate(&mut self, grace: Duration) {
        if let Some(signal) = self.terminate.take() {
            let _ = signal.send(grace);
        }
    }

    /// Wait for the process tasks to finish, up to `limit`
    pub async fn wait(mut self, limit: Duration) {
        if tokio::time::timeout(limit, &mut self.waiter).await.is_err() {
            tracing::debug!("Server process still running after {:?}", limit);
        }
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        self.terminate(Duration::ZERO);
    }
}

/// Launches real subprocesses with tokio
#[derive(Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(
        &mut self,
        id: ConnectionId,
        config: &ServerConfig,
        root: &Path,
        sink: EventSink,
    ) -> Result<ServerLink, LspError> {
        tracing::info!(
            "Starting {}: {} {:?}",
            config.identity(),
            config.command,
            config.args
        );

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LspError::ServerStart(format!("{}: {}", config.command, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LspError::ServerStart("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LspError::ServerStart("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| LspError::ServerStart("Failed to get stderr".to_string()))?;

        let (outbound, mut frames) = mpsc::unbounded_channel::<Vec<u8>>();
        tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                if let Err(e) = stdin.write_all(&frame).await {
                    tracing::debug!("Server {} stdin closed: {}", id, e);
                    break;
                }
                if stdin.flush().await.is_err() {
                    break;
                }
            }
        });

        let stdout_task = spawn_reader(stdout, id, Arc::clone(&sink), ServerEvent::Stdout);
        spawn_reader(stderr, id, Arc::clone(&sink), ServerEvent::Stderr);

        let (terminate, signal) = oneshot::channel();
        let waiter = tokio::spawn(supervise(child, signal, stdout_task, id, sink));

        Ok(ServerLink {
            outbound,
            process: Some(ServerProcess {
                terminate: Some(terminate),
                waiter,
            }),
        })
    }
}

fn spawn_reader<R>(
    mut reader: R,
    id: ConnectionId,
    sink: EventSink,
    wrap: fn(Vec<u8>) -> ServerEvent,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => sink(id, wrap(buf[..n].to_vec())),
                Err(e) => {
                    tracing::warn!("Server {} read error: {}", id, e);
                    break;
                }
            }
        }
    })
}

/// Wait for exit (or a terminate request), then report it once stdout is drained
async fn supervise(
    mut child: Child,
    mut signal: oneshot::Receiver<Duration>,
    stdout_task: JoinHandle<()>,
    id: ConnectionId,
    sink: EventSink,
) {
    let status = tokio::select! {
        status = child.wait() => status.ok(),
        grace = &mut signal => {
            let grace = grace.unwrap_or(Duration::ZERO);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => status.ok(),
                Err(_) => {
                    tracing::warn!("Server {} did not exit within {:?}, killing", id, grace);
                    let _ = child.kill().await;
                    child.wait().await.ok()
                }
            }
        }
    };

    // Bytes already written by the server are delivered before the exit
    let _ = stdout_task.await;
    let code = status.and_then(|s| s.code());
    tracing::debug!("Server {} exited with {:?}", id, code);
    sink(id, ServerEvent::Exited(code));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId(3).to_string(), "#3");
        assert!(ConnectionId(1) < ConnectionId(2));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let config = ServerConfig::new("/definitely/not/a/server", vec![]);
        let sink: EventSink = Arc::new(|_, _| {});
        let result = ProcessLauncher.launch(ConnectionId(1), &config, Path::new("."), sink);
        assert!(matches!(result, Err(LspError::ServerStart(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_output_and_exit_are_reported() {
        let config = ServerConfig::new("sh", vec!["-c".into(), "printf hello; exit 3".into()]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink: EventSink = Arc::new(move |id, event| {
            let _ = tx.send((id, event));
        });

        let link = ProcessLauncher
            .launch(ConnectionId(9), &config, Path::new("."), sink)
            .unwrap();

        let mut stdout = Vec::new();
        let mut exit = None;
        while let Some((id, event)) = rx.recv().await {
            assert_eq!(id, ConnectionId(9));
            match event {
                ServerEvent::Stdout(bytes) => stdout.extend(bytes),
                ServerEvent::Stderr(_) => {}
                ServerEvent::Exited(code) => {
                    exit = Some(code);
                    break;
                }
            }
        }

        assert_eq!(stdout, b"hello");
        assert_eq!(exit, Some(Some(3)));
        drop(link);
    }
}
