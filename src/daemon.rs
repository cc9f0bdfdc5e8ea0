use crate::config::DaemonConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Request, Response};
use crate::protocol::{read_frame, write_frame};
use crate::service::{DrainReason, NoteService};
use std::path::Path;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

const STARTUP_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Serving,
    Draining,
    Terminated,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Serving => "serving",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

pub struct Daemon {
    config: DaemonConfig,
    state: LifecycleState,
    startup_idle_timeout: Duration,
}

impl Daemon {
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            state: LifecycleState::Starting,
            startup_idle_timeout: STARTUP_IDLE_TIMEOUT,
        }
    }

    pub fn with_startup_idle_timeout(mut self, timeout: Duration) -> Self {
        self.startup_idle_timeout = timeout;
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Serves until the store drains or a termination signal arrives. The
    /// socket file this daemon bound is gone by the time this returns `Ok`
    /// (a newer daemon's socket at the same path is left alone); the caller
    /// is expected to exit the process.
    pub async fn run(mut self) -> AppResult<DrainReason> {
        let socket_path = self.config.socket_path.clone();
        tracing::info!(socket = %socket_path.display(), state = self.state.as_str(), "daemon starting");

        clear_stale_socket(&socket_path).await?;
        let (service, mut drain_rx) = NoteService::new(self.config.grace_interval);

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let listener = UnixListener::bind(&socket_path).map_err(|error| {
            AppError::Io(format!("failed to bind {}: {}", socket_path.display(), error))
        })?;
        let owned_socket = socket_identity(&socket_path).await;
        service.arm_startup_timeout(self.startup_idle_timeout).await;

        self.transition(LifecycleState::Serving);
        let reason = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let span = tracing::info_span!("connection", id = %Uuid::new_v4());
                        tokio::spawn(serve_connection(service.clone(), stream).instrument(span));
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "accept failed");
                    }
                },
                Some(reason) = drain_rx.recv() => break reason,
                _ = interrupt.recv() => break DrainReason::Signal,
                _ = terminate.recv() => break DrainReason::Signal,
            }
        };

        self.transition(LifecycleState::Draining);
        tracing::info!(reason = reason.as_str(), "draining");
        service.begin_drain().await;
        drop(listener);
        remove_socket(&socket_path, owned_socket).await;
        self.transition(LifecycleState::Terminated);
        Ok(reason)
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "lifecycle transition");
        self.state = next;
    }
}

/// A crashed daemon leaves its socket file behind, which would make the next
/// bind fail. A socket that still accepts connections belongs to a live
/// daemon and is left alone.
async fn clear_stale_socket(path: &Path) -> AppResult<()> {
    if UnixStream::connect(path).await.is_ok() {
        return Err(AppError::AlreadyRunning(format!(
            "a daemon is already listening on {}",
            path.display()
        )));
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::info!(socket = %path.display(), "removed stale socket");
            Ok(())
        }
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(AppError::Io(format!(
            "failed to remove stale socket {}: {}",
            path.display(),
            error
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SocketIdentity {
    dev: u64,
    ino: u64,
}

async fn socket_identity(path: &Path) -> Option<SocketIdentity> {
    use std::os::unix::fs::MetadataExt;
    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => Some(SocketIdentity {
            dev: metadata.dev(),
            ino: metadata.ino(),
        }),
        Err(error) => {
            tracing::warn!(socket = %path.display(), error = %error, "failed to stat socket");
            None
        }
    }
}

// Another daemon may have replaced the path since this one bound it; its
// socket must survive our drain.
async fn remove_socket(path: &Path, owned: Option<SocketIdentity>) {
    let current = socket_identity(path).await;
    if owned.is_none() || current != owned {
        tracing::warn!(socket = %path.display(), "socket no longer ours, leaving it in place");
        return;
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => {
            tracing::warn!(socket = %path.display(), error = %error, "failed to remove socket");
        }
    }
}

async fn serve_connection(service: NoteService, stream: UnixStream) {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let request = match read_frame::<Request, _>(&mut reader).await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(error = %error, "unreadable request");
                let _ = write_frame(&mut write_half, &Response::from_error(&error)).await;
                break;
            }
        };

        let response = service.handle(request).await;
        if let Err(error) = write_frame(&mut write_half, &response).await {
            tracing::debug!(error = %error, "client went away before reply");
            break;
        }
    }
}
