use crate::config::BootstrapConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{MessageReply, Note, NoteReply, Request, Response};
use crate::protocol::{read_frame, write_frame};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::BufReader;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::Command;

/// Starts a daemon that outlives the calling process.
pub trait Launcher: Send + Sync {
    fn launch_detached(&self) -> AppResult<()>;
}

/// Re-executes a binary (normally this one) with the hidden daemon
/// sub-command in a new session, so closing the terminal does not take the
/// daemon with it.
pub struct ExecLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl ExecLauncher {
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn current_exe() -> AppResult<Self> {
        let program = std::env::current_exe()?;
        Ok(Self::new(program, vec!["daemon".to_string()]))
    }
}

impl Launcher for ExecLauncher {
    fn launch_detached(&self) -> AppResult<()> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            // SAFETY: setsid is async-signal-safe and touches no parent state.
            unsafe {
                command.pre_exec(|| {
                    nix::unistd::setsid()
                        .map(|_| ())
                        .map_err(std::io::Error::from)
                });
            }
        }

        let child = command
            .spawn()
            .map_err(|error| AppError::Io(format!("failed to start daemon: {}", error)))?;
        tracing::debug!(pid = ?child.id(), program = %self.program.display(), "daemon launched");
        Ok(())
    }
}

/// Connects to the daemon, launching one first when `may_create` is set.
/// Only the connection is retried; the caller's request is sent once.
pub async fn obtain_session(
    config: &BootstrapConfig,
    launcher: &dyn Launcher,
    may_create: bool,
) -> AppResult<SessionClient> {
    if let Ok(client) = SessionClient::connect(&config.socket_path).await {
        return Ok(client);
    }
    if !may_create {
        return Err(AppError::NoActiveSession);
    }

    launcher.launch_detached()?;
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.poll_interval).await;
        if let Ok(client) = SessionClient::connect(&config.socket_path).await {
            tracing::debug!(attempt, "daemon reachable");
            return Ok(client);
        }
    }

    tracing::warn!(
        socket = %config.socket_path.display(),
        attempts = config.max_attempts,
        "daemon never became reachable"
    );
    Err(AppError::DaemonStartTimeout)
}

pub struct SessionClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl SessionClient {
    pub async fn connect(socket_path: &Path) -> AppResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer,
        })
    }

    pub async fn add(&mut self, text: &str, pinned: bool) -> AppResult<NoteReply> {
        let request = Request::Add {
            text: text.to_string(),
            pinned,
        };
        match self.call(request).await? {
            Response::Note(reply) => Ok(reply),
            other => Err(unexpected("add", &other)),
        }
    }

    pub async fn list(&mut self) -> AppResult<Vec<Note>> {
        match self.call(Request::List).await? {
            Response::Notes(reply) => Ok(reply.notes),
            other => Err(unexpected("list", &other)),
        }
    }

    pub async fn remove(&mut self, selector: &str) -> AppResult<NoteReply> {
        let request = Request::Remove {
            selector: selector.to_string(),
        };
        match self.call(request).await? {
            Response::Note(reply) => Ok(reply),
            other => Err(unexpected("remove", &other)),
        }
    }

    pub async fn clear(&mut self) -> AppResult<MessageReply> {
        match self.call(Request::Clear).await? {
            Response::Message(reply) => Ok(reply),
            other => Err(unexpected("clear", &other)),
        }
    }

    pub async fn pin(&mut self, selector: &str) -> AppResult<NoteReply> {
        let request = Request::Pin {
            selector: selector.to_string(),
        };
        match self.call(request).await? {
            Response::Note(reply) => Ok(reply),
            other => Err(unexpected("pin", &other)),
        }
    }

    pub async fn unpin(&mut self, selector: &str) -> AppResult<NoteReply> {
        let request = Request::Unpin {
            selector: selector.to_string(),
        };
        match self.call(request).await? {
            Response::Note(reply) => Ok(reply),
            other => Err(unexpected("unpin", &other)),
        }
    }

    pub async fn show(&mut self, selector: &str) -> AppResult<Note> {
        let request = Request::Show {
            selector: selector.to_string(),
        };
        match self.call(request).await? {
            Response::Note(reply) => Ok(reply.note),
            other => Err(unexpected("show", &other)),
        }
    }

    // Transport failures mean the daemon went away, usually because it
    // drained while this request was in flight.
    async fn call(&mut self, request: Request) -> AppResult<Response> {
        write_frame(&mut self.writer, &request)
            .await
            .map_err(into_session_ended)?;
        let response: Response = read_frame(&mut self.reader)
            .await
            .map_err(into_session_ended)?
            .ok_or_else(|| AppError::SessionEnded("daemon closed the connection".to_string()))?;
        response.into_result()
    }
}

fn into_session_ended(error: AppError) -> AppError {
    match error {
        AppError::Io(detail) => AppError::SessionEnded(detail),
        other => other,
    }
}

fn unexpected(op: &str, response: &Response) -> AppError {
    AppError::Protocol(format!("unexpected reply to {}: {:?}", op, response))
}
