use crate::errors::{AppError, AppResult};
use crate::models::{ListReply, MessageReply, NoteReply, Request, Response};
use crate::store::NoteStore;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainReason {
    Empty,
    Signal,
}

impl DrainReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Signal => "signal",
        }
    }
}

struct ServiceState {
    store: NoteStore,
    draining: bool,
    // Bumped by every add and every armed timer; only the newest timer may drain.
    generation: u64,
}

/// Dispatches requests against the store. Every request runs under one lock,
/// so operations are linearized across connections.
#[derive(Clone)]
pub struct NoteService {
    state: Arc<Mutex<ServiceState>>,
    drain_tx: mpsc::Sender<DrainReason>,
    grace_interval: Duration,
}

impl NoteService {
    pub fn new(grace_interval: Duration) -> (Self, mpsc::Receiver<DrainReason>) {
        let (drain_tx, drain_rx) = mpsc::channel(4);
        let service = Self {
            state: Arc::new(Mutex::new(ServiceState {
                store: NoteStore::new(),
                draining: false,
                generation: 0,
            })),
            drain_tx,
            grace_interval,
        };
        (service, drain_rx)
    }

    pub async fn handle(&self, request: Request) -> Response {
        let op = request.name();
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(error) => {
                if error.is_selector_error() {
                    tracing::debug!(op, error = %error, "request rejected");
                } else {
                    tracing::warn!(op, error = %error, "request failed");
                }
                Response::from_error(&error)
            }
        }
    }

    /// Marks the service as draining so nothing else lands in a store that is
    /// about to disappear.
    pub async fn begin_drain(&self) {
        let mut state = self.state.lock().await;
        state.draining = true;
    }

    pub async fn note_count(&self) -> usize {
        self.state.lock().await.store.len()
    }

    async fn dispatch(&self, request: Request) -> AppResult<Response> {
        let mut state = self.state.lock().await;
        if state.draining {
            return Err(AppError::SessionEnded("daemon is shutting down".to_string()));
        }

        let response = match request {
            Request::Add { text, pinned } => {
                let note = state.store.add(text, pinned);
                state.generation += 1;
                tracing::info!(note_id = note.id, pinned, "note added");
                Response::Note(NoteReply {
                    message: Some(format!("Note added (ID: {})", note.id)),
                    note,
                })
            }
            Request::List => Response::Notes(ListReply {
                notes: state.store.list(),
            }),
            Request::Remove { selector } => {
                let note = state.store.remove(&selector)?;
                tracing::info!(note_id = note.id, selector = %selector, "note removed");
                if state.store.is_empty() {
                    self.schedule_auto_shutdown(&mut state, self.grace_interval);
                }
                Response::Note(NoteReply {
                    message: Some(format!("Removed note {}", note.id)),
                    note,
                })
            }
            Request::Clear => {
                let dropped = state.store.clear();
                tracing::info!(dropped, "store cleared");
                self.schedule_auto_shutdown(&mut state, self.grace_interval);
                Response::Message(MessageReply {
                    message: "All notes cleared. Session ended.".to_string(),
                })
            }
            Request::Pin { selector } => {
                let note = state.store.pin(&selector)?;
                tracing::info!(note_id = note.id, "note pinned");
                Response::Note(NoteReply {
                    message: Some(format!("Pinned note {}", note.id)),
                    note,
                })
            }
            Request::Unpin { selector } => {
                let note = state.store.unpin(&selector)?;
                tracing::info!(note_id = note.id, "note unpinned");
                Response::Note(NoteReply {
                    message: Some(format!("Unpinned note {}", note.id)),
                    note,
                })
            }
            Request::Show { selector } => Response::Note(NoteReply {
                note: state.store.show(&selector)?,
                message: None,
            }),
        };

        Ok(response)
    }

    /// A freshly spawned daemon starts empty; if the add that launched it never
    /// arrives it must not linger.
    pub async fn arm_startup_timeout(&self, delay: Duration) {
        let mut state = self.state.lock().await;
        self.schedule_auto_shutdown(&mut state, delay);
    }

    // The timer re-checks at fire time: an add during the grace interval, or a
    // newer timer armed since, keeps this one from draining.
    fn schedule_auto_shutdown(&self, state: &mut ServiceState, delay: Duration) {
        state.generation += 1;
        let armed_generation = state.generation;
        let service = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = service.state.lock().await;
            if state.draining || state.generation != armed_generation || !state.store.is_empty() {
                tracing::debug!(notes = state.store.len(), "auto-shutdown skipped");
                return;
            }
            state.draining = true;
            drop(state);
            tracing::info!("store still empty after grace interval");
            let _ = service.drain_tx.send(DrainReason::Empty).await;
        });
    }
}
