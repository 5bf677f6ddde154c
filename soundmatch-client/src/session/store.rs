//! Session store
//!
//! Holds the current [`SessionState`] snapshot. Each dispatched action is
//! reduced and installed under the write lock, so readers only ever see a
//! complete state. Handles dropped by a transition are released after the new
//! state is installed, then a [`SessionEvent`] is published.

use super::registry::ResourceRegistry;
use super::state::{SessionAction, SessionState};
use crate::error::SessionError;
use chrono::Utc;
use soundmatch_common::events::{EventBus, SessionEvent};
use std::sync::{Arc, PoisonError, RwLock};

/// Outcome of [`SessionStore::dispatch`]
#[derive(Debug, Clone)]
pub struct Dispatched {
    /// State installed by this dispatch (unchanged if not applied)
    pub state: Arc<SessionState>,
    pub applied: bool,
}

/// Single source of truth for one session
#[derive(Debug)]
pub struct SessionStore {
    state: RwLock<Arc<SessionState>>,
    registry: ResourceRegistry,
    event_bus: EventBus,
}

impl SessionStore {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            state: RwLock::new(Arc::new(SessionState::new())),
            registry: ResourceRegistry::new(),
            event_bus,
        }
    }

    /// Current state; never a partially applied transition
    pub fn snapshot(&self) -> Arc<SessionState> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Reduce `action` against the current state and install the result
    pub fn dispatch(&self, action: SessionAction) -> Dispatched {
        let (state, released, applied) = {
            let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let transition = guard.reduce(action.clone());
            if transition.applied {
                *guard = Arc::new(transition.state);
            }
            (Arc::clone(&*guard), transition.released, transition.applied)
        };

        let released_count = released.len();
        for handle in &released {
            if let Err(e) = self.registry.release(handle) {
                tracing::error!(handle = %handle, error = %e, "Failed to release handle");
            }
        }

        if applied {
            let event = describe(&action, &state);
            tracing::debug!(
                event = event.kind(),
                generation = state.generation(),
                "Session transition applied"
            );
            self.event_bus.emit_lossy(event);
        } else {
            tracing::debug!(?action, "Session action ignored");
        }

        if released_count > 0 {
            self.event_bus.emit_lossy(SessionEvent::HandlesReleased {
                count: released_count,
                timestamp: Utc::now(),
            });
        }

        Dispatched { state, applied }
    }
}

fn describe(action: &SessionAction, state: &SessionState) -> SessionEvent {
    let timestamp = Utc::now();
    match action {
        SessionAction::FileAccepted { file, preview } => SessionEvent::FileSelected {
            file_name: file.name.clone(),
            media_type: file.media_type.clone(),
            preview_url: preview.url(),
            timestamp,
        },
        SessionAction::FileRejected { error } => SessionEvent::FileRejected {
            media_type: match error {
                SessionError::InvalidFileType { media_type } => media_type.clone(),
                _ => String::new(),
            },
            timestamp,
        },
        SessionAction::SubmissionStarted => SessionEvent::SubmissionStarted {
            generation: state.generation(),
            file_name: state
                .selected_file()
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            timestamp,
        },
        SessionAction::SubmissionSucceeded { generation, .. } => SessionEvent::ResultsReady {
            generation: *generation,
            match_count: state.matches().len(),
            timestamp,
        },
        SessionAction::SubmissionFailed { generation, error } => {
            SessionEvent::SubmissionFailed {
                generation: *generation,
                message: error.to_string(),
                timestamp,
            }
        }
        SessionAction::PlaybackFetchStarted { path, .. } => SessionEvent::PlaybackFetchStarted {
            path: path.clone(),
            timestamp,
        },
        SessionAction::PlaybackFetched { path, handle, .. } => SessionEvent::PlaybackReady {
            path: path.clone(),
            handle_url: handle.url(),
            timestamp,
        },
        SessionAction::PlaybackFetchFailed { path, error, .. } => SessionEvent::PlaybackFailed {
            path: path.clone(),
            message: error.to_string(),
            timestamp,
        },
        SessionAction::Reset => SessionEvent::SessionReset {
            generation: state.generation(),
            timestamp,
        },
    }
}
