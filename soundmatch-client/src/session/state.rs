//! Session state and its transition function
//!
//! `SessionState` is immutable per transition: [`SessionState::reduce`]
//! takes the current state and a [`SessionAction`] and returns a new state
//! together with every handle the new state no longer references. The caller
//! releases those handles after installing the new state.
//!
//! Lifecycle:
//! IDLE → SUBMITTING → RESULTS_READY | SUBMIT_FAILED
//!
//! While results are shown each match moves through
//! NOT_FETCHED → FETCHING → FETCHED | FETCH_FAILED.

use super::registry::AudioHandle;
use crate::error::SessionError;
use crate::models::{SelectedFile, SimilarityMatch};
use std::collections::HashMap;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No submission made since start or reset
    Idle,
    /// Upload in flight
    Submitting,
    /// Matches installed (possibly none)
    ResultsReady,
    /// Last upload failed
    SubmitFailed,
}

/// Playback status of one match identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    NotFetched,
    Fetching,
    Fetched(AudioHandle),
    /// Not cached; the next request fetches again
    FetchFailed,
}

/// Transition requests accepted by [`SessionState::reduce`]
#[derive(Debug, Clone)]
pub enum SessionAction {
    FileAccepted {
        file: SelectedFile,
        preview: AudioHandle,
    },
    FileRejected {
        error: SessionError,
    },
    SubmissionStarted,
    SubmissionSucceeded {
        generation: u64,
        matches: Vec<SimilarityMatch>,
    },
    SubmissionFailed {
        generation: u64,
        error: SessionError,
    },
    PlaybackFetchStarted {
        generation: u64,
        path: String,
    },
    PlaybackFetched {
        generation: u64,
        path: String,
        handle: AudioHandle,
    },
    PlaybackFetchFailed {
        generation: u64,
        path: String,
        error: SessionError,
    },
    Reset,
}

/// Result of applying one action
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    /// Handles no longer referenced by `state`
    pub released: Vec<AudioHandle>,
    /// False when the action was ignored (guard or stale generation)
    pub applied: bool,
}

/// Aggregate session state observed by the presentation layer
#[derive(Debug, Clone)]
pub struct SessionState {
    selected_file: Option<SelectedFile>,
    upload_preview: Option<AudioHandle>,
    phase: SessionPhase,
    error: Option<SessionError>,
    matches: Vec<SimilarityMatch>,
    playback: HashMap<String, PlaybackStatus>,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selected_file: None,
            upload_preview: None,
            phase: SessionPhase::Idle,
            error: None,
            matches: Vec::new(),
            playback: HashMap::new(),
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn upload_preview(&self) -> Option<&AudioHandle> {
        self.upload_preview.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Submitting
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Text for the user-visible error slot
    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(SessionError::user_message)
    }

    /// Matches in rank order
    pub fn matches(&self) -> &[SimilarityMatch] {
        &self.matches
    }

    /// Incremented by every submission start and every reset
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn playback_status(&self, path: &str) -> PlaybackStatus {
        self.playback
            .get(path)
            .cloned()
            .unwrap_or(PlaybackStatus::NotFetched)
    }

    pub fn cached_handle(&self, path: &str) -> Option<&AudioHandle> {
        match self.playback.get(path) {
            Some(PlaybackStatus::Fetched(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Every handle this state references
    pub fn referenced_handles(&self) -> Vec<&AudioHandle> {
        self.upload_preview
            .iter()
            .chain(self.playback.values().filter_map(|status| match status {
                PlaybackStatus::Fetched(handle) => Some(handle),
                _ => None,
            }))
            .collect()
    }

    fn cached_playback_handles(&self) -> Vec<AudioHandle> {
        self.playback
            .values()
            .filter_map(|status| match status {
                PlaybackStatus::Fetched(handle) => Some(handle.clone()),
                _ => None,
            })
            .collect()
    }

    /// Apply an action, returning the next state and the handles it drops
    pub fn reduce(&self, action: SessionAction) -> Transition {
        let mut next = self.clone();
        let mut released = Vec::new();

        let applied = match action {
            SessionAction::FileAccepted { file, preview } => {
                released.extend(next.upload_preview.replace(preview));
                next.selected_file = Some(file);
                next.error = None;
                true
            }

            SessionAction::FileRejected { error } => {
                released.extend(next.upload_preview.take());
                next.selected_file = None;
                next.error = Some(error);
                true
            }

            SessionAction::SubmissionStarted => {
                if next.selected_file.is_none() || next.is_loading() {
                    false
                } else {
                    released.extend(next.cached_playback_handles());
                    next.playback.clear();
                    next.matches.clear();
                    next.error = None;
                    next.phase = SessionPhase::Submitting;
                    next.generation += 1;
                    true
                }
            }

            SessionAction::SubmissionSucceeded {
                generation,
                matches,
            } => {
                if generation != next.generation || !next.is_loading() {
                    false
                } else {
                    next.matches = matches;
                    next.phase = SessionPhase::ResultsReady;
                    true
                }
            }

            SessionAction::SubmissionFailed { generation, error } => {
                if generation != next.generation || !next.is_loading() {
                    false
                } else {
                    next.matches.clear();
                    next.error = Some(error);
                    next.phase = SessionPhase::SubmitFailed;
                    true
                }
            }

            SessionAction::PlaybackFetchStarted { generation, path } => {
                if generation != next.generation || next.cached_handle(&path).is_some() {
                    false
                } else {
                    next.playback.insert(path, PlaybackStatus::Fetching);
                    true
                }
            }

            SessionAction::PlaybackFetched {
                generation,
                path,
                handle,
            } => {
                if generation != next.generation {
                    released.push(handle);
                    false
                } else {
                    if let Some(PlaybackStatus::Fetched(previous)) =
                        next.playback.insert(path, PlaybackStatus::Fetched(handle))
                    {
                        released.push(previous);
                    }
                    true
                }
            }

            SessionAction::PlaybackFetchFailed {
                generation,
                path,
                error,
            } => {
                if generation != next.generation {
                    false
                } else {
                    next.playback.insert(path, PlaybackStatus::FetchFailed);
                    next.error = Some(error);
                    true
                }
            }

            SessionAction::Reset => {
                released.extend(next.upload_preview.take());
                released.extend(next.cached_playback_handles());
                next = SessionState {
                    generation: self.generation + 1,
                    ..SessionState::default()
                };
                true
            }
        };

        Transition {
            state: next,
            released,
            applied,
        }
    }
}
