//! Upload orchestrator
//!
//! Validates the selected file and drives one submission at a time through
//! IDLE → SUBMITTING → RESULTS_READY | SUBMIT_FAILED.

use super::state::{SessionAction, SessionState};
use super::store::SessionStore;
use crate::error::{SessionError, SessionResult};
use crate::models::SelectedFile;
use crate::services::SimilarityService;
use std::sync::Arc;

/// What a call to [`UploadOrchestrator::submit`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// No file selected, or a submission was already in flight
    Skipped,
    /// Matches installed
    Completed { match_count: usize },
    /// Session was reset while the upload was in flight; result discarded
    Superseded,
}

pub struct UploadOrchestrator {
    store: Arc<SessionStore>,
    service: Arc<dyn SimilarityService>,
}

impl UploadOrchestrator {
    pub fn new(store: Arc<SessionStore>, service: Arc<dyn SimilarityService>) -> Self {
        Self { store, service }
    }

    /// Install `file` as the current selection if it is audio
    ///
    /// A rejected file clears the current selection and its preview but
    /// leaves matches untouched.
    pub fn select_file(&self, file: SelectedFile) -> SessionResult<Arc<SessionState>> {
        if !file.is_audio() {
            let error = SessionError::InvalidFileType {
                media_type: file.media_type.clone(),
            };
            tracing::warn!(
                file = %file.name,
                media_type = %file.media_type,
                "Rejected non-audio file"
            );
            self.store.dispatch(SessionAction::FileRejected {
                error: error.clone(),
            });
            return Err(error);
        }

        let preview = self.store.registry().acquire(Arc::clone(&file.content));
        tracing::info!(
            file = %file.name,
            media_type = %file.media_type,
            preview = %preview,
            "File selected"
        );
        let dispatched = self
            .store
            .dispatch(SessionAction::FileAccepted { file, preview });
        Ok(dispatched.state)
    }

    /// Upload the selected file and install the ranked matches
    ///
    /// Exactly one network submission per non-skipped call; failures are
    /// surfaced, never retried. The upload runs on its own task, so dropping
    /// the returned future does not leave the session in SUBMITTING.
    pub async fn submit(&self) -> SessionResult<SubmitOutcome> {
        let started = self.store.dispatch(SessionAction::SubmissionStarted);
        if !started.applied {
            tracing::debug!("Submit skipped: no file selected or submission in flight");
            return Ok(SubmitOutcome::Skipped);
        }

        let generation = started.state.generation();
        let Some(file) = started.state.selected_file().cloned() else {
            return Ok(SubmitOutcome::Skipped);
        };

        tracing::info!(generation, file = %file.name, "Submitting file for similarity lookup");

        let task = tokio::spawn(run_submission(
            Arc::clone(&self.store),
            Arc::clone(&self.service),
            generation,
            file,
        ));

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(generation, error = %e, "Submission task aborted");
                let error = SessionError::UploadFailed(format!("submission task aborted: {}", e));
                self.store.dispatch(SessionAction::SubmissionFailed {
                    generation,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Return to IDLE, releasing the preview and every cached playback handle
    pub fn reset(&self) -> Arc<SessionState> {
        tracing::info!("Resetting session");
        self.store.dispatch(SessionAction::Reset).state
    }
}

/// Upload `file` and install the outcome for `generation`
async fn run_submission(
    store: Arc<SessionStore>,
    service: Arc<dyn SimilarityService>,
    generation: u64,
    file: SelectedFile,
) -> SessionResult<SubmitOutcome> {
    match service.find_similar(&file).await {
        Ok(matches) => {
            let match_count = matches.len();
            let dispatched = store.dispatch(SessionAction::SubmissionSucceeded {
                generation,
                matches,
            });
            if dispatched.applied {
                tracing::info!(generation, match_count, "Similarity results ready");
                Ok(SubmitOutcome::Completed { match_count })
            } else {
                tracing::info!(generation, "Discarding results for superseded submission");
                Ok(SubmitOutcome::Superseded)
            }
        }
        Err(e) => {
            let error = SessionError::UploadFailed(e.to_string());
            let dispatched = store.dispatch(SessionAction::SubmissionFailed {
                generation,
                error: error.clone(),
            });
            if dispatched.applied {
                tracing::warn!(generation, error = %e, "Similarity lookup failed");
                Err(error)
            } else {
                tracing::info!(generation, error = %e, "Ignoring failure of superseded submission");
                Ok(SubmitOutcome::Superseded)
            }
        }
    }
}
