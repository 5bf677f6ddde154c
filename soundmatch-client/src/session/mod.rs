//! Session core
//!
//! - [`registry`]: transient audio handles
//! - [`state`]: immutable session state and its transition function
//! - [`store`]: atomic installation of transitions, releases, events
//! - [`orchestrator`]: file selection and upload
//! - [`playback_cache`]: lazily fetched, deduplicated match audio

pub mod orchestrator;
pub mod playback_cache;
pub mod registry;
pub mod state;
pub mod store;

pub use orchestrator::{SubmitOutcome, UploadOrchestrator};
pub use playback_cache::PlaybackCache;
pub use registry::{AudioHandle, RegistryError, ResourceRegistry};
pub use state::{PlaybackStatus, SessionAction, SessionPhase, SessionState, Transition};
pub use store::{Dispatched, SessionStore};

use crate::error::SessionResult;
use crate::models::SelectedFile;
use crate::services::SimilarityService;
use soundmatch_common::events::{EventBus, SessionEvent};
use std::sync::Arc;
use tokio::sync::broadcast;

/// One similarity lookup session: store, orchestrator and playback cache
/// wired to the same state and service.
pub struct SimilaritySession {
    store: Arc<SessionStore>,
    orchestrator: UploadOrchestrator,
    playback: PlaybackCache,
}

impl SimilaritySession {
    pub fn new(service: Arc<dyn SimilarityService>, event_bus: EventBus) -> Self {
        let store = Arc::new(SessionStore::new(event_bus));
        Self {
            orchestrator: UploadOrchestrator::new(Arc::clone(&store), Arc::clone(&service)),
            playback: PlaybackCache::new(Arc::clone(&store), service),
            store,
        }
    }

    pub fn state(&self) -> Arc<SessionState> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.store.event_bus().subscribe()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        self.store.registry()
    }

    pub fn orchestrator(&self) -> &UploadOrchestrator {
        &self.orchestrator
    }

    pub fn playback(&self) -> &PlaybackCache {
        &self.playback
    }

    pub fn select_file(&self, file: SelectedFile) -> SessionResult<Arc<SessionState>> {
        self.orchestrator.select_file(file)
    }

    pub async fn submit(&self) -> SessionResult<SubmitOutcome> {
        self.orchestrator.submit().await
    }

    pub async fn request_playback(&self, path: &str) -> SessionResult<AudioHandle> {
        self.playback.request_playback(path).await
    }

    pub fn playback_data(&self, handle: &AudioHandle) -> Option<Arc<Vec<u8>>> {
        self.playback.playback_data(handle)
    }

    pub fn reset(&self) -> Arc<SessionState> {
        self.orchestrator.reset()
    }
}
