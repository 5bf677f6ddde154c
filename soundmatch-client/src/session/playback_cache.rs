//! Match playback cache
//!
//! Audio for a match is fetched on the first play request and memoized in
//! the session state. At most one fetch per identifier is outstanding: a
//! request arriving while a fetch is in flight awaits that same fetch.
//!
//! In-flight fetches are keyed by `(generation, path)` so a fetch started for
//! a superseded result set is never joined by requests for the new one.

use super::registry::AudioHandle;
use super::state::SessionAction;
use super::store::SessionStore;
use crate::error::{SessionError, SessionResult};
use crate::services::SimilarityService;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

type FetchKey = (u64, String);
type SharedFetch = Shared<BoxFuture<'static, SessionResult<AudioHandle>>>;
type InFlight = Arc<Mutex<HashMap<FetchKey, SharedFetch>>>;

pub struct PlaybackCache {
    store: Arc<SessionStore>,
    service: Arc<dyn SimilarityService>,
    in_flight: InFlight,
}

impl PlaybackCache {
    pub fn new(store: Arc<SessionStore>, service: Arc<dyn SimilarityService>) -> Self {
        Self {
            store,
            service,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock_in_flight(in_flight: &InFlight) -> MutexGuard<'_, HashMap<FetchKey, SharedFetch>> {
        in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle for the audio behind `path`, fetching it on first request
    pub async fn request_playback(&self, path: &str) -> SessionResult<AudioHandle> {
        let fetch = {
            // Cache check and in-flight registration happen under one lock
            let mut in_flight = Self::lock_in_flight(&self.in_flight);
            let state = self.store.snapshot();

            if let Some(handle) = state.cached_handle(path) {
                tracing::debug!(path = %path, handle = %handle, "Playback cache hit");
                return Ok(handle.clone());
            }

            let key = (state.generation(), path.to_string());
            match in_flight.get(&key) {
                Some(existing) => {
                    tracing::debug!(path = %path, "Joining in-flight playback fetch");
                    existing.clone()
                }
                None => {
                    self.store.dispatch(SessionAction::PlaybackFetchStarted {
                        generation: key.0,
                        path: key.1.clone(),
                    });
                    let task = tokio::spawn(fetch_and_install(
                        Arc::clone(&self.store),
                        Arc::clone(&self.service),
                        Arc::clone(&self.in_flight),
                        key.clone(),
                    ));
                    let fetch = join_fetch(
                        task,
                        Arc::clone(&self.store),
                        Arc::clone(&self.in_flight),
                        key.clone(),
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(key, fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Bytes behind a live playback handle
    pub fn playback_data(&self, handle: &AudioHandle) -> Option<Arc<Vec<u8>>> {
        self.store.registry().resolve(handle)
    }

    /// Number of fetches currently outstanding
    pub fn in_flight_count(&self) -> usize {
        Self::lock_in_flight(&self.in_flight).len()
    }
}

/// Await a spawned fetch, cleaning up after it if the task died
async fn join_fetch(
    task: JoinHandle<SessionResult<AudioHandle>>,
    store: Arc<SessionStore>,
    in_flight: InFlight,
    key: FetchKey,
) -> SessionResult<AudioHandle> {
    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let (generation, path) = key.clone();
            tracing::error!(path = %path, error = %e, "Playback fetch task aborted");
            let error = SessionError::PlaybackFetchFailed {
                path: path.clone(),
                reason: format!("fetch task aborted: {}", e),
            };
            store.dispatch(SessionAction::PlaybackFetchFailed {
                generation,
                path,
                error: error.clone(),
            });
            PlaybackCache::lock_in_flight(&in_flight).remove(&key);
            Err(error)
        }
    }
}

/// Fetch, install and retire the in-flight entry
///
/// Spawned, so it completes even if every requester drops its future.
async fn fetch_and_install(
    store: Arc<SessionStore>,
    service: Arc<dyn SimilarityService>,
    in_flight: InFlight,
    key: FetchKey,
) -> SessionResult<AudioHandle> {
    let (generation, path) = key.clone();
    tracing::info!(generation, path = %path, "Fetching match audio");

    let outcome = match service.fetch_audio(&path).await {
        Ok(bytes) => {
            let size = bytes.len();
            let handle = store.registry().acquire(bytes);
            let dispatched = store.dispatch(SessionAction::PlaybackFetched {
                generation,
                path: path.clone(),
                handle: handle.clone(),
            });
            if dispatched.applied {
                tracing::info!(path = %path, handle = %handle, bytes = size, "Match audio cached");
                Ok(handle)
            } else {
                tracing::info!(path = %path, "Discarding match audio for superseded results");
                Err(SessionError::PlaybackFetchFailed {
                    path: path.clone(),
                    reason: "results were replaced before the fetch completed".to_string(),
                })
            }
        }
        Err(e) => {
            let error = SessionError::PlaybackFetchFailed {
                path: path.clone(),
                reason: e.to_string(),
            };
            tracing::warn!(path = %path, error = %e, "Match audio fetch failed");
            store.dispatch(SessionAction::PlaybackFetchFailed {
                generation,
                path: path.clone(),
                error: error.clone(),
            });
            Err(error)
        }
    };

    // State is installed first so later requests see either the entry or the cache
    PlaybackCache::lock_in_flight(&in_flight).remove(&key);
    outcome
}
