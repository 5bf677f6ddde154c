//! Resource registry for transient audio handles
//!
//! Every buffer handed to the presentation layer (the upload preview and each
//! fetched match) is wrapped in an [`AudioHandle`] addressable as
//! `blob:soundmatch/<uuid>`. The registry owns the bytes; a handle is only an
//! address. Each acquired handle must be released exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use uuid::Uuid;

const HANDLE_URL_PREFIX: &str = "blob:soundmatch/";

/// Address of a buffer held by the [`ResourceRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AudioHandle {
    id: Uuid,
}

impl AudioHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// URL-like reference a playback surface can consume
    pub fn url(&self) -> String {
        format!("{}{}", HANDLE_URL_PREFIX, self.id)
    }
}

impl fmt::Display for AudioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", HANDLE_URL_PREFIX, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Unknown or already released handle: {0}")]
    UnknownHandle(String),
}

#[derive(Debug, Default)]
struct RegistryInner {
    live: HashMap<Uuid, Arc<Vec<u8>>>,
    acquired_total: u64,
    released_total: u64,
}

/// Owner of all live audio buffers
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    inner: Mutex<RegistryInner>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing panics while the lock is held; poisoned data is still consistent.
    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wrap audio bytes in a new handle
    pub fn acquire(&self, bytes: impl Into<Arc<Vec<u8>>>) -> AudioHandle {
        let bytes = bytes.into();
        let handle = AudioHandle { id: Uuid::new_v4() };

        let mut inner = self.lock();
        let size = bytes.len();
        inner.live.insert(handle.id, bytes);
        inner.acquired_total += 1;

        tracing::trace!(handle = %handle, bytes = size, live = inner.live.len(), "Handle acquired");
        handle
    }

    /// Invalidate a handle and drop its buffer
    pub fn release(&self, handle: &AudioHandle) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        match inner.live.remove(&handle.id) {
            Some(_) => {
                inner.released_total += 1;
                tracing::trace!(handle = %handle, live = inner.live.len(), "Handle released");
                Ok(())
            }
            None => {
                tracing::warn!(handle = %handle, "Release of unknown or already released handle");
                Err(RegistryError::UnknownHandle(handle.url()))
            }
        }
    }

    /// Bytes behind a live handle; `None` once released
    pub fn resolve(&self, handle: &AudioHandle) -> Option<Arc<Vec<u8>>> {
        self.lock().live.get(&handle.id).cloned()
    }

    pub fn is_live(&self, handle: &AudioHandle) -> bool {
        self.lock().live.contains_key(&handle.id)
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn acquired_total(&self) -> u64 {
        self.lock().acquired_total
    }

    pub fn released_total(&self) -> u64 {
        self.lock().released_total
    }
}
