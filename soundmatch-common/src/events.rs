//! Session event types and broadcast bus
//!
//! The session store publishes one [`SessionEvent`] per applied transition.
//! Presentation layers subscribe to re-render from the latest session
//! snapshot; no component depends on an event being delivered.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

type Timestamp = chrono::DateTime<chrono::Utc>;

/// Session event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// An audio file was accepted and its preview handle created
    FileSelected {
        file_name: String,
        media_type: String,
        preview_url: String,
        timestamp: Timestamp,
    },

    /// A selection was rejected because its media type is not audio
    FileRejected {
        media_type: String,
        timestamp: Timestamp,
    },

    /// Upload to the similarity service started
    SubmissionStarted {
        generation: u64,
        file_name: String,
        timestamp: Timestamp,
    },

    /// Ranked matches installed (zero matches is a valid result)
    ResultsReady {
        generation: u64,
        match_count: usize,
        timestamp: Timestamp,
    },

    /// Upload failed; matches stay empty
    SubmissionFailed {
        generation: u64,
        message: String,
        timestamp: Timestamp,
    },

    /// First fetch for a match identifier issued
    PlaybackFetchStarted {
        path: String,
        timestamp: Timestamp,
    },

    /// Match audio fetched and cached
    PlaybackReady {
        path: String,
        handle_url: String,
        timestamp: Timestamp,
    },

    /// Match audio fetch failed (not cached)
    PlaybackFailed {
        path: String,
        message: String,
        timestamp: Timestamp,
    },

    /// Session returned to idle
    SessionReset {
        generation: u64,
        timestamp: Timestamp,
    },

    /// Handles released as a side effect of a transition
    HandlesReleased {
        count: usize,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Short event name, used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::FileSelected { .. } => "FileSelected",
            SessionEvent::FileRejected { .. } => "FileRejected",
            SessionEvent::SubmissionStarted { .. } => "SubmissionStarted",
            SessionEvent::ResultsReady { .. } => "ResultsReady",
            SessionEvent::SubmissionFailed { .. } => "SubmissionFailed",
            SessionEvent::PlaybackFetchStarted { .. } => "PlaybackFetchStarted",
            SessionEvent::PlaybackReady { .. } => "PlaybackReady",
            SessionEvent::PlaybackFailed { .. } => "PlaybackFailed",
            SessionEvent::SessionReset { .. } => "SessionReset",
            SessionEvent::HandlesReleased { .. } => "HandlesReleased",
        }
    }
}

/// Broadcast bus for [`SessionEvent`]s
///
/// Cloning the bus shares the underlying channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// # Examples
    ///
    /// ```
    /// use soundmatch_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(64);
    /// assert_eq!(event_bus.capacity(), 64);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        let event = SessionEvent::ResultsReady {
            generation: 3,
            match_count: 2,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus
            .emit(SessionEvent::HandlesReleased {
                count: 1,
                timestamp: chrono::Utc::now(),
            })
            .is_err());
        // Lossy emit never fails
        bus.emit_lossy(SessionEvent::HandlesReleased {
            count: 1,
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SessionEvent::PlaybackFetchStarted {
            path: "a/b/Track One.mp3".to_string(),
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlaybackFetchStarted");
        assert_eq!(json["path"], "a/b/Track One.mp3");
        assert_eq!(event.kind(), "PlaybackFetchStarted");
    }
}
