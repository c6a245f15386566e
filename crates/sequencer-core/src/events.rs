//! Discrete events crossed during playback and the queue that delivers
//! them to exactly one consumer on another thread.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// One crossed event marker.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SequenceEvent {
    /// Marker time on the timeline, seconds.
    pub time: f64,
    /// Track the marker belongs to.
    pub track_id: String,
    /// Payload message.
    pub message: String,
}

/// Thread-safe FIFO for sequence events.
///
/// The playback thread enqueues, one consumer drains via
/// [`EventQueue::consume_events`], which swaps the whole queue for an
/// empty one under a short lock: every event is delivered exactly once,
/// in crossing order, and a consumer can never observe a half-drained
/// queue.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<Vec<SequenceEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, event: SequenceEvent) {
        self.lock().push(event);
    }

    /// Take every pending event, oldest first.
    pub fn consume_events(&self) -> Vec<SequenceEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SequenceEvent>> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
