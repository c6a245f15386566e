//! Output capabilities and the registry the player binds tracks against.
//!
//! Outputs are opaque to the playback core: a parameter accepts typed
//! values, an event sink accepts discrete events. The registry is built
//! explicitly by the host before the player is constructed; nothing
//! self-registers, and lookup order is the registration order.

use std::sync::Arc;

use crate::events::EventQueue;
use crate::value::{Value, ValueKind};

/// A numeric output the player can drive once per tick.
pub trait ParameterOutput: Send + Sync {
    /// The value kind this output accepts; checked at bind time.
    fn value_kind(&self) -> ValueKind;

    /// Apply a value. Called every tick while a containing segment is
    /// active; for `MainThread` outputs only via the mailbox flush.
    fn set_value(&self, value: Value);
}

/// Which threads may touch an output directly.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputAffinity {
    /// Safe to mutate from any thread; written inline on the playback thread.
    AnyThread,
    /// Owned by the main thread; writes are staged in a mailbox and
    /// applied by [`crate::player::SequencePlayer::flush_outputs`].
    MainThread,
}

/// One registered output: a typed parameter or an event sink.
#[derive(Clone)]
pub enum OutputTarget {
    Parameter {
        parameter: Arc<dyn ParameterOutput>,
        affinity: OutputAffinity,
    },
    Events(EventQueue),
}

/// Ordered registry of outputs, resolved by string identifier.
#[derive(Default, Clone)]
pub struct OutputSet {
    entries: Vec<(String, OutputTarget)>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter output. Re-registering an id replaces it.
    pub fn register_parameter(
        &mut self,
        id: impl Into<String>,
        parameter: Arc<dyn ParameterOutput>,
        affinity: OutputAffinity,
    ) {
        self.upsert(id.into(), OutputTarget::Parameter { parameter, affinity });
    }

    /// Register an event sink. Keep a clone of the queue to poll it.
    pub fn register_events(&mut self, id: impl Into<String>, queue: EventQueue) {
        self.upsert(id.into(), OutputTarget::Events(queue));
    }

    fn upsert(&mut self, id: String, target: OutputTarget) {
        if let Some(entry) = self.entries.iter_mut().find(|(eid, _)| *eid == id) {
            entry.1 = target;
        } else {
            self.entries.push((id, target));
        }
    }

    pub fn get(&self, id: &str) -> Option<&OutputTarget> {
        self.entries
            .iter()
            .find_map(|(eid, target)| if eid == id { Some(target) } else { None })
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, OutputTarget)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
