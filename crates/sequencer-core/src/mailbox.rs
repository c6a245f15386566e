//! Single-slot handoff for outputs that may only be touched from the
//! main thread.
//!
//! The playback thread stores the freshest value; the main thread applies
//! it once per frame via [`ParameterMailbox::flush`]. Last value wins:
//! when several ticks land between two flushes, the intermediate values
//! are dropped by contract, which is acceptable for continuous
//! parameters and keeps the playback thread free of main-thread locks.

use std::sync::{Arc, Mutex};

use crate::output::ParameterOutput;
use crate::value::Value;

pub struct ParameterMailbox {
    parameter: Arc<dyn ParameterOutput>,
    slot: Mutex<Option<Value>>,
}

impl ParameterMailbox {
    pub fn new(parameter: Arc<dyn ParameterOutput>) -> Self {
        Self {
            parameter,
            slot: Mutex::new(None),
        }
    }

    /// Overwrite the pending value. Called from the playback thread.
    pub fn store(&self, value: Value) {
        *self.lock() = Some(value);
    }

    /// Apply and clear the pending value, if any. Called from the thread
    /// that owns the underlying output.
    pub fn flush(&self) {
        let pending = self.lock().take();
        if let Some(value) = pending {
            self.parameter.set_value(value);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
