//! Player configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::player::SequencePlayer`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Document to load at construction time. `None` starts from the
    /// default sequence synthesized from the registered outputs.
    pub sequence_file: Option<PathBuf>,

    /// Tick rate of the update thread, in ticks per second.
    pub frequency: f32,

    /// When loading `sequence_file` fails, fall back to the synthesized
    /// default sequence instead of failing construction.
    pub create_empty_on_load_failure: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sequence_file: None,
            frequency: 1000.0,
            create_empty_on_load_failure: true,
        }
    }
}
