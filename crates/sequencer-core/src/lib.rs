//! Real-time parameter automation.
//!
//! A [`SequencePlayer`] owns a timeline document (a [`Sequence`] of
//! typed [`Track`]s of keyframed segments) and a fixed-rate background
//! thread that samples every bound track each tick and pushes the result
//! to an external output: numeric parameters for curve tracks, discrete
//! messages for event tracks. A [`SequenceController`] obtained from the
//! player is the only surface allowed to mutate the document; it shares
//! the player's lock, so edits and playback ticks interleave but never
//! overlap.
//!
//! Outputs are registered up front in an [`OutputSet`] and resolved by
//! string id when tracks are bound or a document is loaded. Outputs that
//! may only be touched from the main thread are driven through a
//! last-value-wins [`ParameterMailbox`], flushed once per frame via
//! [`SequencePlayer::flush_outputs`]; event tracks deliver through an
//! [`EventQueue`] drained by a single consumer with
//! [`EventQueue::consume_events`].

pub mod adapter;
pub mod config;
pub mod controller;
pub mod curve;
pub mod events;
pub mod mailbox;
pub mod output;
pub mod player;
pub mod sequence;
pub mod storage;
pub mod value;

pub use adapter::BindError;
pub use config::PlayerConfig;
pub use controller::{SegmentAnchor, SequenceController, DEFAULT_SEGMENT_DURATION};
pub use curve::{Curve, CurveInterp, CurvePoint, TanSide, Vec2};
pub use events::{EventQueue, SequenceEvent};
pub use mailbox::ParameterMailbox;
pub use output::{OutputAffinity, OutputSet, OutputTarget, ParameterOutput};
pub use player::{advance_time, SequencePlayer};
pub use sequence::{CurveSegment, EventSegment, Segment, Sequence, Track, TrackKind};
pub use storage::{load_sequence, save_sequence, StorageError};
pub use value::{Value, ValueKind};
