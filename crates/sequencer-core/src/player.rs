//! The owning player: sequence document, adapter table, transport state
//! and the fixed-rate update thread.
//!
//! The player is the single serialization point for everything reachable
//! from the sequence. One mutex guards the document, the adapter table
//! and the transport flags; the update thread, the transport API and the
//! editing facade in [`crate::controller`] all funnel through it. The
//! mailbox list sits behind its own short lock so the main-thread flush
//! never contends with a running tick.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::adapter::{create_adapter, Adapter};
use crate::config::PlayerConfig;
use crate::controller::SequenceController;
use crate::mailbox::ParameterMailbox;
use crate::output::OutputSet;
use crate::sequence::{Sequence, Track};
use crate::storage::{self, StorageError};

/// Advance `time` by `dt * speed` against a timeline of `duration`
/// seconds. Returns the new time and whether a forward loop wrap
/// occurred this step. Looping wraps modulo the duration; otherwise the
/// result is clamped into `[0, duration]`. A backward wrap re-enters
/// from the end but is not reported, so reverse playback is never
/// mistaken for a loop crossing by the event adapters.
pub fn advance_time(time: f64, dt: f64, speed: f32, duration: f64, looping: bool) -> (f64, bool) {
    if duration <= 0.0 {
        return (0.0, false);
    }
    let next = time + dt * f64::from(speed);
    if looping {
        if next > duration {
            (next % duration, true)
        } else if next < 0.0 {
            (next.rem_euclid(duration), false)
        } else {
            (next, false)
        }
    } else {
        (next.clamp(0.0, duration), false)
    }
}

/// Everything guarded by the player's lock.
pub(crate) struct PlayerState {
    pub(crate) sequence: Sequence,
    /// One entry per bound track, keyed by track id.
    pub(crate) adapters: Vec<(String, Adapter)>,
    pub(crate) time: f64,
    pub(crate) is_playing: bool,
    pub(crate) is_paused: bool,
    pub(crate) is_looping: bool,
    pub(crate) speed: f32,
}

impl PlayerState {
    /// One tick: advance time when running, then drive every bound
    /// track's adapter. A paused player skips the advance but still
    /// drives its adapters at the frozen time, so scrubbing while
    /// paused produces live output; a stopped player drives nothing.
    fn step(&mut self, dt: f64) {
        let mut wrapped = false;
        if self.is_playing && !self.is_paused {
            let (time, w) = advance_time(
                self.time,
                dt,
                self.speed,
                self.sequence.duration,
                self.is_looping,
            );
            self.time = time;
            wrapped = w;
        }
        if self.is_playing {
            let time = self.time;
            let duration = self.sequence.duration;
            for (track_id, adapter) in self.adapters.iter_mut() {
                if let Some(track) = self.sequence.track(track_id) {
                    adapter.update(track, time, duration, wrapped);
                }
            }
        }
    }

    /// Bring `t` back into the legal range: wrapped modulo the duration
    /// when looping, clamped into `[0, duration]` otherwise.
    pub(crate) fn normalize_time(&self, t: f64) -> f64 {
        let duration = self.sequence.duration;
        if duration <= 0.0 {
            0.0
        } else if self.is_looping {
            t.rem_euclid(duration)
        } else {
            t.clamp(0.0, duration)
        }
    }
}

/// Resolve a track's binding against the registry and build its adapter.
///
/// An output id that is not registered leaves the track inert but keeps
/// the id, so saving the document does not lose the author's binding. A
/// kind mismatch clears the id: the binding is wrong, not merely
/// unavailable. Both outcomes are logged and non-fatal.
pub(crate) fn bind_track(track: &mut Track, outputs: &OutputSet, time: f64) -> Option<Adapter> {
    if track.output_id.is_empty() {
        return None;
    }
    let Some(target) = outputs.get(&track.output_id) else {
        warn!(
            "track '{}' references output '{}' which is not registered; track stays inert",
            track.name, track.output_id
        );
        return None;
    };
    match create_adapter(track, &track.output_id, target, time) {
        Ok(adapter) => Some(adapter),
        Err(err) => {
            warn!("cannot bind track '{}': {err}", track.name);
            track.output_id.clear();
            None
        }
    }
}

/// Rebuild the whole adapter table from the tracks' binding ids, with
/// partial-failure isolation: one bad binding never affects the others.
pub(crate) fn build_adapters(state: &mut PlayerState, outputs: &OutputSet) {
    let time = state.time;
    let mut adapters = Vec::new();
    for track in &mut state.sequence.tracks {
        if let Some(adapter) = bind_track(track, outputs, time) {
            adapters.push((track.id.clone(), adapter));
        }
    }
    state.adapters = adapters;
}

struct Shared {
    state: Mutex<PlayerState>,
    /// Mailboxes of the current adapter table, behind their own lock so
    /// the main-thread flush never takes the player's lock.
    mailboxes: Mutex<Vec<Arc<ParameterMailbox>>>,
    running: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Owns the sequence, the adapter table and the update thread.
///
/// Transport methods are safe to call from any thread. Mutating the
/// document goes through [`SequencePlayer::controller`]; reading it goes
/// through [`SequencePlayer::with_sequence`], which never lets a
/// reference escape the lock.
pub struct SequencePlayer {
    shared: Arc<Shared>,
    outputs: OutputSet,
    frequency: f32,
    thread: Option<JoinHandle<()>>,
}

impl SequencePlayer {
    /// Build a player over `outputs`. When `config.sequence_file` is set
    /// the document is loaded from disk; a load failure either falls
    /// back to the default sequence synthesized from the registered
    /// outputs (logged) or propagates, per
    /// `config.create_empty_on_load_failure`. The update thread is not
    /// started yet.
    pub fn new(config: PlayerConfig, outputs: OutputSet) -> Result<Self, StorageError> {
        let sequence = match &config.sequence_file {
            Some(path) => match storage::load_sequence(path) {
                Ok(sequence) => sequence,
                Err(err) if config.create_empty_on_load_failure => {
                    warn!(
                        "loading sequence from {} failed: {err}; starting from the default sequence",
                        path.display()
                    );
                    Sequence::default_for_outputs(&outputs)
                }
                Err(err) => return Err(err),
            },
            None => Sequence::default_for_outputs(&outputs),
        };
        let mut state = PlayerState {
            sequence,
            adapters: Vec::new(),
            time: 0.0,
            is_playing: false,
            is_paused: false,
            is_looping: false,
            speed: 1.0,
        };
        build_adapters(&mut state, &outputs);
        let mailboxes = state
            .adapters
            .iter()
            .filter_map(|(_, adapter)| adapter.mailbox())
            .collect();
        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                mailboxes: Mutex::new(mailboxes),
                running: AtomicBool::new(false),
            }),
            outputs,
            frequency: config.frequency,
            thread: None,
        })
    }

    /// Spawn the fixed-rate update thread. Idempotent while running.
    pub fn start(&mut self) {
        if self.thread.is_some() {
            return;
        }
        self.shared.running.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let period = Duration::from_secs_f64(1.0 / f64::from(self.frequency.max(1.0)));
        self.thread = Some(thread::spawn(move || update_loop(&shared, period)));
    }

    /// Signal the update thread to stop and join it. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("sequence player update thread panicked");
            }
        }
    }

    /// Perform exactly one tick synchronously. The update thread drives
    /// this same path; hosts without a thread (or tests) may call it
    /// directly with their own `dt`.
    pub fn step(&self, dt: f64) {
        lock(&self.shared.state).step(dt);
    }

    pub fn play(&self) {
        let mut state = self.lock_state();
        state.is_playing = true;
        state.is_paused = false;
    }

    /// Pause playback without leaving the playing state; adapters keep
    /// running at the frozen time.
    pub fn pause(&self) {
        let mut state = self.lock_state();
        if state.is_playing {
            state.is_paused = true;
        }
    }

    /// Stop playback. The playhead and every other setting keep their
    /// values.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        state.is_playing = false;
        state.is_paused = false;
    }

    /// Seek. The time is wrapped or clamped into the timeline.
    pub fn set_player_time(&self, time: f64) {
        let mut state = self.lock_state();
        state.time = state.normalize_time(time);
    }

    /// Playback speed factor; negative plays in reverse.
    pub fn set_playback_speed(&self, speed: f32) {
        self.lock_state().speed = speed;
    }

    pub fn set_is_looping(&self, looping: bool) {
        self.lock_state().is_looping = looping;
    }

    pub fn player_time(&self) -> f64 {
        self.lock_state().time
    }

    pub fn duration(&self) -> f64 {
        self.lock_state().sequence.duration
    }

    pub fn is_playing(&self) -> bool {
        self.lock_state().is_playing
    }

    pub fn is_paused(&self) -> bool {
        self.lock_state().is_paused
    }

    pub fn is_looping(&self) -> bool {
        self.lock_state().is_looping
    }

    pub fn playback_speed(&self) -> f32 {
        self.lock_state().speed
    }

    /// The editing facade. Every method on it runs under this player's
    /// lock.
    pub fn controller(&self) -> SequenceController<'_> {
        SequenceController::new(self)
    }

    /// Run a closure against the document under the lock. The closure
    /// must copy out whatever it needs; no reference survives the call.
    pub fn with_sequence<R>(&self, f: impl FnOnce(&Sequence) -> R) -> R {
        f(&self.lock_state().sequence)
    }

    /// Serialize the document to disk. The sequence is cloned under the
    /// lock; file I/O happens outside it.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let snapshot = self.lock_state().sequence.clone();
        storage::save_sequence(path, &snapshot)
    }

    /// Replace the document from disk. Reading, parsing and validation
    /// happen outside the lock; the swap, the playhead clamp and the
    /// adapter rebuild happen inside it.
    pub fn load(&mut self, path: &Path) -> Result<(), StorageError> {
        let sequence = storage::load_sequence(path)?;
        let mut state = self.lock_state();
        state.sequence = sequence;
        state.time = state.normalize_time(state.time);
        build_adapters(&mut state, &self.outputs);
        self.refresh_mailboxes(&state);
        info!(
            "loaded sequence '{}' ({} tracks, {:.3}s)",
            state.sequence.name,
            state.sequence.tracks.len(),
            state.sequence.duration
        );
        Ok(())
    }

    /// Apply every pending mailbox value to its parameter. Call once per
    /// frame from the thread that owns the main-thread outputs; the
    /// player's lock is not taken.
    pub fn flush_outputs(&self) {
        let mailboxes = lock(&self.shared.mailboxes).clone();
        for mailbox in &mailboxes {
            mailbox.flush();
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, PlayerState> {
        lock(&self.shared.state)
    }

    pub(crate) fn outputs(&self) -> &OutputSet {
        &self.outputs
    }

    /// Re-derive the mailbox list after the adapter table changed.
    pub(crate) fn refresh_mailboxes(&self, state: &PlayerState) {
        let mailboxes = state
            .adapters
            .iter()
            .filter_map(|(_, adapter)| adapter.mailbox())
            .collect();
        *lock(&self.shared.mailboxes) = mailboxes;
    }
}

impl Drop for SequencePlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn update_loop(shared: &Shared, period: Duration) {
    let mut previous = Instant::now();
    let mut next_tick = previous + period;
    while shared.running.load(Ordering::SeqCst) {
        let now = Instant::now();
        let dt = now.duration_since(previous).as_secs_f64();
        previous = now;
        lock(&shared.state).step(dt);
        // Checked again after the critical section so shutdown waits at
        // most one tick.
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
            next_tick += period;
        } else {
            // Fell behind; resume the cadence from here instead of
            // bursting to catch up.
            next_tick = now + period;
        }
    }
}
