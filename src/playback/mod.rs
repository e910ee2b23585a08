//! Playback sequencing
//!
//! The sequencer is a small state machine over [`PlaybackState`]. Every play
//! attempt is stamped with a generation token; only the attempt holding the
//! current generation may commit its results, which makes overlapping loads
//! safe without explicit cancellation.

mod sequencer;

pub use sequencer::Sequencer;

use std::sync::Arc;

/// Mutable playback state, owned by the sequencer behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    /// Id of the entry whose source is loaded, if any.
    pub active_id: Option<String>,
    pub is_playing: bool,
    pub is_looping: bool,
    pub shuffle: bool,
    /// Randomize gradient hues on each track change.
    pub hue_cycling: bool,
    pub gradient_hues: (f32, f32),
    /// Coarse peak waveform of the active entry.
    pub waveform: Option<Vec<f32>>,
}

/// The transient decoded-source resource. Strictly one owner at a time: the
/// sequencer drops the previous one before creating the next.
pub struct LoadedSource {
    pub entry_id: String,
    pub bytes: Arc<Vec<u8>>,
}
