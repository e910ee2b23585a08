//! The playback sequencer.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use rand::Rng;

use crate::audio::{peak_waveform, Decoder, WAVEFORM_BUCKETS};
use crate::library::Entry;
use crate::playback::{LoadedSource, PlaybackState};
use crate::session::Session;

/// Delay before auto-skipping past a track that failed to play.
pub const SKIP_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// File could not be opened or read.
    Access(String),
    /// Bytes were read but could not be decoded.
    Decode(String),
    /// A newer play attempt superseded this one. Benign.
    Stale,
}

impl fmt::Display for PlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayError::Access(e) => write!(f, "{}", e),
            PlayError::Decode(e) => write!(f, "{}", e),
            PlayError::Stale => write!(f, "superseded by a newer play request"),
        }
    }
}

pub struct Sequencer {
    session: Arc<Session>,
    /// Waveform decoding is optional; without a decoder playback still works,
    /// there is just no waveform.
    decoder: Option<Arc<dyn Decoder>>,
    generation: AtomicU64,
    state: Mutex<PlaybackState>,
    source: Mutex<Option<LoadedSource>>,
    initial_loaded: AtomicBool,
    skip_delay: Duration,
}

impl Sequencer {
    pub fn new(session: Arc<Session>, decoder: Option<Arc<dyn Decoder>>) -> Arc<Self> {
        Arc::new(Self {
            session,
            decoder,
            generation: AtomicU64::new(0),
            state: Mutex::new(PlaybackState::default()),
            source: Mutex::new(None),
            initial_loaded: AtomicBool::new(false),
            skip_delay: SKIP_DELAY,
        })
    }

    #[cfg(test)]
    fn with_skip_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        let mut this = Arc::try_unwrap(self).unwrap_or_else(|_| panic!("sequencer shared"));
        this.skip_delay = delay;
        Arc::new(this)
    }

    pub fn state(&self) -> PlaybackState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_looping(&self, looping: bool) {
        self.state.lock().unwrap().is_looping = looping;
    }

    pub fn set_shuffle(&self, shuffle: bool) {
        self.state.lock().unwrap().shuffle = shuffle;
    }

    pub fn set_hue_cycling(&self, enabled: bool) {
        self.state.lock().unwrap().hue_cycling = enabled;
    }

    pub fn toggle_playing(&self) {
        let mut state = self.state.lock().unwrap();
        if state.active_id.is_some() {
            state.is_playing = !state.is_playing;
        }
    }

    /// Load `entry` and commit it as the active track. Stamped with a fresh
    /// generation; if a newer play starts while this one is loading, this
    /// one abandons without touching the committed state.
    pub async fn play(&self, entry: &Arc<Entry>, auto_start: bool) -> Result<(), PlayError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Release the previous source before the next one exists
        drop(self.source.lock().unwrap().take());

        {
            let mut state = self.state.lock().unwrap();
            if state.hue_cycling {
                let mut rng = rand::thread_rng();
                state.gradient_hues = (rng.gen_range(0.0..360.0), rng.gen_range(0.0..360.0));
            }
        }

        let handle = entry
            .file_handle()
            .ok_or_else(|| PlayError::Access(format!("Not a file: {}", entry.id)))?
            .clone();
        let bytes = tokio::task::spawn_blocking(move || handle.read())
            .await
            .map_err(|e| {
                self.stale_or(generation, PlayError::Access(format!("Read task failed: {}", e)))
            })?
            .map_err(|e| self.stale_or(generation, PlayError::Access(e)))?;

        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(PlayError::Stale);
        }

        let bytes = Arc::new(bytes);
        *self.source.lock().unwrap() = Some(LoadedSource {
            entry_id: entry.id.clone(),
            bytes: bytes.clone(),
        });

        let waveform = match &self.decoder {
            Some(decoder) => {
                let decoder = decoder.clone();
                let name = entry.name.clone();
                let decoded = tokio::task::spawn_blocking(move || decoder.decode(&bytes, &name))
                    .await
                    .map_err(|e| {
                        let err = PlayError::Decode(format!("Decode task failed: {}", e));
                        self.stale_or(generation, err)
                    })?
                    .map_err(|e| self.stale_or(generation, PlayError::Decode(e)))?;

                if self.generation.load(Ordering::SeqCst) != generation {
                    return Err(PlayError::Stale);
                }
                Some(peak_waveform(&decoded.channel0, WAVEFORM_BUCKETS))
            }
            None => None,
        };

        let mut state = self.state.lock().unwrap();
        state.active_id = Some(entry.id.clone());
        if auto_start {
            state.is_playing = true;
        }
        state.waveform = waveform;
        log::debug!("Now active: {} (playing: {})", entry.id, state.is_playing);
        Ok(())
    }

    /// Play with failure recovery: access and decode failures surface a
    /// notice, and a failed play request (not a paused preview) auto-skips
    /// to the next track after a short delay. Stale results are silent.
    pub fn play_with_recovery(
        self: &Arc<Self>,
        entry: Arc<Entry>,
        auto_start: bool,
    ) -> BoxFuture<'static, ()> {
        let this = self.clone();
        async move {
            match this.play(&entry, auto_start).await {
                Ok(()) | Err(PlayError::Stale) => {}
                Err(e) => {
                    this.session
                        .push_notice(format!("Could not play {}: {}", entry.name, e));
                    if !auto_start {
                        return;
                    }
                    let generation = this.generation.load(Ordering::SeqCst);
                    tokio::time::sleep(this.skip_delay).await;
                    // A user action during the delay obsoletes the skip
                    if this.generation.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    if let Some(next) = this.next_entry(Some(&entry.id)) {
                        this.play_with_recovery(next, true).await;
                    }
                }
            }
        }
        .boxed()
    }

    /// Move to the next track in the filtered list. `force` marks a manual
    /// skip, which preserves the current play/pause state; a natural
    /// end-of-track advance always starts playback, and honors looping.
    pub async fn advance(self: &Arc<Self>, force: bool) {
        let (active_id, is_playing, is_looping) = {
            let state = self.state.lock().unwrap();
            (state.active_id.clone(), state.is_playing, state.is_looping)
        };

        if !force && is_looping {
            if let Some(entry) = active_id.as_deref().and_then(|id| self.session.find_entry(id)) {
                self.play_with_recovery(entry, true).await;
                return;
            }
        }

        let Some(next) = self.next_entry(active_id.as_deref()) else {
            return;
        };
        let auto_start = if force { is_playing } else { true };
        self.play_with_recovery(next, auto_start).await;
    }

    /// Move to the previous track. Deterministic (shuffle does not apply)
    /// and never force-plays.
    pub async fn retreat(self: &Arc<Self>) {
        let (active_id, is_playing) = {
            let state = self.state.lock().unwrap();
            (state.active_id.clone(), state.is_playing)
        };

        let files = self.session.filtered_files();
        if files.is_empty() {
            return;
        }
        let index = active_id
            .as_deref()
            .and_then(|id| files.iter().position(|f| f.id == id))
            .map(|i| i as i64)
            .unwrap_or(-1);
        let previous = (index - 1).rem_euclid(files.len() as i64) as usize;
        self.play_with_recovery(files[previous].clone(), is_playing)
            .await;
    }

    /// Load the first entry of the filtered list in paused state. Happens at
    /// most once per session, and only once filtering yields a non-empty
    /// list.
    pub async fn ensure_initial_load(self: &Arc<Self>) {
        if self.initial_loaded.load(Ordering::SeqCst) {
            return;
        }
        let files = self.session.filtered_files();
        let Some(first) = files.first() else {
            return;
        };
        if self
            .initial_loaded
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.play_with_recovery(first.clone(), false).await;
    }

    /// A failure observed after a suspension point is only a real failure if
    /// this attempt still holds the current generation; otherwise a newer
    /// play owns the state and this one abandons silently.
    fn stale_or(&self, generation: u64, err: PlayError) -> PlayError {
        if self.generation.load(Ordering::SeqCst) != generation {
            PlayError::Stale
        } else {
            err
        }
    }

    /// The entry after `from_id` in the filtered list: uniformly random when
    /// shuffle is on, else the next index with wrap-around. An unknown or
    /// absent id behaves as index -1, so the successor is the first entry.
    fn next_entry(&self, from_id: Option<&str>) -> Option<Arc<Entry>> {
        let files = self.session.filtered_files();
        if files.is_empty() {
            return None;
        }
        let shuffle = self.state.lock().unwrap().shuffle;
        let next = if shuffle {
            rand::thread_rng().gen_range(0..files.len())
        } else {
            let index = from_id
                .and_then(|id| files.iter().position(|f| f.id == id))
                .map(|i| i as i64)
                .unwrap_or(-1);
            (index + 1).rem_euclid(files.len() as i64) as usize
        };
        Some(files[next].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::scan;
    use crate::session::Session;
    use crate::store::MemoryStore;
    use crate::test_fixtures::{mem_dir, mem_file_bytes, ScriptedDecoder};

    fn session_with_three() -> Arc<Session> {
        let session = Session::new(Arc::new(MemoryStore::new()));
        session.install_snapshot(scan(mem_dir(
            "samples",
            vec![
                mem_file_bytes("a.wav", b"aa".to_vec(), 1),
                mem_file_bytes("b.wav", b"bb".to_vec(), 2),
                mem_file_bytes("c.wav", b"cc".to_vec(), 3),
            ],
        )));
        session
    }

    fn quick_decoder() -> Option<Arc<dyn Decoder>> {
        Some(Arc::new(ScriptedDecoder::new(vec![0.5; 1600], 1.0)))
    }

    fn active_id(seq: &Sequencer) -> Option<String> {
        seq.state().active_id
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_play_commits_active_and_waveform() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        let entry = session.find_entry("root/b.wav").unwrap();
        seq.play(&entry, true).await.unwrap();

        let state = seq.state();
        assert_eq!(state.active_id.as_deref(), Some("root/b.wav"));
        assert!(state.is_playing);
        assert_eq!(state.waveform.unwrap().len(), WAVEFORM_BUCKETS);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_newer_play_supersedes_slow_one() {
        let session = session_with_three();
        // Distinguishable payloads: a decodes to 0.9 peaks, b to 0.2
        let decoder = ScriptedDecoder::new(vec![0.2; 800], 1.0)
            .payload_for("a.wav", vec![0.9; 800])
            .slow(&["a.wav"], Duration::from_millis(300));
        let seq = Sequencer::new(session.clone(), Some(Arc::new(decoder)));

        let a = session.find_entry("root/a.wav").unwrap();
        let b = session.find_entry("root/b.wav").unwrap();

        let slow = {
            let seq = seq.clone();
            tokio::spawn(async move { seq.play(&a, true).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        seq.play(&b, true).await.unwrap();

        assert_eq!(slow.await.unwrap(), Err(PlayError::Stale));
        assert_eq!(active_id(&seq).as_deref(), Some("root/b.wav"));

        // Only b's waveform may ever land
        let waveform = seq.state().waveform.unwrap();
        assert!(waveform.iter().all(|v| (*v - 0.2).abs() < 1e-6));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_superseded_failure_is_silent_and_keeps_committed_track() {
        let session = session_with_three();
        // b's decode is slow and then fails; a play of another track lands
        // in the meantime and must not be disturbed
        let decoder = ScriptedDecoder::new(vec![0.5; 100], 1.0)
            .slow(&["b.wav"], Duration::from_millis(300))
            .failing(&["b.wav"]);
        let seq = Sequencer::new(session.clone(), Some(Arc::new(decoder)))
            .with_skip_delay(Duration::from_millis(20));

        let b = session.find_entry("root/b.wav").unwrap();
        let doomed = {
            let seq = seq.clone();
            tokio::spawn(async move { seq.play_with_recovery(b, true).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let a = session.find_entry("root/a.wav").unwrap();
        seq.play(&a, true).await.unwrap();
        doomed.await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        // No notice, no auto-skip: the superseded failure abandons silently
        assert_eq!(active_id(&seq).as_deref(), Some("root/a.wav"));
        assert!(session.active_notices().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_advance_steps_and_wraps() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        let middle = session.find_entry("root/b.wav").unwrap();
        seq.play(&middle, true).await.unwrap();

        seq.advance(false).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/c.wav"));

        seq.advance(false).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/a.wav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_manual_skip_preserves_paused_state() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        let first = session.find_entry("root/a.wav").unwrap();
        seq.play(&first, false).await.unwrap();
        assert!(!seq.state().is_playing);

        seq.advance(true).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/b.wav"));
        assert!(!seq.state().is_playing);

        // Natural end-of-track always starts playback
        seq.advance(false).await;
        assert!(seq.state().is_playing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_retreat_wraps_and_never_force_plays() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        let first = session.find_entry("root/a.wav").unwrap();
        seq.play(&first, false).await.unwrap();

        seq.retreat().await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/c.wav"));
        assert!(!seq.state().is_playing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_loop_replays_current_on_natural_end() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());
        seq.set_looping(true);

        let entry = session.find_entry("root/b.wav").unwrap();
        seq.play(&entry, true).await.unwrap();

        seq.advance(false).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/b.wav"));

        // A manual skip still moves on
        seq.advance(true).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/c.wav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_play_request_notices_and_auto_skips() {
        let session = session_with_three();
        let decoder = ScriptedDecoder::new(vec![0.5; 100], 1.0).failing(&["b.wav"]);
        let seq = Sequencer::new(session.clone(), Some(Arc::new(decoder)))
            .with_skip_delay(Duration::from_millis(20));

        let bad = session.find_entry("root/b.wav").unwrap();
        seq.play_with_recovery(bad, true).await;

        assert!(!session.active_notices().is_empty());
        assert_eq!(active_id(&seq).as_deref(), Some("root/c.wav"));
        assert!(seq.state().is_playing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_preview_does_not_auto_skip() {
        let session = session_with_three();
        let decoder = ScriptedDecoder::new(vec![0.5; 100], 1.0).failing(&["b.wav"]);
        let seq = Sequencer::new(session.clone(), Some(Arc::new(decoder)))
            .with_skip_delay(Duration::from_millis(20));

        let bad = session.find_entry("root/b.wav").unwrap();
        seq.play_with_recovery(bad, false).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!session.active_notices().is_empty());
        assert_eq!(active_id(&seq), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initial_load_happens_once_and_paused() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        seq.ensure_initial_load().await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/a.wav"));
        assert!(!seq.state().is_playing);

        // Move away, then make sure the initial load does not fire again
        seq.advance(true).await;
        seq.ensure_initial_load().await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/b.wav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_initial_load_waits_for_nonempty_list() {
        let session = Session::new(Arc::new(MemoryStore::new()));
        session.install_snapshot(scan(mem_dir("empty", vec![])));
        let seq = Sequencer::new(session.clone(), quick_decoder());

        seq.ensure_initial_load().await;
        assert_eq!(active_id(&seq), None);

        // Files appear later; the one-shot is still available
        session.install_snapshot(scan(mem_dir(
            "samples",
            vec![mem_file_bytes("a.wav", b"aa".to_vec(), 1)],
        )));
        seq.ensure_initial_load().await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/a.wav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_advance_without_active_starts_at_first() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());

        seq.advance(false).await;
        assert_eq!(active_id(&seq).as_deref(), Some("root/a.wav"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_hue_cycling_randomizes_on_play() {
        let session = session_with_three();
        let seq = Sequencer::new(session.clone(), quick_decoder());
        seq.set_hue_cycling(true);

        let entry = session.find_entry("root/a.wav").unwrap();
        seq.play(&entry, true).await.unwrap();
        let hues = seq.state().gradient_hues;
        assert!(hues.0 >= 0.0 && hues.0 < 360.0);
    }
}
