//! Multi-section playback controller.
//!
//! Drives one media element through an ordered list of clips: play/pause,
//! seek, skip, volume, manual prev/next, and auto-advance when a clip ends.
//!
//! The controller owns all playback state.  The element only reports what
//! happened through [`MediaEvent`]s; every event is tagged with the
//! [`SlotKey`] of the load it belongs to, so late or repeated events from a
//! clip that is no longer current are ignored.
//!
//! Per-slot lifecycle:
//!
//! ```text
//! Idle → Loading → Ready → Playing ⇄ Paused → Ended
//!                                              │
//!                   Loading (next slot) ◄──────┘  (or stop on the last slot)
//! ```
//!
//! Switching index from any state reloads, i.e. goes back to `Loading`.
//! There is no error state: a clip that fails to start drops to `Paused`
//! (or `Idle` if nothing was loaded yet) and the failure is logged.

use crate::{
    error::{PlaybackFailure, PlayerError},
    sectionize::Section,
    synth::AudioResource,
};

// ─────────────────────────────────────────────────────────────────────────────
// Media element seam
// ─────────────────────────────────────────────────────────────────────────────

/// The audio output the controller drives (an HTML `<audio>` element, a
/// native sink, a test double...).
pub trait MediaElement {
    /// Point the element at a new clip.  Stops whatever was playing.
    fn load(&mut self, resource: &AudioResource);

    /// Start or resume playback.  May be refused (autoplay policy, decode
    /// error); the controller treats that as recoverable.
    fn play(&mut self) -> Result<(), PlaybackFailure>;

    fn pause(&mut self);

    /// Move the playhead to `seconds` from the start of the clip.
    fn seek_to(&mut self, seconds: f64);

    /// `volume` is already clamped to `[0, 1]`.
    fn set_volume(&mut self, volume: f64);
}

/// Something the element reports about the clip it is playing.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Enough of the clip is known to report its length.
    MetadataLoaded { duration: f64 },
    DurationChanged(f64),
    TimeUpdate(f64),
    Playing,
    Paused,
    /// The clip played to its natural end.
    Ended,
    /// Playback failed after it had started.
    Failed(String),
}

/// Identifies one load of one slot.  Reloading the same index yields a new key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub index: usize,
    load_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Ended,
}

/// Snapshot of what the controller reports to a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    /// `None` when no audio is loaded.
    pub current_index: Option<usize>,
    pub is_playing: bool,
    pub current_time: f64,
    /// `NaN` until the element reports it.
    pub duration: f64,
    pub volume: f64,
}

/// What a download/export of the current clip should be called.
#[derive(Debug, Clone, PartialEq)]
pub struct Export<'a> {
    pub file_name: String,
    /// Content type to serve or save the clip with.
    pub mime_type: &'static str,
    pub resource: &'a AudioResource,
}

// ─────────────────────────────────────────────────────────────────────────────
// Presentation helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `m:ss`; non-finite or negative input shows as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// A reported length the controller can use; anything else means unknown.
fn known_duration(duration: f64) -> f64 {
    if duration.is_finite() && duration >= 0.0 {
        duration
    } else {
        f64::NAN
    }
}

/// Download name for slot `index` of `len`: numbered (1-based) when there is
/// more than one clip, generic otherwise.
pub fn export_file_name(index: usize, len: usize, extension: &str) -> String {
    if len > 1 {
        format!("story_part_{}.{}", index + 1, extension)
    } else {
        format!("story_audio.{}", extension)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PlaybackController
// ─────────────────────────────────────────────────────────────────────────────

pub struct PlaybackController<M: MediaElement> {
    media: M,
    resources: Vec<AudioResource>,
    texts: Vec<Section>,
    index: usize,
    load_id: u64,
    slot: SlotState,
    is_playing: bool,
    current_time: f64,
    duration: f64,
    volume: f64,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(media: M) -> Self {
        Self::with_volume(media, 1.0)
    }

    pub fn with_volume(mut media: M, volume: f64) -> Self {
        let volume = if volume.is_nan() { 1.0 } else { volume.clamp(0.0, 1.0) };
        media.set_volume(volume);
        Self {
            media,
            resources: Vec::new(),
            texts: Vec::new(),
            index: 0,
            load_id: 0,
            slot: SlotState::Idle,
            is_playing: false,
            current_time: 0.0,
            duration: f64::NAN,
            volume,
        }
    }

    // ── Playlist ──────────────────────────────────────────────────────────────

    /// Replace the playlist wholesale and point at its first clip.
    ///
    /// `texts` is the optional parallel list of section texts; it may be
    /// shorter than `resources` (or empty), in which case no text is shown
    /// for the uncovered slots.
    pub fn load(&mut self, resources: Vec<AudioResource>, texts: Vec<Section>) {
        self.media.pause();
        self.resources = resources;
        self.texts = texts;
        self.index = 0;
        self.is_playing = false;
        if self.resources.is_empty() {
            self.load_id += 1;
            self.slot = SlotState::Idle;
            self.current_time = 0.0;
            self.duration = f64::NAN;
            return;
        }
        tracing::debug!(len = self.resources.len(), "playlist loaded");
        self.load_current();
    }

    /// Drop the playlist.
    pub fn unload(&mut self) {
        self.load(Vec::new(), Vec::new());
    }

    fn load_current(&mut self) {
        self.load_id += 1;
        self.slot = SlotState::Loading;
        self.is_playing = false;
        self.current_time = 0.0;
        self.duration = f64::NAN;
        self.media.load(&self.resources[self.index]);
        self.media.set_volume(self.volume);
    }

    /// Ask the element to play; a refusal leaves us stopped, never errors.
    fn start(&mut self) {
        match self.media.play() {
            Ok(()) => {
                self.is_playing = true;
                self.slot = SlotState::Playing;
            }
            Err(e) => {
                tracing::warn!(index = self.index, error = %e, "playback did not start");
                self.is_playing = false;
                self.slot = if self.duration.is_finite() { SlotState::Paused } else { SlotState::Idle };
            }
        }
    }

    fn switch_to(&mut self, index: usize) {
        let resume = self.is_playing;
        tracing::debug!(from = self.index, to = index, resume, "switching section");
        self.index = index;
        self.load_current();
        if resume {
            self.start();
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Navigation and auto-advance only exist with more than one clip.
    pub fn is_multi_section(&self) -> bool {
        self.resources.len() > 1
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.is_empty()).then_some(self.index)
    }

    pub fn current_slot(&self) -> Option<SlotKey> {
        (!self.is_empty()).then_some(SlotKey { index: self.index, load_id: self.load_id })
    }

    pub fn slot_state(&self) -> SlotState {
        self.slot
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            current_index: self.current_index(),
            is_playing: self.is_playing,
            current_time: self.current_time,
            duration: self.duration,
            volume: self.volume,
        }
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    /// Direct access to the element, e.g. to wire its event callbacks.
    pub fn media_mut(&mut self) -> &mut M {
        &mut self.media
    }

    pub fn current_resource(&self) -> Option<&AudioResource> {
        self.resources.get(self.index)
    }

    /// Text of the current section, if a parallel text list covers it.
    pub fn current_text(&self) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        self.texts.get(self.index).map(Section::as_str)
    }

    /// `Section i of n`, only in multi-section mode.
    pub fn section_label(&self) -> Option<String> {
        self.is_multi_section()
            .then(|| format!("Section {} of {}", self.index + 1, self.resources.len()))
    }

    pub fn can_go_previous(&self) -> bool {
        self.is_multi_section() && self.index > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.is_multi_section() && self.index + 1 < self.resources.len()
    }

    /// Played fraction of the current clip in `[0, 1]`; `0` while the
    /// duration is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration.is_finite() && self.duration > 0.0 && self.current_time.is_finite() {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// `m:ss / m:ss`.
    pub fn time_display(&self) -> String {
        format!("{} / {}", format_time(self.current_time), format_time(self.duration))
    }

    /// File name and handle for saving the current clip.
    pub fn export(&self) -> Option<Export<'_>> {
        let resource = self.current_resource()?;
        Some(Export {
            file_name: export_file_name(self.index, self.resources.len(), resource.format.extension()),
            mime_type: resource.format.mime_type(),
            resource,
        })
    }

    // ── Transport ─────────────────────────────────────────────────────────────

    pub fn play(&mut self) {
        if self.is_empty() {
            tracing::debug!("play ignored: nothing loaded");
            return;
        }
        if self.slot == SlotState::Ended {
            // Replay from the top of the finished clip.
            self.media.seek_to(0.0);
            self.current_time = 0.0;
        }
        self.start();
    }

    pub fn pause(&mut self) {
        if self.is_empty() {
            return;
        }
        self.media.pause();
        self.is_playing = false;
        if self.slot == SlotState::Playing {
            self.slot = SlotState::Paused;
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Jump to `fraction` of the current clip; clamped to `[0, 1]`.
    /// Ignored while the duration is unknown.
    pub fn seek(&mut self, fraction: f64) {
        if self.is_empty() || !self.duration.is_finite() {
            return;
        }
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.seek_seconds(fraction * self.duration);
    }

    /// Move the playhead by `delta_seconds`, clamped to `[0, duration]`.
    pub fn skip(&mut self, delta_seconds: f64) {
        if self.is_empty() || delta_seconds.is_nan() {
            return;
        }
        let from = if self.current_time.is_finite() { self.current_time } else { 0.0 };
        let upper = if self.duration.is_finite() { self.duration.max(0.0) } else { f64::INFINITY };
        let target = (from + delta_seconds).clamp(0.0, upper);
        if target.is_finite() {
            self.seek_seconds(target);
        }
    }

    fn seek_seconds(&mut self, seconds: f64) {
        self.media.seek_to(seconds);
        self.current_time = seconds;
        if self.slot == SlotState::Ended && seconds < self.duration {
            self.slot = SlotState::Paused;
        }
    }

    /// Set the volume (clamped to `[0, 1]`).  Kept across clip changes.
    pub fn set_volume(&mut self, volume: f64) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.media.set_volume(self.volume);
    }

    // ── Navigation ────────────────────────────────────────────────────────────

    /// Re-point playback at slot `index`.  Playback continues on the new
    /// clip only if it was already playing.
    pub fn set_current_index(&mut self, index: usize) -> Result<(), PlayerError> {
        if self.is_empty() {
            return Err(PlayerError::Empty);
        }
        if index >= self.resources.len() {
            return Err(PlayerError::IndexOutOfRange { index, len: self.resources.len() });
        }
        self.switch_to(index);
        Ok(())
    }

    /// Go to the next clip.  Returns `false` (and does nothing) on the last one.
    pub fn next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.switch_to(self.index + 1);
        true
    }

    /// Go to the previous clip.  Returns `false` (and does nothing) on the first one.
    pub fn previous(&mut self) -> bool {
        if !self.can_go_previous() {
            return false;
        }
        self.switch_to(self.index - 1);
        true
    }

    // ── Element events ────────────────────────────────────────────────────────

    /// Apply an event reported by the element for the load `key`.
    ///
    /// Returns `false` if the event was ignored (stale key, or a repeated
    /// `Ended`).
    pub fn handle_event(&mut self, key: SlotKey, event: MediaEvent) -> bool {
        if self.current_slot() != Some(key) {
            tracing::trace!(?key, ?event, "stale media event ignored");
            return false;
        }

        match event {
            MediaEvent::MetadataLoaded { duration } => {
                self.duration = known_duration(duration);
                if self.slot == SlotState::Loading {
                    self.slot = SlotState::Ready;
                }
            }
            MediaEvent::DurationChanged(duration) => self.duration = known_duration(duration),
            MediaEvent::TimeUpdate(time) => self.current_time = time,
            MediaEvent::Playing => {
                self.is_playing = true;
                self.slot = SlotState::Playing;
            }
            MediaEvent::Paused => {
                if self.slot == SlotState::Ended {
                    return false;
                }
                self.is_playing = false;
                if self.slot == SlotState::Playing {
                    self.slot = SlotState::Paused;
                }
            }
            MediaEvent::Ended => {
                if self.slot == SlotState::Ended {
                    return false;
                }
                self.on_ended();
            }
            MediaEvent::Failed(message) => {
                tracing::warn!(index = self.index, error = %message, "playback failed");
                self.is_playing = false;
                self.slot = if self.duration.is_finite() { SlotState::Paused } else { SlotState::Idle };
            }
        }
        true
    }

    fn on_ended(&mut self) {
        self.slot = SlotState::Ended;
        if self.duration.is_finite() {
            self.current_time = self.duration;
        }
        if self.index + 1 < self.resources.len() {
            self.index += 1;
            tracing::debug!(index = self.index, "auto-advancing");
            self.load_current();
            self.start();
        } else {
            tracing::debug!(index = self.index, "reached the last section");
            self.is_playing = false;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
