//! One "generate" action from raw text to a loaded playlist.
//!
//! A [`Session`] owns the speech provider, the playback controller and a
//! single error slot.  Two ways in:
//!
//! - [`Session::generate`] sections the whole text, generates every section
//!   in order and replaces the playlist in one step.
//! - Book mode: [`Session::prepare`] sections without generating, then
//!   [`Session::speak_section`] generates and plays one section at a time.
//!
//! Any failure lands in the error slot (the last one wins) and leaves the
//! current playlist alone.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use crate::{
    batch::generate_batch,
    config::{Config, DEFAULT_SKIP_SECONDS},
    error::{PlayerError, SessionError},
    player::{Export, MediaElement, PlaybackController},
    sectionize::{sectionize, Section, SectionList, MAX_CHARS},
    synth::{SpeechSynthesizer, VoiceParams},
};

// ─────────────────────────────────────────────────────────────────────────────
// Generation status
// ─────────────────────────────────────────────────────────────────────────────

/// Progress of the running batch, readable from another task while
/// [`Session::generate`] is being awaited.
#[derive(Debug, Default)]
pub struct GenerationStatus {
    running: AtomicBool,
    current: AtomicUsize,
    total: AtomicUsize,
}

impl GenerationStatus {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// `(index, total)` of the section being generated, while running.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.is_running()
            .then(|| (self.current.load(Ordering::Acquire), self.total.load(Ordering::Acquire)))
    }

    fn begin(&self, total: usize) {
        self.current.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
        self.running.store(true, Ordering::Release);
    }

    fn advance(&self, index: usize) {
        self.current.store(index, Ordering::Release);
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

pub struct Session<S, M: MediaElement> {
    synth: S,
    params: VoiceParams,
    max_chars: usize,
    skip_seconds: f64,
    player: PlaybackController<M>,
    /// Sections behind the current playlist, or the book-mode section list.
    sections: SectionList,
    /// Index into `sections` when the playlist holds a single book-mode clip.
    book_section: Option<usize>,
    last_error: Option<String>,
    status: Arc<GenerationStatus>,
}

impl<S: SpeechSynthesizer, M: MediaElement> Session<S, M> {
    pub fn new(synth: S, media: M) -> Self {
        Self {
            synth,
            params: VoiceParams::default(),
            max_chars: MAX_CHARS,
            skip_seconds: DEFAULT_SKIP_SECONDS,
            player: PlaybackController::new(media),
            sections: Vec::new(),
            book_section: None,
            last_error: None,
            status: Arc::default(),
        }
    }

    pub fn from_config(config: &Config, synth: S, media: M) -> Self {
        let mut session = Self::new(synth, media);
        session.params = config.voice_params();
        session.set_max_chars(config.max_chars);
        session.skip_seconds = config.skip_seconds;
        session.player.set_volume(config.volume);
        session
    }

    // ── Settings ──────────────────────────────────────────────────────────────

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub fn set_params(&mut self, params: VoiceParams) {
        self.params = params;
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn set_max_chars(&mut self, max_chars: usize) {
        self.max_chars = max_chars.max(1);
    }

    // ── Error slot ────────────────────────────────────────────────────────────

    /// The message of the most recent failure, if not yet cleared.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn record<T>(&mut self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            tracing::error!(error = %e, "session action failed");
            self.last_error = Some(e.to_string());
        }
        result
    }

    // ── Status ────────────────────────────────────────────────────────────────

    pub fn is_generating(&self) -> bool {
        self.status.is_running()
    }

    /// Shared handle for polling progress from elsewhere.
    pub fn status(&self) -> Arc<GenerationStatus> {
        Arc::clone(&self.status)
    }

    // ── Generation ────────────────────────────────────────────────────────────

    /// Section `text`, generate audio for every section and load the result
    /// as the new playlist.  Returns the number of sections.
    pub async fn generate(&mut self, text: &str) -> Result<usize, SessionError> {
        self.clear_error();
        let result = self.run_batch(text).await;
        self.record(result)
    }

    async fn run_batch(&mut self, text: &str) -> Result<usize, SessionError> {
        self.synth.ready()?;
        let sections = sectionize(text, self.max_chars)?;
        let total = sections.len();
        tracing::info!(total, max_chars = self.max_chars, "generating audio");

        let status = Arc::clone(&self.status);
        status.begin(total);
        let batch = generate_batch(&self.synth, &sections, &self.params, |index, _| {
            status.advance(index)
        })
        .await;
        status.finish();

        let resources = batch?;
        self.player.load(resources, sections.clone());
        self.sections = sections;
        self.book_section = None;
        Ok(total)
    }

    /// Book mode: section `text` without generating anything.  Replaces the
    /// prepared list; the playlist is left as it is.
    pub fn prepare(&mut self, text: &str) -> Result<&[Section], SessionError> {
        self.clear_error();
        let result = sectionize(text, self.max_chars).map_err(SessionError::from);
        let sections = self.record(result)?;
        tracing::debug!(total = sections.len(), "sections prepared");
        self.sections = sections;
        Ok(&self.sections)
    }

    /// The prepared (or last generated) sections.
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Book mode: generate only section `index` and load it as a
    /// one-clip playlist.
    pub async fn speak_section(&mut self, index: usize) -> Result<(), SessionError> {
        self.clear_error();
        let result = self.speak_one(index).await;
        self.record(result)
    }

    async fn speak_one(&mut self, index: usize) -> Result<(), SessionError> {
        let section = match self.sections.get(index) {
            Some(section) => section.clone(),
            None if self.sections.is_empty() => return Err(PlayerError::Empty.into()),
            None => {
                return Err(PlayerError::IndexOutOfRange { index, len: self.sections.len() }.into())
            }
        };
        self.synth.ready()?;

        self.status.begin(1);
        let result = self.synth.synthesize(section.as_str(), index, &self.params).await;
        self.status.finish();

        let resource = result?;
        tracing::info!(index, "section ready");
        self.player.load(vec![resource], vec![section]);
        self.book_section = Some(index);
        Ok(())
    }

    // ── Playback ──────────────────────────────────────────────────────────────

    pub fn controller(&self) -> &PlaybackController<M> {
        &self.player
    }

    pub fn controller_mut(&mut self) -> &mut PlaybackController<M> {
        &mut self.player
    }

    pub fn skip_back(&mut self) {
        self.player.skip(-self.skip_seconds);
    }

    pub fn skip_forward(&mut self) {
        self.player.skip(self.skip_seconds);
    }

    /// File name and handle for saving the current clip.  A book-mode clip
    /// is named after its position in the prepared list.
    pub fn export(&self) -> Option<Export<'_>> {
        let mut export = self.player.export()?;
        if let Some(index) = self.book_section {
            export.file_name =
                format!("section_{}.{}", index + 1, export.resource.format.extension());
        }
        Some(export)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{PlaybackFailure, SectionizeError, SynthesisError},
        player::SlotState,
        synth::{AudioFormat, AudioResource},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NullMedia {
        loaded: Vec<String>,
    }

    impl MediaElement for NullMedia {
        fn load(&mut self, resource: &AudioResource) {
            self.loaded.push(resource.location.clone());
        }
        fn play(&mut self) -> Result<(), PlaybackFailure> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn seek_to(&mut self, _seconds: f64) {}
        fn set_volume(&mut self, _volume: f64) {}
    }

    /// Fails every request whose text contains `fail_on`; can also pretend
    /// to have no credentials.
    #[derive(Default)]
    struct FakeSynth {
        fail_on: Option<&'static str>,
        no_key: bool,
        requests: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        fn ready(&self) -> Result<(), SynthesisError> {
            if self.no_key {
                return Err(SynthesisError::MissingCredentials);
            }
            Ok(())
        }

        async fn synthesize(
            &self,
            text: &str,
            index: usize,
            params: &VoiceParams,
        ) -> Result<AudioResource, SynthesisError> {
            self.requests.lock().unwrap().push(text.to_string());
            if self.fail_on.is_some_and(|f| text.contains(f)) {
                return Err(SynthesisError::Provider("Rate limit reached".into()));
            }
            Ok(AudioResource::at(format!("gen-{index}"), params.format))
        }
    }

    fn session(synth: FakeSynth) -> Session<FakeSynth, NullMedia> {
        let mut s = Session::new(synth, NullMedia::default());
        s.set_max_chars(12);
        s
    }

    const STORY: &str = "Once upon.\n\nA time.\n\nThe end.";

    #[tokio::test]
    async fn test_generate_loads_parallel_playlist() {
        let mut s = session(FakeSynth::default());
        assert_eq!(s.generate(STORY).await.unwrap(), 3);

        let c = s.controller();
        assert_eq!(c.len(), 3);
        assert_eq!(c.current_index(), Some(0));
        assert_eq!(c.current_text(), Some("Once upon."));
        assert_eq!(c.slot_state(), SlotState::Loading);
        assert_eq!(s.sections().len(), 3);
        assert!(s.error().is_none());
        assert!(!s.is_generating());
        assert_eq!(s.export().unwrap().file_name, "story_part_1.mp3");
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_playlist() {
        let mut s = session(FakeSynth { fail_on: Some("second"), ..FakeSynth::default() });
        s.generate(STORY).await.unwrap();
        s.controller_mut().next();

        let err = s.generate("First.\n\nThe second.").await.unwrap_err();
        assert!(matches!(err, SessionError::Batch(_)));
        assert_eq!(
            s.error(),
            Some("Generation stopped at section 2 of 2: Rate limit reached")
        );
        assert_eq!(s.controller().len(), 3);
        assert_eq!(s.controller().current_index(), Some(1));
        assert_eq!(s.sections()[0], "Once upon.");
        assert!(!s.is_generating());
    }

    #[tokio::test]
    async fn test_empty_text_and_last_error_wins() {
        let mut s = session(FakeSynth::default());
        assert_eq!(
            s.generate("  \n\n ").await.unwrap_err(),
            SessionError::Sectionize(SectionizeError::EmptyInput)
        );
        assert_eq!(s.error(), Some("Please enter some text"));

        s.set_params(VoiceParams { voice: "nova".into(), ..VoiceParams::default() });
        s.generate(STORY).await.unwrap();
        assert!(s.error().is_none());

        s.prepare("").unwrap_err();
        assert_eq!(s.error(), Some("Please enter some text"));
        s.clear_error();
        assert!(s.error().is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_checked_before_sectioning() {
        let synth = FakeSynth { no_key: true, ..FakeSynth::default() };
        let mut s = session(synth);
        s.generate("").await.unwrap_err();
        assert_eq!(s.error(), Some("Please save your OpenAI API key first"));
        assert!(s.synth.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_book_mode_speaks_one_section() {
        let mut s = session(FakeSynth::default());
        let prepared = s.prepare(STORY).unwrap().len();
        assert_eq!(prepared, 3);
        assert!(s.controller().is_empty());

        s.speak_section(1).await.unwrap();
        assert_eq!(*s.synth.requests.lock().unwrap(), vec!["A time.".to_string()]);
        let c = s.controller();
        assert_eq!(c.len(), 1);
        assert!(!c.is_multi_section());
        assert_eq!(c.current_text(), Some("A time."));
        assert_eq!(c.media().loaded, vec!["gen-1".to_string()]);
        assert_eq!(s.export().unwrap().file_name, "section_2.mp3");

        assert_eq!(
            s.speak_section(7).await.unwrap_err(),
            SessionError::Player(PlayerError::IndexOutOfRange { index: 7, len: 3 })
        );
        assert_eq!(s.controller().len(), 1);
    }

    #[tokio::test]
    async fn test_status_handle_tracks_progress() {
        let s = session(FakeSynth::default());
        let status = s.status();
        assert_eq!(status.progress(), None);
        status.begin(4);
        status.advance(2);
        assert!(s.is_generating());
        assert_eq!(status.progress(), Some((2, 4)));
        status.finish();
        assert!(!s.is_generating());
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_chars: 300,
            volume: 0.4,
            format: AudioFormat::Wav,
            ..Config::default()
        };
        let s = Session::from_config(&config, FakeSynth::default(), NullMedia::default());
        assert_eq!(s.max_chars(), 300);
        assert_eq!(s.controller().volume(), 0.4);
        assert_eq!(s.params().format, AudioFormat::Wav);

        let unchecked = Config { max_chars: 0, ..Config::default() };
        let s = Session::from_config(&unchecked, FakeSynth::default(), NullMedia::default());
        assert_eq!(s.max_chars(), 1);
    }
}
