//! # storyvoice
//!
//! Long-form text to speech, one request-sized section at a time.
//!
//! ## Quick start
//!
//! ```
//! use storyvoice::sectionize;
//!
//! let story = "It was a dark night.\n\nThe wind howled. Nobody slept.";
//! let sections = sectionize(story, 24).unwrap();
//! assert_eq!(sections, vec!["It was a dark night.", "The wind howled.", "Nobody slept."]);
//! ```
//!
//! With the `openai` feature, a [`Session`] ties it together:
//!
//! ```no_run
//! # #[cfg(feature = "openai")]
//! # async fn demo(media: impl storyvoice::MediaElement) -> Result<(), storyvoice::error::SessionError> {
//! use std::sync::Arc;
//! use storyvoice::{credentials::EnvCredentials, openai::OpenAiSynthesizer, Session};
//!
//! let synth = OpenAiSynthesizer::new(Arc::new(EnvCredentials::default()));
//! let mut session = Session::new(synth, media);
//! session.generate("Chapter one.\n\nChapter two.").await?;
//! session.controller_mut().play();
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//! 1. **Flatten**: editor HTML → plain text with inline emphasis markers ([`format`]).
//! 2. **Sectionize**: paragraphs first, sentences for oversized paragraphs ([`sectionize()`]).
//! 3. **Generate**: one provider request per section, in order; the first
//!    failure discards the whole batch ([`batch`]).
//! 4. **Play**: ordered clips with auto-advance, navigation, seek and
//!    volume ([`player`]).

pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod format;
pub mod instructions;
pub mod logging;
pub mod player;
pub mod sectionize;
pub mod session;
pub mod synth;

// HTTP provider; hosts that bring their own synthesizer can leave it out.
#[cfg(feature = "openai")]
pub mod openai;

// C FFI for native hosts: sectionize / flatten_html / free_string.
pub mod ffi;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::Config;
pub use player::{MediaElement, MediaEvent, PlaybackController, SlotKey};
pub use sectionize::{sectionize, Section, SectionList, MAX_CHARS};
pub use session::Session;
pub use synth::{AudioFormat, AudioResource, QualityTier, SpeechSynthesizer, VoiceParams};
