//! Error types for sectioning, speech generation and playback.
//!
//! Validation and batch errors are meant to reach the user through a single
//! error slot (see [`crate::session::Session`]).  Playback failures never do:
//! [`PlaybackFailure`] is only ever logged by the controller.

use thiserror::Error;

/// Sectioning could not produce any output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SectionizeError {
    #[error("Please enter some text")]
    EmptyInput,
}

/// A single call to a speech provider failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    #[error("Please save your OpenAI API key first")]
    MissingCredentials,

    #[error("Speech request rejected ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("Speech request failed: {0}")]
    Transport(String),

    #[error("{0}")]
    Provider(String),
}

/// A generation batch stopped before every section had audio.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("Generation stopped at section {} of {total}: {source}", .index + 1)]
    Generation {
        /// 0-based index of the section whose request failed.
        index: usize,
        total: usize,
        #[source]
        source: SynthesisError,
    },
}

impl BatchError {
    /// 0-based index of the section at which the batch stopped.
    pub fn failed_index(&self) -> usize {
        match self {
            BatchError::Generation { index, .. } => *index,
        }
    }
}

/// Misuse of the playback controller's navigation contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayerError {
    #[error("No audio loaded")]
    Empty,

    #[error("Section index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A media element refused to start or resume playback
/// (decode failure, autoplay restriction, missing source, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Playback failed: {0}")]
pub struct PlaybackFailure(pub String);

/// Anything that can land in the session's error slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Sectionize(#[from] SectionizeError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error(transparent)]
    Player(#[from] PlayerError),
}
