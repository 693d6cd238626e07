//! Sectionizer: splits long text into request-sized sections.
//!
//! Text is cut at paragraph boundaries first.  A paragraph that is too long
//! on its own is cut at sentence boundaries.  There is no finer fallback: a
//! single sentence longer than the limit becomes one oversized section.
//!
//! Lengths are counted in Unicode scalar values (`char`s), not bytes.

use std::{fmt, ops::Deref};

use fancy_regex::Regex as FancyRegex;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::SectionizeError;

/// Default per-request character limit of the speech endpoint.
pub const MAX_CHARS: usize = 4096;

/// Rejoins paragraphs that share a section.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Rejoins sentences of a split paragraph.
pub const SENTENCE_SEPARATOR: &str = " ";

// ─────────────────────────────────────────────────────────────────────────────
// Compiled regexes (lazily initialised once)
// ─────────────────────────────────────────────────────────────────────────────

/// Two or more newlines, possibly with whitespace between them.
static RE_PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Whitespace that follows a terminator; the terminator stays with its sentence.
static RE_SENTENCE_BREAK: Lazy<FancyRegex> =
    Lazy::new(|| FancyRegex::new(r"(?<=[.!?])\s+").unwrap());

// ─────────────────────────────────────────────────────────────────────────────
// Section
// ─────────────────────────────────────────────────────────────────────────────

/// One non-empty, immutable piece of the input, sent to speech as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Section(String);

/// Sections in reading order.
pub type SectionList = Vec<Section>;

impl Section {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters, the unit the limit is expressed in.
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl Deref for Section {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Section {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Section {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Section {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Greedy accumulator
// ─────────────────────────────────────────────────────────────────────────────

/// A section under construction.  Tracks its length so the budget check
/// never rescans the text.
struct Running {
    text: String,
    chars: usize,
    separator: &'static str,
    separator_chars: usize,
}

impl Running {
    fn new(separator: &'static str) -> Self {
        Self {
            text: String::new(),
            chars: 0,
            separator,
            separator_chars: separator.chars().count(),
        }
    }

    /// `len(s) + len(piece) + len(separator) <= max`.  The separator is
    /// charged even when `s` is empty.
    fn fits(&self, piece_chars: usize, max_chars: usize) -> bool {
        self.chars + piece_chars + self.separator_chars <= max_chars
    }

    fn push(&mut self, piece: &str, piece_chars: usize) {
        if !self.text.is_empty() {
            self.text.push_str(self.separator);
            self.chars += self.separator_chars;
        }
        self.text.push_str(piece);
        self.chars += piece_chars;
    }

    fn reset(&mut self, piece: String, piece_chars: usize) {
        self.text = piece;
        self.chars = piece_chars;
    }

    /// Hand back the accumulated text (if any) and start over.
    fn take(&mut self) -> Option<(String, usize)> {
        if self.text.is_empty() {
            return None;
        }
        let chars = std::mem::replace(&mut self.chars, 0);
        Some((std::mem::take(&mut self.text), chars))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Splitting helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Split a paragraph after `.`, `!` or `?` followed by whitespace.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for found in RE_SENTENCE_BREAK.find_iter(paragraph) {
        match found {
            Ok(m) => {
                pieces.push(&paragraph[start..m.start()]);
                start = m.end();
            }
            Err(e) => {
                // Backtrack limit: keep the remainder as one sentence.
                tracing::warn!(error = %e, "sentence boundary scan aborted");
                break;
            }
        }
    }
    pieces.push(&paragraph[start..]);
    pieces.retain(|s| !s.is_empty());
    pieces
}

/// Split text into paragraphs.  Whitespace-only paragraphs are dropped.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    RE_PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .collect()
}

/// Greedily pack the sentences of an oversized paragraph.  Every full
/// section is pushed to `out`; the last, still-open one is returned so the
/// caller can keep appending paragraphs to it.
fn pack_sentences(
    paragraph: &str,
    max_chars: usize,
    out: &mut SectionList,
) -> Option<(String, usize)> {
    let mut running = Running::new(SENTENCE_SEPARATOR);
    for sentence in split_sentences(paragraph) {
        let len = sentence.chars().count();
        if running.fits(len, max_chars) {
            running.push(sentence, len);
        } else {
            if let Some((text, _)) = running.take() {
                out.push(Section(text));
            }
            running.reset(sentence.to_string(), len);
        }
    }
    running.take()
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Split `text` into sections of at most `max_chars` characters.
///
/// Paragraphs (separated by a blank line) are packed greedily, rejoined with
/// [`PARAGRAPH_SEPARATOR`].  A paragraph longer than `max_chars` is split into
/// sentences that are packed the same way with [`SENTENCE_SEPARATOR`]; the
/// last group of sentences stays open for the following paragraphs.
///
/// A sentence longer than `max_chars` is emitted whole, so such a section is
/// the only kind that can exceed the limit.
///
/// # Errors
/// [`SectionizeError::EmptyInput`] when `text` is empty or whitespace-only.
///
/// ```
/// use storyvoice::sectionize::sectionize;
///
/// let sections = sectionize("Hello world.\n\nGoodbye.", 100).unwrap();
/// assert_eq!(sections, vec!["Hello world.\n\nGoodbye."]);
/// ```
pub fn sectionize(text: &str, max_chars: usize) -> Result<SectionList, SectionizeError> {
    if text.trim().is_empty() {
        return Err(SectionizeError::EmptyInput);
    }

    let mut sections = SectionList::new();
    let mut running = Running::new(PARAGRAPH_SEPARATOR);

    for paragraph in split_paragraphs(text) {
        let len = paragraph.chars().count();
        if running.fits(len, max_chars) {
            running.push(paragraph, len);
            continue;
        }

        if let Some((text, _)) = running.take() {
            sections.push(Section(text));
        }

        if len > max_chars {
            if let Some((tail, tail_chars)) = pack_sentences(paragraph, max_chars, &mut sections) {
                running.reset(tail, tail_chars);
            }
        } else {
            running.reset(paragraph.to_string(), len);
        }
    }

    if let Some((text, _)) = running.take() {
        sections.push(Section(text));
    }

    tracing::debug!(sections = sections.len(), max_chars, "text sectioned");
    Ok(sections)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
