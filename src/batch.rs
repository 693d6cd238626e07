//! Sequential batch generation.
//!
//! Sections are sent to the provider one at a time, in reading order.  The
//! first failure ends the batch and everything generated so far is dropped:
//! the caller gets either one resource per section or a single error.

use crate::{
    error::BatchError,
    sectionize::Section,
    synth::{AudioResource, SpeechSynthesizer, VoiceParams},
};

/// Generate audio for every section, in order.
///
/// `on_progress(index, total)` is called before each request.
///
/// On success the returned list is parallel to `sections`.  On failure
/// nothing is returned except the error naming the failed section; there is
/// no retry.
pub async fn generate_batch<S, F>(
    synth: &S,
    sections: &[Section],
    params: &VoiceParams,
    mut on_progress: F,
) -> Result<Vec<AudioResource>, BatchError>
where
    S: SpeechSynthesizer + ?Sized,
    F: FnMut(usize, usize),
{
    let total = sections.len();
    let mut resources = Vec::with_capacity(total);

    for (index, section) in sections.iter().enumerate() {
        on_progress(index, total);
        tracing::debug!(index, total, chars = section.char_len(), "generating section");

        match synth.synthesize(section.as_str(), index, params).await {
            Ok(resource) => resources.push(resource),
            Err(source) => {
                tracing::error!(index, total, error = %source, "batch aborted");
                // All-or-nothing: partial output is never exposed.
                drop(resources);
                return Err(BatchError::Generation { index, total, source });
            }
        }
    }

    tracing::info!(total, "batch complete");
    Ok(resources)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SynthesisError, sectionize::sectionize, synth::AudioFormat};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every request; fails on the configured index.
    struct ScriptedSynth {
        fail_at: Option<usize>,
        calls: Mutex<Vec<(usize, String)>>,
    }

    impl ScriptedSynth {
        fn new(fail_at: Option<usize>) -> Self {
            Self { fail_at, calls: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for ScriptedSynth {
        async fn synthesize(
            &self,
            text: &str,
            index: usize,
            _params: &VoiceParams,
        ) -> Result<AudioResource, SynthesisError> {
            self.calls.lock().unwrap().push((index, text.to_string()));
            if self.fail_at == Some(index) {
                return Err(SynthesisError::Provider("quota exceeded".into()));
            }
            Ok(AudioResource::at(format!("mem://{index}"), AudioFormat::Mp3))
        }
    }

    fn three_sections() -> Vec<Section> {
        sectionize("First.\n\nSecond.\n\nThird.", 8).unwrap()
    }

    #[tokio::test]
    async fn test_batch_is_sequential_and_parallel_to_sections() {
        let synth = ScriptedSynth::new(None);
        let sections = three_sections();
        let mut progress = Vec::new();

        let out = generate_batch(&synth, &sections, &VoiceParams::default(), |i, n| {
            progress.push((i, n))
        })
        .await
        .unwrap();

        assert_eq!(out.len(), 3);
        assert_eq!(out[2].location, "mem://2");
        assert_eq!(progress, vec![(0, 3), (1, 3), (2, 3)]);
        let calls = synth.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![(0, "First.".into()), (1, "Second.".into()), (2, "Third.".into())]
        );
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let synth = ScriptedSynth::new(Some(1));
        let err = generate_batch(&synth, &three_sections(), &VoiceParams::default(), |_, _| {})
            .await
            .unwrap_err();

        assert_eq!(err.failed_index(), 1);
        assert_eq!(err.to_string(), "Generation stopped at section 2 of 3: quota exceeded");
        // Section 2 was never requested.
        assert_eq!(synth.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let synth = ScriptedSynth::new(Some(0));
        let out = generate_batch(&synth, &[], &VoiceParams::default(), |_, _| {}).await.unwrap();
        assert!(out.is_empty());
    }
}
