//! Voice-instruction builder.
//!
//! Combines the user's mood/style line with reading rules that tell the
//! voice model how to treat punctuation and inline markers.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::synth::DEFAULT_INSTRUCTIONS;

// ─────────────────────────────────────────────────────────────────────────────
// Rules schema
// ─────────────────────────────────────────────────────────────────────────────

/// One rule: what it applies to, and how to read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    pub how_to_read: String,
}

/// The `reading_instructions` table of a rules file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingInstructions {
    pub comma: Option<Rule>,
    pub em_dash: Option<Rule>,
    pub ellipsis: Option<Rule>,
    pub period: Option<Rule>,
    pub line_break: Option<Rule>,
    pub italics: Option<Rule>,
    pub bold: Option<Rule>,
    pub exclamation: Option<Rule>,
    pub question: Option<Rule>,
    pub stretched_words: Option<Rule>,
    pub final_tip: Option<String>,
}

/// A user-defined rule for a pattern the built-ins do not cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    pub how_to_read: String,
}

impl CustomRule {
    /// Rules missing a name, pattern or reading are ignored.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.pattern.trim().is_empty()
            && !self.how_to_read.trim().is_empty()
    }
}

/// Deserialised rules file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingRules {
    pub reading_instructions: ReadingInstructions,
    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
}

impl ReadingRules {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse reading rules")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read reading rules: {}", path.display()))?;
        Self::from_json(&json)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

const DYNAMIC_INFLECTION: &str = "\n\nDynamic inflection guidance:
- Pay special attention to emotional transitions in the text
- When moving from a happy scene to a fearful one, gradually shift your tone
- For dialogue between different emotional states, adjust your inflection to match
- Maintain context awareness across paragraph boundaries
- In first-person narration, embody the emotions as they develop
- When humor transitions to seriousness, subtly shift your tone to reflect this
- Connect related emotional content even when separated by description";

const EMOTIONAL_CONTEXT: &str = "\n\nEssential emotional context:
- Read with natural emotional inflection based on the content
- Adjust tone to match the mood and atmosphere of the text
- Use appropriate pacing and emphasis for dramatic moments
- Maintain engagement and expressiveness throughout
- If the text contains emotions, convey them through your voice naturally";

/// Build the full instruction string sent with every section.
///
/// A blank `base` falls back to [`DEFAULT_INSTRUCTIONS`].
pub fn enhance_voice_instructions(
    base: &str,
    rules: &ReadingRules,
    dynamic_inflection: bool,
) -> String {
    let mut out = if base.trim().is_empty() {
        DEFAULT_INSTRUCTIONS.to_string()
    } else {
        base.to_string()
    };

    if dynamic_inflection {
        out.push_str(DYNAMIC_INFLECTION);
    }
    out.push_str(EMOTIONAL_CONTEXT);
    out.push_str("\n\nAdditional reading guidance:");

    let r = &rules.reading_instructions;
    let labelled = [
        ("For commas", &r.comma),
        ("For em-dashes (—)", &r.em_dash),
        ("For ellipses (...)", &r.ellipsis),
        ("For line breaks", &r.line_break),
        ("For italicized text (*text*)", &r.italics),
        ("For bold text (**text**)", &r.bold),
        ("For exclamations", &r.exclamation),
        ("For questions", &r.question),
        ("For stretched words (like 'nooooo')", &r.stretched_words),
    ];
    for (label, rule) in labelled {
        if let Some(rule) = rule {
            out.push_str(&format!("\n- {}: {}", label, rule.how_to_read));
        }
    }

    for custom in rules.custom_rules.iter().filter(|c| c.is_complete()) {
        out.push_str(&format!("\n- For {} ({}): {}", custom.name, custom.pattern, custom.how_to_read));
    }

    if let Some(tip) = r.final_tip.as_deref().filter(|t| !t.is_empty()) {
        out.push('\n');
        out.push_str(tip);
    }

    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
