//! Prompt construction for the text transformation worker
//!
//! Pure string building: no I/O, deterministic for identical inputs.

use serde::{Deserialize, Serialize};

use crate::brand_voice::BrandVoiceProfile;

/// Number of brand voice samples quoted in a prompt
const MAX_QUOTED_SAMPLES: usize = 3;

/// Characters kept from each quoted sample
const SAMPLE_EXCERPT_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformationKind {
    /// Social media post
    Post,
    /// Condensed summary
    Summary,
    /// Newsletter issue
    Newsletter,
    /// Video/teleprompter script
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLength {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Casual,
    Mystical,
    Inspirational,
    Bold,
}

impl TransformationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformationKind::Post => "post",
            TransformationKind::Summary => "summary",
            TransformationKind::Newsletter => "newsletter",
            TransformationKind::Script => "script",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "post" => Some(TransformationKind::Post),
            "summary" => Some(TransformationKind::Summary),
            "newsletter" => Some(TransformationKind::Newsletter),
            "script" => Some(TransformationKind::Script),
            _ => None,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            TransformationKind::Post => {
                "Rewrite the source text as a single social media post. \
                 Open with a hook, keep one idea per sentence, and end with \
                 an invitation to engage."
            }
            TransformationKind::Summary => {
                "Summarize the source text. Preserve every key claim and \
                 drop examples, asides, and repetition."
            }
            TransformationKind::Newsletter => {
                "Turn the source text into a newsletter issue with a short \
                 greeting, two or three titled sections, and a sign-off."
            }
            TransformationKind::Script => {
                "Adapt the source text into a spoken script. Use short \
                 sentences that read naturally aloud and mark natural pauses \
                 with line breaks."
            }
        }
    }
}

impl OutputLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputLength::Short => "short",
            OutputLength::Medium => "medium",
            OutputLength::Long => "long",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(OutputLength::Short),
            "medium" => Some(OutputLength::Medium),
            "long" => Some(OutputLength::Long),
            _ => None,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            OutputLength::Short => "Keep the result under 100 words.",
            OutputLength::Medium => "Aim for 200 to 400 words.",
            OutputLength::Long => "Write 600 to 900 words.",
        }
    }
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Mystical => "mystical",
            Tone::Inspirational => "inspirational",
            Tone::Bold => "bold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "professional" => Some(Tone::Professional),
            "casual" => Some(Tone::Casual),
            "mystical" => Some(Tone::Mystical),
            "inspirational" => Some(Tone::Inspirational),
            "bold" => Some(Tone::Bold),
            _ => None,
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Tone::Professional => "Write in a precise, professional voice without slang.",
            Tone::Casual => "Write in a relaxed, conversational voice.",
            Tone::Mystical => {
                "Write in an evocative, mystical voice, with imagery drawn \
                 from arcana and ritual, while keeping the meaning clear."
            }
            Tone::Inspirational => "Write in an uplifting voice that calls the reader to act.",
            Tone::Bold => "Write in a direct, assertive voice with strong verbs.",
        }
    }
}

/// Build the worker prompt for one transformation job
///
/// Deterministic: identical inputs always produce the identical string.
/// Brand voice samples are quoted in stored order, excerpted to a fixed
/// number of characters.
pub fn build_prompt(
    kind: TransformationKind,
    tone: Tone,
    length: OutputLength,
    brand_voice: Option<&BrandVoiceProfile>,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(kind.instruction());
    prompt.push('\n');
    prompt.push_str(tone.instruction());
    prompt.push('\n');
    prompt.push_str(length.instruction());

    if let Some(profile) = brand_voice {
        prompt.push_str("\n\nMatch this author's brand voice.");
        if !profile.tone.is_empty() {
            prompt.push_str(&format!("\nVoice tone: {}.", profile.tone));
        }
        if !profile.style.is_empty() {
            prompt.push_str(&format!("\nVoice style: {}.", profile.style));
        }
        for (key, value) in &profile.preferences {
            prompt.push_str(&format!("\nPreference - {}: {}.", key, value));
        }
        if !profile.samples.is_empty() {
            prompt.push_str("\nWriting samples from this author:");
            for sample in profile.samples.iter().take(MAX_QUOTED_SAMPLES) {
                let excerpt: String = sample.chars().take(SAMPLE_EXCERPT_CHARS).collect();
                prompt.push_str(&format!("\n---\n{}", excerpt));
            }
        }
    }

    prompt.push_str("\n\nRespond with the transformed text only.");
    prompt
}
