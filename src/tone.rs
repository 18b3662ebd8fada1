//! Tutor tones
//!
//! A tone selects both the phrasing style of replies (a persona instruction
//! prepended to prompts) and the synthesized voice. The mapping is built once
//! at startup and never mutated afterwards.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Persona/voice preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Warm, encouraging older-sister style
    #[default]
    Gentle,
    /// Serious, detail-oriented teacher style
    Strict,
    /// Light-hearted classmate style
    Humorous,
}

impl Tone {
    /// All tones in display order
    pub const ALL: [Self; 3] = [Self::Gentle, Self::Strict, Self::Humorous];

    /// Canonical name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gentle => "gentle",
            Self::Strict => "strict",
            Self::Humorous => "humorous",
        }
    }

    /// Parse a tone label, accepting English names and the Chinese UI labels
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "gentle" | "温柔姐姐" => Some(Self::Gentle),
            "strict" | "严厉老师" => Some(Self::Strict),
            "humorous" | "funny" | "搞笑同学" => Some(Self::Humorous),
            _ => None,
        }
    }

    const fn default_voice(self) -> &'static str {
        match self {
            Self::Gentle => "nova",
            Self::Strict => "onyx",
            Self::Humorous => "fable",
        }
    }

    const fn default_instruction(self) -> &'static str {
        match self {
            Self::Gentle => {
                "Answer in a warm, kind tone with soft language and plenty of encouragement, \
                 like a caring older sister."
            }
            Self::Strict => {
                "Answer in a serious, authoritative tone with clear logic and attention to \
                 detail, like a strict teacher."
            }
            Self::Humorous => {
                "Answer in a humorous, relaxed tone with a few fitting jokes, like a classmate \
                 who loves to joke around."
            }
        }
    }
}

impl FromStr for Tone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| Error::Validation(format!("unknown tone: {s}")))
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice and phrasing for one tone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToneProfile {
    /// Synthesis voice identifier
    pub voice: String,
    /// Persona instruction prepended to prompts
    pub instruction: String,
}

/// Per-tone overrides, usually read from the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToneOverride {
    pub voice: Option<String>,
    pub instruction: Option<String>,
}

/// Immutable tone → profile mapping
#[derive(Debug, Clone)]
pub struct ToneMap {
    profiles: HashMap<Tone, ToneProfile>,
    default_tone: Tone,
}

impl Default for ToneMap {
    fn default() -> Self {
        Self::with_overrides(Tone::default(), &HashMap::new())
    }
}

impl ToneMap {
    /// Build the mapping from built-in defaults plus overrides
    ///
    /// Override keys are tone labels; unknown labels are ignored with a warning.
    #[must_use]
    pub fn with_overrides<S: std::hash::BuildHasher>(
        default_tone: Tone,
        overrides: &HashMap<String, ToneOverride, S>,
    ) -> Self {
        let mut profiles: HashMap<Tone, ToneProfile> = Tone::ALL
            .into_iter()
            .map(|tone| {
                (
                    tone,
                    ToneProfile {
                        voice: tone.default_voice().to_string(),
                        instruction: tone.default_instruction().to_string(),
                    },
                )
            })
            .collect();

        for (label, o) in overrides {
            let Some(tone) = Tone::parse(label) else {
                tracing::warn!(tone = %label, "ignoring override for unknown tone");
                continue;
            };
            if let Some(profile) = profiles.get_mut(&tone) {
                if let Some(voice) = &o.voice {
                    profile.voice.clone_from(voice);
                }
                if let Some(instruction) = &o.instruction {
                    profile.instruction.clone_from(instruction);
                }
            }
        }

        Self {
            profiles,
            default_tone,
        }
    }

    /// The tone used when none is given or the label is unknown
    #[must_use]
    pub const fn default_tone(&self) -> Tone {
        self.default_tone
    }

    /// Profile for a tone
    #[must_use]
    pub fn profile(&self, tone: Tone) -> &ToneProfile {
        // Every tone is inserted at construction
        &self.profiles[&tone]
    }

    /// Voice of the default tone
    #[must_use]
    pub fn default_voice(&self) -> &str {
        &self.profile(self.default_tone).voice
    }

    /// Resolve a tone label to a voice, falling back to the default voice
    #[must_use]
    pub fn voice_for(&self, label: &str) -> &str {
        Tone::parse(label).map_or_else(
            || {
                tracing::debug!(tone = %label, "unknown tone, using default voice");
                self.default_voice()
            },
            |tone| self.profile(tone).voice.as_str(),
        )
    }

    /// Persona instruction for a tone
    #[must_use]
    pub fn instruction(&self, tone: Tone) -> &str {
        &self.profile(tone).instruction
    }

    /// Prefix a user question with the tone's persona instruction
    #[must_use]
    pub fn frame_question(&self, tone: Tone, question: &str) -> String {
        format!("{}\nQuestion: {question}", self.instruction(tone))
    }
}
