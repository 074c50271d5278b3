pub mod chat;

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What to do when text arrives while the audio gate is still locked.
///
/// Hosts disagree on the right behavior, so it is a policy choice rather
/// than a fixed contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    /// Surface an unlock-required notification to the host UI.
    #[default]
    Prompt,
    /// Log and drop the utterance.
    Drop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownGatePolicy {
    input: String,
}

impl Display for UnknownGatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown gate policy: {}", self.input)
    }
}

impl std::error::Error for UnknownGatePolicy {}

impl FromStr for GatePolicy {
    type Err = UnknownGatePolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prompt" => Ok(Self::Prompt),
            "drop" | "silent" => Ok(Self::Drop),
            _ => Err(UnknownGatePolicy {
                input: s.to_string(),
            }),
        }
    }
}

impl AsRef<str> for GatePolicy {
    fn as_ref(&self) -> &str {
        match self {
            GatePolicy::Prompt => "prompt",
            GatePolicy::Drop => "drop",
        }
    }
}

/// Tunables for one character instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterOptions {
    /// Conversational backend endpoint.
    pub backend_url: String,
    /// Preferred voice locale prefix for local synthesis.
    pub locale: String,
    pub gate_policy: GatePolicy,
    /// Retained conversation pairs; the turn log holds at most twice this.
    pub max_turns: usize,
    /// Lip-sync tick period.
    pub lip_period_ms: u64,
    /// Influence written to the chosen viseme each tick.
    pub lip_weight: f32,
    /// Pause between audio ending and the face returning to neutral.
    pub settle_delay_ms: u64,
    pub blink_min_spacing_ms: u64,
    pub blink_max_spacing_ms: u64,
    pub blink_close_ms: u64,
}

impl Default for CharacterOptions {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8080/chat".to_string(),
            locale: "en".to_string(),
            gate_policy: GatePolicy::default(),
            max_turns: 8,
            lip_period_ms: 120,
            lip_weight: 0.75,
            settle_delay_ms: 500,
            blink_min_spacing_ms: 2_000,
            blink_max_spacing_ms: 6_000,
            blink_close_ms: 120,
        }
    }
}
