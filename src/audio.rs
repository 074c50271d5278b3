/*!
Seams to the platform's audio facilities.

Two engines sit behind traits: clip playback for cloud-synthesized audio,
and the local text-to-speech engine used as the fallback. Both report their
lifecycle through polled events so everything stays on the single
cooperative thread.
*/

pub mod gate;
pub mod playback;

use std::fmt::Display;

#[derive(Debug, Clone)]
pub enum AudioError {
    /// The clip bytes could not be decoded into playable media.
    Decode(String),
    /// The platform refused to start playback, typically an autoplay block.
    Rejected(String),
    /// The synthesis engine failed.
    Engine(String),
}

impl Display for AudioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(v) => write!(f, "Decode failure: {v}"),
            Self::Rejected(v) => write!(f, "Playback rejected: {v}"),
            Self::Engine(v) => write!(f, "Engine failure: {v}"),
        }
    }
}

impl std::error::Error for AudioError {}

/// A voice enumerated from the local synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub name: String,
    /// BCP 47-ish language tag, e.g. "en-US".
    pub lang: String,
}

/// Events from an active clip playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipEvent {
    /// The clip reached its natural end.
    Ended,
    /// Playback failed mid-stream.
    Error,
}

/// Events from an active synthesis utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthEvent {
    Started,
    Ended,
    Error,
}

/// Plays decoded audio clips.
pub trait AudioOutput {
    /// Decode `clip` and begin playback. An error means decode failure or
    /// platform refusal; the caller decides the fallback.
    fn play(&mut self, clip: &[u8]) -> Result<(), AudioError>;

    /// Stop any active playback. No event is emitted for a forced stop.
    fn stop(&mut self);

    /// Trivial silent playback used as the unlock feature probe. Must be
    /// called from a host user-gesture handler to satisfy platform autoplay
    /// restrictions.
    fn probe(&mut self) -> Result<(), AudioError>;

    /// Next pending event, if any. Drained once per pump.
    fn poll_event(&mut self) -> Option<ClipEvent>;
}

/// Local text-to-speech engine.
pub trait SpeechSynthesizer {
    /// Voices known to the engine. May be empty if enumeration has not
    /// completed yet; synthesis then proceeds with the engine default.
    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, text: &str, voice: Option<&Voice>) -> Result<(), AudioError>;

    /// Cancel the active utterance. No event is emitted for a forced stop.
    fn cancel(&mut self);

    fn poll_event(&mut self) -> Option<SynthEvent>;
}

/// Pick a voice for the target locale: first one whose language tag starts
/// with the prefix, else the first enumerated voice, else engine default.
pub fn select_voice<'a>(voices: &'a [Voice], locale: &str) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|voice| voice.lang.starts_with(locale))
        .or_else(|| voices.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str) -> Voice {
        Voice {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[test]
    fn prefers_matching_locale_prefix() {
        let voices = [voice("Alice", "fr-FR"), voice("Bob", "en-GB")];

        assert_eq!(select_voice(&voices, "en").unwrap().name, "Bob");
    }

    #[test]
    fn falls_back_to_first_voice() {
        let voices = [voice("Alice", "fr-FR"), voice("Carol", "ja-JP")];

        assert_eq!(select_voice(&voices, "en").unwrap().name, "Alice");
    }

    #[test]
    fn empty_enumeration_uses_engine_default() {
        assert_eq!(select_voice(&[], "en"), None);
    }
}
