use std::fmt::Display;
use std::str::FromStr;

use once_cell::sync::Lazy;

use crate::face::FaceRegistry;
use crate::Logger;

/// Every expression shape in the emotion family, used to clear the family
/// before applying a new member.
pub static EMOTION_SHAPES: Lazy<Vec<&'static str>> =
    Lazy::new(|| Emotion::ALL.iter().map(|e| e.shape()).collect());

/// The fixed emotion vocabulary understood from backend payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Angry,
    Sad,
    Surprised,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnknownEmotion {
    input: String,
}

impl Display for UnknownEmotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown emotion: {}", self.input)
    }
}

impl std::error::Error for UnknownEmotion {}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Angry,
        Emotion::Sad,
        Emotion::Surprised,
    ];

    /// The blend shape this emotion selects.
    pub fn shape(&self) -> &'static str {
        match self {
            Emotion::Neutral => "Fcl_ALL_Neutral",
            Emotion::Happy => "Fcl_ALL_Joy",
            Emotion::Angry => "Fcl_ALL_Angry",
            Emotion::Sad => "Fcl_ALL_Sorrow",
            Emotion::Surprised => "Fcl_ALL_Surprised",
        }
    }
}

impl FromStr for Emotion {
    type Err = UnknownEmotion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "happy" => Ok(Self::Happy),
            "angry" => Ok(Self::Angry),
            "sad" => Ok(Self::Sad),
            "surprised" => Ok(Self::Surprised),
            _ => Err(UnknownEmotion {
                input: s.to_string(),
            }),
        }
    }
}

impl AsRef<str> for Emotion {
    fn as_ref(&self) -> &str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Angry => "angry",
            Emotion::Sad => "sad",
            Emotion::Surprised => "surprised",
        }
    }
}

/// Exclusive-selects one emotion shape per facial mesh.
///
/// Emotion is a persistent overlay: it stays applied until the next call,
/// unlike the transient lip-sync shapes.
pub struct EmotionController {
    logger: Logger,
    current: Emotion,
}

impl EmotionController {
    pub fn new() -> Self {
        Self {
            logger: Logger::create("EmotionController"),
            current: Emotion::default(),
        }
    }

    pub fn current(&self) -> Emotion {
        self.current
    }

    /// Apply an emotion key from an untrusted payload. Unknown keys are
    /// silently ignored.
    pub fn set_emotion(&mut self, key: &str, face: &mut FaceRegistry) {
        let emotion = match key.parse::<Emotion>() {
            Ok(v) => v,
            Err(e) => {
                self.logger.debug(format!("{e}, ignoring"));
                return;
            }
        };

        self.apply(emotion, face);
    }

    /// Zero the whole family, then raise the selected shape.
    pub fn apply(&mut self, emotion: Emotion, face: &mut FaceRegistry) {
        face.reset_group(EMOTION_SHAPES.as_slice());
        face.set_influence(emotion.shape(), 1.0);
        self.current = emotion;
    }
}

impl Default for EmotionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::testing::face_with;

    fn raised(mesh: &crate::face::testing::SharedMesh) -> Vec<&'static str> {
        EMOTION_SHAPES
            .iter()
            .filter(|shape| mesh.influence(shape) == Some(1.0))
            .copied()
            .collect()
    }

    #[test]
    fn exactly_one_shape_raised_after_each_call() {
        let (mut face, mesh) = face_with(EMOTION_SHAPES.as_slice());
        let mut emotions = EmotionController::new();

        for key in ["happy", "sad", "surprised", "neutral", "angry"] {
            emotions.set_emotion(key, &mut face);
            assert_eq!(raised(&mesh).len(), 1, "after {key}");
        }

        assert_eq!(emotions.current(), Emotion::Angry);
        assert_eq!(raised(&mesh), vec![Emotion::Angry.shape()]);
    }

    #[test]
    fn unknown_key_changes_nothing() {
        let (mut face, mesh) = face_with(EMOTION_SHAPES.as_slice());
        let mut emotions = EmotionController::new();
        emotions.set_emotion("happy", &mut face);

        emotions.set_emotion("ecstatic", &mut face);

        assert_eq!(emotions.current(), Emotion::Happy);
        assert_eq!(raised(&mesh), vec![Emotion::Happy.shape()]);
    }

    #[test]
    fn model_without_emotion_targets_is_fine() {
        let (mut face, mesh) = face_with(&["Fcl_MTH_A"]);
        let mut emotions = EmotionController::new();

        emotions.set_emotion("happy", &mut face);

        assert_eq!(emotions.current(), Emotion::Happy);
        assert_eq!(mesh.influence("Fcl_MTH_A"), Some(0.0));
    }

    #[test]
    fn keys_parse_case_insensitively() {
        assert_eq!("HaPPy".parse::<Emotion>(), Ok(Emotion::Happy));
        assert!("".parse::<Emotion>().is_err());
    }
}
