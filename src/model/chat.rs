/*!
Conversation data: the bounded turn log and the backend wire types.
*/

use std::collections::VecDeque;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Retained conversation pairs when the host does not override it.
pub const MAX_TURNS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// When the turn was recorded. Not part of the wire format.
    #[serde(skip, default = "Utc::now")]
    pub at: DateTime<Utc>,
}

/// Append-only turn log, truncated to the most recent `max_turns`
/// user+assistant pairs, oldest dropped first. Process-lifetime only.
#[derive(Debug)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    pub fn append_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn append_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    /// Ordered copy of the log for inclusion in an outbound request.
    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push(&mut self, role: Role, content: String) {
        self.turns.push_back(ConversationTurn {
            role,
            content,
            at: Utc::now(),
        });

        while self.turns.len() > self.max_turns * 2 {
            self.turns.pop_front();
        }
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(MAX_TURNS)
    }
}

/// Outbound request body for the conversational backend.
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub text: String,
    pub history: Vec<ConversationTurn>,
}

/// Raw response payload as sent by the backend. Extra fields are ignored;
/// every known field may be missing.
#[derive(Debug, Deserialize)]
pub(crate) struct InChatResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    emotion: Option<String>,
    /// Base64-encoded audio bytes.
    #[serde(default)]
    audio: Option<String>,
}

/// A backend response after decoding, ready for the orchestrator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatResponse {
    pub reply: Option<String>,
    pub emotion: Option<String>,
    pub audio: Option<Vec<u8>>,
}

impl From<InChatResponse> for ChatResponse {
    fn from(value: InChatResponse) -> Self {
        let audio = value.audio.and_then(|encoded| {
            match BASE64_STANDARD.decode(encoded.as_bytes()) {
                Ok(bytes) if !bytes.is_empty() => Some(bytes),
                Ok(_) => None,
                Err(e) => {
                    log::error!("Unable to decode audio payload, dropping it: {e}");
                    None
                }
            }
        });

        Self {
            reply: value.reply.filter(|reply| !reply.is_empty()),
            emotion: value.emotion,
            audio,
        }
    }
}

pub(crate) fn parse_response(raw: &[u8]) -> Result<ChatResponse, serde_json::Error> {
    serde_json::from_slice::<InChatResponse>(raw).map(ChatResponse::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod memory {
        use super::*;

        #[test]
        fn never_exceeds_twice_max_turns() {
            let mut memory = ConversationMemory::new(8);

            for i in 0..50 {
                memory.append_user(format!("question {i}"));
                memory.append_assistant(format!("answer {i}"));
                assert!(memory.len() <= 16);
            }

            assert_eq!(memory.len(), 16);
        }

        #[test]
        fn drops_oldest_first() {
            let mut memory = ConversationMemory::new(2);

            for i in 0..5 {
                memory.append_user(format!("question {i}"));
                memory.append_assistant(format!("answer {i}"));
            }

            let snapshot = memory.snapshot();
            assert_eq!(snapshot.len(), 4);
            assert_eq!(snapshot[0].role, Role::User);
            assert_eq!(snapshot[0].content, "question 3");
            assert_eq!(snapshot[3].content, "answer 4");
        }

        #[test]
        fn starts_empty() {
            assert!(ConversationMemory::default().is_empty());
        }
    }

    mod wire {
        use super::*;
        use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
        use base64::Engine;

        #[test]
        fn request_serializes_without_timestamps() {
            let mut memory = ConversationMemory::default();
            memory.append_user("hi");

            let request = ChatRequest {
                text: "hi".to_string(),
                history: memory.snapshot(),
            };

            assert_eq!(
                serde_json::to_string(&request).unwrap(),
                r#"{"text":"hi","history":[{"role":"user","content":"hi"}]}"#
            );
        }

        #[test]
        fn full_response_decodes() {
            let encoded = BASE64_STANDARD.encode(b"RIFFdata");
            let raw = format!(
                r#"{{"reply": "Hello", "emotion": "happy", "audio": "{encoded}", "extra": 1}}"#
            );

            let response = parse_response(raw.as_bytes()).unwrap();

            assert_eq!(response.reply.as_deref(), Some("Hello"));
            assert_eq!(response.emotion.as_deref(), Some("happy"));
            assert_eq!(response.audio.as_deref(), Some(b"RIFFdata".as_slice()));
        }

        #[test]
        fn missing_fields_become_none() {
            let response = parse_response(br#"{"reply": "Hi"}"#).unwrap();

            assert_eq!(response.reply.as_deref(), Some("Hi"));
            assert_eq!(response.emotion, None);
            assert_eq!(response.audio, None);
        }

        #[test]
        fn bad_base64_drops_the_audio_only() {
            let response =
                parse_response(br#"{"reply": "Hi", "audio": "not-base64!!!"}"#).unwrap();

            assert_eq!(response.reply.as_deref(), Some("Hi"));
            assert_eq!(response.audio, None);
        }

        #[test]
        fn empty_strings_are_treated_as_absent() {
            let response = parse_response(br#"{"reply": "", "audio": ""}"#).unwrap();

            assert_eq!(response.reply, None);
            assert_eq!(response.audio, None);
        }

        #[test]
        fn non_object_payload_is_an_error() {
            assert!(parse_response(b"[1, 2, 3]").is_err());
        }
    }
}
