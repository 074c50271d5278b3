/*!
Messages exchanged with the embedding host.

Inbound messages are tagged JSON; anything without a recognized tag is
ignored. Outbound notifications are fire-and-forget with no payload beyond
the discriminator.
*/

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::Logger;

/// Inbound message from the embedding host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostMessage {
    /// An utterance for the character to respond to.
    Chat { text: String },
}

/// Outbound notification to the embedding host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostNotification {
    SpeechStarted,
    SpeechEnded,
    UnlockRequired,
}

/// Where outbound notifications go. Fire-and-forget: delivery failures are
/// the sink's problem and must not reach the orchestrator.
pub trait HostSink {
    fn notify(&mut self, notification: HostNotification);
}

/// Writes each notification as one JSON line.
pub struct JsonLineSink<W: Write> {
    logger: Logger,
    writer: W,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            logger: Logger::create("JsonLineSink"),
            writer,
        }
    }
}

impl<W: Write> HostSink for JsonLineSink<W> {
    fn notify(&mut self, notification: HostNotification) {
        let payload = match serde_json::to_string(&notification) {
            Ok(v) => v,
            Err(e) => {
                self.logger.error(format!("Unable to encode notification: {e}"));
                return;
            }
        };

        if let Err(e) = writeln!(self.writer, "{payload}") {
            self.logger.error(format!("Unable to notify host: {e}"));
        }
    }
}

/// Parse a raw host message. Unrecognized tags and malformed payloads yield
/// `None`; the bridge never errors at the host.
pub fn parse_host_message(raw: &str) -> Option<HostMessage> {
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("Ignoring unrecognized host message: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_parses() {
        let message = parse_host_message(r#"{"type": "chat", "text": "hello there"}"#);

        assert_eq!(
            message,
            Some(HostMessage::Chat {
                text: "hello there".to_string()
            })
        );
    }

    #[test]
    fn unrecognized_tag_is_ignored() {
        assert_eq!(parse_host_message(r#"{"type": "resize", "w": 300}"#), None);
    }

    #[test]
    fn malformed_payloads_are_ignored() {
        assert_eq!(parse_host_message("not json"), None);
        assert_eq!(parse_host_message(r#"{"type": "chat"}"#), None);
    }

    #[test]
    fn notifications_carry_only_the_discriminator() {
        assert_eq!(
            serde_json::to_string(&HostNotification::SpeechStarted).unwrap(),
            r#"{"type":"speech-started"}"#
        );
        assert_eq!(
            serde_json::to_string(&HostNotification::SpeechEnded).unwrap(),
            r#"{"type":"speech-ended"}"#
        );
        assert_eq!(
            serde_json::to_string(&HostNotification::UnlockRequired).unwrap(),
            r#"{"type":"unlock-required"}"#
        );
    }

    #[test]
    fn json_line_sink_writes_one_line_each() {
        let mut sink = JsonLineSink::new(Vec::new());

        sink.notify(HostNotification::SpeechStarted);
        sink.notify(HostNotification::SpeechEnded);

        let written = String::from_utf8(sink.writer).unwrap();
        assert_eq!(
            written,
            "{\"type\":\"speech-started\"}\n{\"type\":\"speech-ended\"}\n"
        );
    }
}
