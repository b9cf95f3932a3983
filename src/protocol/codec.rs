//! Envelope encoding and decoding

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::util::time::unix_millis;

use super::messages::{Message, MessageType};
use super::wire::{compact_state, expand_state, WireState, MAX_WIRE_BULLETS};

/// Protocol format errors. Always recoverable: the frame is dropped.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Frame is not a JSON object")]
    NotAnObject,

    #[error("Frame is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Frame has an invalid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("Invalid {kind:?} payload: {source}")]
    Payload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize {kind:?}: {source}")]
    Encode {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },
}

/// Structurally valid envelope whose payload has not been decoded yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub payload: Value,
    /// Sender's unix millis
    pub timestamp: u64,
    /// Per-sender sequence number; 0 from senders that do not stamp one
    #[serde(default)]
    pub seq: u64,
}

/// A decoded message with its envelope metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    pub timestamp: u64,
    pub seq: u64,
}

/// Check that raw text looks like an envelope before anything reads it
pub fn validate_frame(text: &str) -> Result<Frame, ProtocolError> {
    let value: Value = serde_json::from_str(text).map_err(ProtocolError::Json)?;
    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
    for field in ["type", "payload", "timestamp"] {
        if !object.contains_key(field) {
            return Err(ProtocolError::MissingField(field));
        }
    }
    serde_json::from_value(value).map_err(ProtocolError::Envelope)
}

/// Encodes outgoing messages (stamping time and sequence) and decodes
/// incoming frames into typed messages.
#[derive(Debug)]
pub struct MessageCodec {
    next_seq: u64,
    bullet_cap: usize,
}

impl MessageCodec {
    pub fn new() -> Self {
        Self::with_bullet_cap(MAX_WIRE_BULLETS)
    }

    pub fn with_bullet_cap(bullet_cap: usize) -> Self {
        Self {
            next_seq: 1,
            bullet_cap,
        }
    }

    /// Build the frame for a message. `State` is compacted; everything else
    /// passes through unmodified.
    pub fn frame(&mut self, message: &Message) -> Result<Frame, ProtocolError> {
        let kind = message.kind();
        let encode = |source| ProtocolError::Encode { kind, source };
        let payload = match message {
            Message::State(state) => {
                serde_json::to_value(compact_state(state, self.bullet_cap)).map_err(encode)?
            }
            Message::Init(init) => serde_json::to_value(init).map_err(encode)?,
            Message::Input(input) => serde_json::to_value(input).map_err(encode)?,
            Message::GameOver(over) => serde_json::to_value(over).map_err(encode)?,
            Message::Ping(ping) => serde_json::to_value(ping).map_err(encode)?,
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        Ok(Frame {
            kind,
            payload,
            timestamp: unix_millis(),
            seq,
        })
    }

    /// Encode a message to wire text
    pub fn encode(&mut self, message: &Message) -> Result<String, ProtocolError> {
        let frame = self.frame(message)?;
        serde_json::to_string(&frame).map_err(|source| ProtocolError::Encode {
            kind: frame.kind,
            source,
        })
    }

    /// Decode a validated frame into a typed message
    pub fn decode(&self, frame: Frame) -> Result<Envelope, ProtocolError> {
        let kind = frame.kind;
        let payload_err = |source| ProtocolError::Payload { kind, source };
        let message = match kind {
            MessageType::Init => {
                Message::Init(serde_json::from_value(frame.payload).map_err(payload_err)?)
            }
            MessageType::Input => {
                Message::Input(serde_json::from_value(frame.payload).map_err(payload_err)?)
            }
            MessageType::State => {
                let wire: WireState =
                    serde_json::from_value(frame.payload).map_err(payload_err)?;
                Message::State(expand_state(wire))
            }
            MessageType::GameOver => {
                Message::GameOver(serde_json::from_value(frame.payload).map_err(payload_err)?)
            }
            MessageType::Ping => {
                Message::Ping(serde_json::from_value(frame.payload).map_err(payload_err)?)
            }
        };

        Ok(Envelope {
            message,
            timestamp: frame.timestamp,
            seq: frame.seq,
        })
    }

    /// Validate and decode raw wire text
    #[cfg(test)]
    pub fn decode_text(&self, text: &str) -> Result<Envelope, ProtocolError> {
        self.decode(validate_frame(text)?)
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps only the newest `State`: anything at or below the last accepted
/// sequence number is stale.
#[derive(Debug, Default)]
pub struct StateReceiver {
    last_seq: Option<u64>,
    discarded: u64,
}

impl StateReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a state with `seq` should be applied
    pub fn accept(&mut self, seq: u64) -> bool {
        match self.last_seq {
            Some(last) if seq <= last => {
                self.discarded += 1;
                debug!(seq, last, "Discarding stale state");
                false
            }
            _ => {
                self.last_seq = Some(seq);
                true
            }
        }
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last_seq
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}
