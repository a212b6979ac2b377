//! # Error Types
//!
//! Decoding failures for messages arriving from outside the process.

use thiserror::Error;

/// Why an inbound message could not be turned into a typed event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// Not a `{type, payload}` JSON object.
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    /// Well-formed envelope with a `type` no decoder exists for.
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    /// Recognised kind whose payload does not match its record.
    #[error("Invalid payload for {kind}: {reason}")]
    InvalidPayload { kind: String, reason: String },
}

impl EnvelopeError {
    /// Short label used as a metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed",
            Self::UnknownKind(_) => "unknown_kind",
            Self::InvalidPayload { .. } => "invalid_payload",
        }
    }
}
