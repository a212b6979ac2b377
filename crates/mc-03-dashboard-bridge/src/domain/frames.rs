//! WebSocket frame format.
//!
//! Every frame in either direction is a JSON text message
//! `{"event": <channel>, "data": <json>}`. Clients send on
//! `dashboard-command`; the bridge sends on `publish-event`.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use shared_types::{Envelope, PUBLISH_EVENT_CHANNEL};
use thiserror::Error;

use super::session::OutboundFrame;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is not a JSON object with an event name: {0}")]
    Malformed(String),
    #[error("frame on {0} carries no data")]
    MissingData(String),
}

/// A frame received from a session.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    /// Kept as the exact bytes the client sent.
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))
    }

    /// Data bytes, exactly as received.
    pub fn into_data(self) -> Result<Box<RawValue>, FrameError> {
        self.data.ok_or(FrameError::MissingData(self.event))
    }
}

#[derive(Serialize)]
struct EventFrame<'a> {
    event: &'a str,
    data: &'a RawValue,
}

/// The body of an accepted bus message as embeddable JSON.
///
/// `body` has already been parsed as `envelope`, so it is kept verbatim; the
/// envelope is re-encoded only if the body cannot be embedded.
pub fn embeddable_body(body: &[u8], envelope: &Envelope) -> Option<Box<RawValue>> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| RawValue::from_string(text.trim().to_string()).ok())
        .or_else(|| serde_json::value::to_raw_value(envelope).ok())
}

/// Build the `publish-event` frame around `data`.
pub fn event_frame(data: &RawValue) -> OutboundFrame {
    let frame = EventFrame {
        event: PUBLISH_EVENT_CHANNEL,
        data,
    };
    match serde_json::to_string(&frame) {
        Ok(text) => OutboundFrame::from(text),
        Err(_) => OutboundFrame::from(fallback_frame()),
    }
}

fn fallback_frame() -> String {
    format!(r#"{{"event":"{}","data":null}}"#, PUBLISH_EVENT_CHANNEL)
}
