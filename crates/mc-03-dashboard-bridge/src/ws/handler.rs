//! WebSocket session handler.
//!
//! One handler per connected dashboard:
//! - registers the session with the core and gets its outbox
//! - a writer task drains the outbox onto the socket, each write bounded by
//!   the send timeout
//! - the reader relays `dashboard-command` frames and ignores everything else

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use mascoord_telemetry::metrics::SESSION_SEND_FAILURES;
use mascoord_telemetry::{log_session_event, metric_inc};
use shared_types::DASHBOARD_COMMAND_CHANNEL;
use tokio::sync::mpsc;

use crate::domain::{InboundFrame, OutboundFrame, SessionId, SessionSendError, WebSocketConfig};
use crate::pipeline::BridgeHandle;

pub struct SessionHandler {
    core: BridgeHandle,
    session_id: SessionId,
    session_buffer: usize,
    send_timeout: Duration,
}

impl SessionHandler {
    pub fn new(core: BridgeHandle, config: &WebSocketConfig) -> Self {
        Self {
            core,
            session_id: SessionId::new(),
            session_buffer: config.session_buffer,
            send_timeout: config.send_timeout,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Serve the socket until either side goes away.
    pub async fn handle(self, socket: WebSocket) {
        let id = self.session_id;
        let frames = match self.core.open_session(id, self.session_buffer).await {
            Ok(frames) => frames,
            Err(e) => {
                log_session_event!(warn, "Rejecting session", id, error = %e);
                return;
            }
        };

        let (sink, mut incoming) = socket.split();
        let mut writer = tokio::spawn(write_frames(sink, frames, self.send_timeout, id));

        loop {
            tokio::select! {
                message = incoming.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if !self.on_text(&text).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => {
                            if !self.on_text(&text).await {
                                break;
                            }
                        }
                        Err(_) => log_session_event!(debug, "Ignoring non-UTF-8 binary frame", id),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    // Pings are answered by the socket itself.
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log_session_event!(debug, "Socket read failed", id, error = %e);
                        break;
                    }
                },
                result = &mut writer => {
                    if let Ok(Err(e)) = result {
                        log_session_event!(info, "Closing session", id, reason = %e);
                    }
                    break;
                }
            }
        }

        writer.abort();
        let _ = self.core.close_session(id).await;
    }

    /// Handle one text frame. Returns `false` once the core is gone.
    async fn on_text(&self, text: &str) -> bool {
        let id = self.session_id;
        let frame = match InboundFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                log_session_event!(debug, "Ignoring unparsable frame", id, error = %e);
                return true;
            }
        };

        if frame.event != DASHBOARD_COMMAND_CHANNEL {
            log_session_event!(debug, "Ignoring frame on unknown channel", id, event = %frame.event);
            return true;
        }

        match frame.into_data() {
            Ok(data) => self.core.command(id, data).await.is_ok(),
            Err(e) => {
                log_session_event!(warn, "Ignoring command frame", id, error = %e);
                true
            }
        }
    }
}

/// Drain the outbox onto the socket.
///
/// Ends cleanly when the core drops the outbox; fails on a write error or
/// when a write does not finish within `send_timeout`.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<OutboundFrame>,
    send_timeout: Duration,
    id: SessionId,
) -> Result<(), SessionSendError> {
    while let Some(frame) = frames.recv().await {
        match tokio::time::timeout(send_timeout, sink.send(Message::Text(frame.to_string()))).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log_session_event!(debug, "Socket write failed", id, error = %e);
                return Err(SessionSendError::Closed);
            }
            Err(_) => {
                metric_inc!(SESSION_SEND_FAILURES, &[SessionSendError::Timeout.label()]);
                return Err(SessionSendError::Timeout);
            }
        }
    }
    let _ = sink.close().await;
    Ok(())
}
