//! Dashboard sessions.
//!
//! A session is one connected dashboard. It carries no simulation state; the
//! core only keeps its outbox and a few counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::error::SessionSendError;

/// Session identifier (UUID v7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame serialised once and shared by every session it is sent to.
pub type OutboundFrame = Arc<str>;

/// Core-side handle on a connected session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    outbox: mpsc::Sender<OutboundFrame>,
    connected_at: DateTime<Utc>,
    delivered: u64,
    dropped: u64,
}

impl Session {
    pub fn new(id: SessionId, outbox: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id,
            outbox,
            connected_at: Utc::now(),
            delivered: 0,
            dropped: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue `frame` without waiting.
    pub fn offer(&mut self, frame: &OutboundFrame) -> Result<(), SessionSendError> {
        match self.outbox.try_send(Arc::clone(frame)) {
            Ok(()) => {
                self.delivered += 1;
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                Err(SessionSendError::Lagging)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SessionSendError::Closed),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            connected_at: self.connected_at,
            delivered: self.delivered,
            dropped: self.dropped,
        }
    }
}

/// What `/sessions` reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub connected_at: DateTime<Utc>,
    /// Frames queued for this session
    pub delivered: u64,
    /// Frames dropped because the session lagged
    pub dropped: u64,
}
