//! Inputs to the bridge core and the handle used to send them.

use chrono::{DateTime, Utc};
use mc_01_topology::{Edge, TopologyState};
use mc_02_message_log::{LoggedEvent, QuarantinedMessage};
use serde::Serialize;
use serde_json::value::RawValue;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{BridgeError, OutboundFrame, SessionId, SessionInfo};

/// Everything the core reacts to.
#[derive(Debug)]
pub enum BridgeInput {
    SessionOpened {
        id: SessionId,
        outbox: mpsc::Sender<OutboundFrame>,
    },
    SessionClosed {
        id: SessionId,
    },
    /// `dashboard-command` data, exactly as the session sent it.
    Command {
        session: SessionId,
        data: Box<RawValue>,
    },
    BusDelivery {
        routing_key: String,
        body: Vec<u8>,
        received_at: DateTime<Utc>,
    },
    /// The monitoring consumer stopped; no more deliveries will arrive.
    EventPathDown {
        reason: String,
    },
    Query(Query),
}

/// Read-only questions answered from the core's state.
#[derive(Debug)]
pub enum Query {
    Topology(oneshot::Sender<TopologyState>),
    Dangling(oneshot::Sender<Vec<Edge>>),
    Messages {
        offset: u64,
        limit: usize,
        reply: oneshot::Sender<MessagePage>,
    },
    Message {
        index: u64,
        reply: oneshot::Sender<Option<LoggedEvent>>,
    },
    Quarantine(oneshot::Sender<Vec<QuarantinedMessage>>),
    Sessions(oneshot::Sender<Vec<SessionInfo>>),
    Status(oneshot::Sender<BridgeStatus>),
}

/// One page of the message log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePage {
    pub offset: u64,
    /// Oldest index still retained
    pub first_index: u64,
    pub total_received: u64,
    pub events: Vec<LoggedEvent>,
}

/// Snapshot for `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgeStatus {
    pub event_path: bool,
    pub command_path: bool,
    pub sessions: usize,
    pub nodes: usize,
    pub edges: usize,
    pub events_received: u64,
    pub events_retained: usize,
    pub quarantined: u64,
}

impl BridgeStatus {
    /// Both bus directions are up.
    pub fn is_healthy(&self) -> bool {
        self.event_path && self.command_path
    }
}

/// Cloneable sender side of the core's input queue.
///
/// Every send waits while the queue is full.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    inputs: mpsc::Sender<BridgeInput>,
}

impl BridgeHandle {
    pub fn new(inputs: mpsc::Sender<BridgeInput>) -> Self {
        Self { inputs }
    }

    pub async fn send(&self, input: BridgeInput) -> Result<(), BridgeError> {
        self.inputs
            .send(input)
            .await
            .map_err(|_| BridgeError::CoreStopped)
    }

    /// Register a session and get the receiving end of its outbox.
    pub async fn open_session(
        &self,
        id: SessionId,
        buffer: usize,
    ) -> Result<mpsc::Receiver<OutboundFrame>, BridgeError> {
        let (outbox, frames) = mpsc::channel(buffer.max(1));
        self.send(BridgeInput::SessionOpened { id, outbox }).await?;
        Ok(frames)
    }

    pub async fn close_session(&self, id: SessionId) -> Result<(), BridgeError> {
        self.send(BridgeInput::SessionClosed { id }).await
    }

    pub async fn command(&self, session: SessionId, data: Box<RawValue>) -> Result<(), BridgeError> {
        self.send(BridgeInput::Command { session, data }).await
    }

    pub async fn deliver(&self, routing_key: String, body: Vec<u8>) -> Result<(), BridgeError> {
        self.send(BridgeInput::BusDelivery {
            routing_key,
            body,
            received_at: Utc::now(),
        })
        .await
    }

    pub async fn event_path_down(&self, reason: impl Into<String>) -> Result<(), BridgeError> {
        self.send(BridgeInput::EventPathDown {
            reason: reason.into(),
        })
        .await
    }

    pub async fn topology(&self) -> Result<TopologyState, BridgeError> {
        self.ask(Query::Topology).await
    }

    pub async fn dangling_edges(&self) -> Result<Vec<Edge>, BridgeError> {
        self.ask(Query::Dangling).await
    }

    pub async fn messages(&self, offset: u64, limit: usize) -> Result<MessagePage, BridgeError> {
        self.ask(|reply| Query::Messages {
            offset,
            limit,
            reply,
        })
        .await
    }

    pub async fn message(&self, index: u64) -> Result<Option<LoggedEvent>, BridgeError> {
        self.ask(|reply| Query::Message { index, reply }).await
    }

    pub async fn quarantine(&self) -> Result<Vec<QuarantinedMessage>, BridgeError> {
        self.ask(Query::Quarantine).await
    }

    pub async fn sessions(&self) -> Result<Vec<SessionInfo>, BridgeError> {
        self.ask(Query::Sessions).await
    }

    pub async fn status(&self) -> Result<BridgeStatus, BridgeError> {
        self.ask(Query::Status).await
    }

    async fn ask<T>(&self, query: impl FnOnce(oneshot::Sender<T>) -> Query) -> Result<T, BridgeError> {
        let (reply, answer) = oneshot::channel();
        self.send(BridgeInput::Query(query(reply))).await?;
        answer.await.map_err(|_| BridgeError::CoreStopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_after_core_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = BridgeHandle::new(tx);
        assert!(matches!(
            handle.close_session(SessionId::new()).await,
            Err(BridgeError::CoreStopped)
        ));
        assert!(matches!(handle.status().await, Err(BridgeError::CoreStopped)));
    }

    #[tokio::test]
    async fn test_unanswered_query_reports_core_stopped() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = BridgeHandle::new(tx);
        let drain = tokio::spawn(async move {
            // Receive the query and drop its reply sender.
            let _ = rx.recv().await;
        });
        assert!(matches!(handle.topology().await, Err(BridgeError::CoreStopped)));
        drain.await.unwrap();
    }
}
