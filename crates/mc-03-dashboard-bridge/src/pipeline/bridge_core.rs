//! # Bridge Core
//!
//! The single task that owns the topology, the message log, the quarantine
//! and the session set. Everything else talks to it through [`BridgeHandle`],
//! so inputs are processed strictly one at a time in arrival order.
//!
//! ## Event path
//!
//! ```text
//! delivery ─→ parse ─→ decode ─→ log ─→ reduce ─→ broadcast
//!               │         │        ▲
//!               │         └────────┤ (undecoded: not reduced)
//!               └────┬────┘        │
//!                quarantine ───────┘
//! ```
//!
//! Anything that parses as an envelope is logged and broadcast, whatever its
//! kind. Only envelopes that decode into a known event reach the reducer;
//! the rest are also quarantined. Bodies that are not an envelope at all are
//! quarantined and dropped.
//!
//! Every session receives envelopes in log order. A session whose outbox is
//! full misses that frame; a closed session is removed.
//!
//! [`BridgeHandle`]: super::BridgeHandle

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mascoord_telemetry::metrics::{
    BROADCAST_DELIVERIES, COMMANDS_RELAYED, EVENTS_QUARANTINED, EVENTS_RECEIVED,
    EVENT_RELAY_DURATION, MESSAGE_LOG_EVICTIONS, MESSAGE_LOG_SIZE, PARSE_FAILURES,
    SESSIONS_CONNECTED, SESSION_SEND_FAILURES, TOPOLOGY_EDGES, TOPOLOGY_NODES,
};
use mascoord_telemetry::{log_event, log_session_event, metric_inc, HistogramTimer};
use mc_01_topology::{TopologyState, Transition};
use mc_02_message_log::{MessageLog, Quarantine};
use shared_types::{DashboardCommand, Envelope, EnvelopeError, EventKind, MonitoringEvent};
use tokio::sync::{mpsc, watch};

use super::input::{BridgeInput, BridgeStatus, MessagePage, Query};
use crate::adapters::CommandPublisher;
use crate::domain::{
    embeddable_body, event_frame, BridgeError, CoreConfig, OutboundFrame, Session, SessionId, SessionSendError,
};

const COMPONENT: &str = "bridge-core";

/// Fan-out result for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub lagging: usize,
    pub closed: usize,
}

/// An envelope that was logged and broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReport {
    pub log_index: u64,
    /// `None` when the envelope did not decode into a known event.
    pub kind: Option<EventKind>,
    pub transition: Transition,
    pub broadcast: BroadcastReport,
}

/// What happened to one bus delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Decoded, logged, reduced and broadcast.
    Relayed(RelayReport),
    /// Logged and broadcast, but not a known event: quarantined, not reduced.
    Quarantined(RelayReport, EnvelopeError),
    /// Not a JSON envelope at all.
    Dropped(EnvelopeError),
}

pub struct BridgeCore {
    topology: TopologyState,
    log: MessageLog,
    quarantine: Quarantine,
    sessions: BTreeMap<SessionId, Session>,
    publisher: CommandPublisher,
    event_path: bool,
}

impl BridgeCore {
    pub fn new(config: &CoreConfig, publisher: CommandPublisher) -> Self {
        Self {
            topology: TopologyState::new(),
            log: MessageLog::with_capacity(config.message_log_capacity),
            quarantine: Quarantine::with_capacity(config.quarantine_capacity),
            sessions: BTreeMap::new(),
            publisher,
            event_path: true,
        }
    }

    /// Mark the event path as unavailable from the start.
    pub fn without_event_path(mut self) -> Self {
        self.event_path = false;
        self
    }

    pub fn topology(&self) -> &TopologyState {
        &self.topology
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn status(&self) -> BridgeStatus {
        BridgeStatus {
            event_path: self.event_path,
            command_path: self.publisher.is_available(),
            sessions: self.sessions.len(),
            nodes: self.topology.nodes.len(),
            edges: self.topology.edges.len(),
            events_received: self.log.total_received(),
            events_retained: self.log.len(),
            quarantined: self.quarantine.total(),
        }
    }

    /// Process inputs until shutdown is signalled or every handle is gone.
    ///
    /// Dropping the core closes every session outbox.
    pub async fn run(
        mut self,
        mut inputs: mpsc::Receiver<BridgeInput>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        log_event!(info, COMPONENT, "Bridge core started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                input = inputs.recv() => match input {
                    Some(input) => self.handle(input).await,
                    None => break,
                },
            }
        }
        log_event!(
            info,
            COMPONENT,
            "Bridge core stopped",
            sessions = self.sessions.len(),
            events_received = self.log.total_received()
        );
        SESSIONS_CONNECTED.set(0.0);
    }

    pub async fn handle(&mut self, input: BridgeInput) {
        match input {
            BridgeInput::SessionOpened { id, outbox } => self.open_session(id, outbox),
            BridgeInput::SessionClosed { id } => self.close_session(id),
            BridgeInput::Command { session, data } => {
                // Failures are logged inside; the session is not told.
                let _ = self.handle_command(session, data.get().as_bytes()).await;
            }
            BridgeInput::BusDelivery {
                routing_key,
                body,
                received_at,
            } => {
                self.handle_bus_delivery(&routing_key, &body, received_at);
            }
            BridgeInput::EventPathDown { reason } => {
                self.event_path = false;
                log_event!(warn, COMPONENT, "Event path disabled", reason = %reason);
            }
            BridgeInput::Query(query) => self.answer(query),
        }
    }

    pub fn open_session(&mut self, id: SessionId, outbox: mpsc::Sender<OutboundFrame>) {
        self.sessions.insert(id, Session::new(id, outbox));
        SESSIONS_CONNECTED.set(self.sessions.len() as f64);
        log_session_event!(info, "Session opened", id, sessions = self.sessions.len());
    }

    pub fn close_session(&mut self, id: SessionId) {
        if let Some(session) = self.sessions.remove(&id) {
            SESSIONS_CONNECTED.set(self.sessions.len() as f64);
            let info = session.info();
            log_session_event!(
                info,
                "Session closed",
                id,
                delivered = info.delivered,
                dropped = info.dropped
            );
        }
    }

    /// Relay a session's command to the bus, bytes unchanged.
    pub async fn handle_command(&mut self, session: SessionId, body: &[u8]) -> Result<(), BridgeError> {
        let kind = DashboardCommand::peek_kind(body);
        match self.publisher.publish(body).await {
            Ok(()) => {
                metric_inc!(COMMANDS_RELAYED, &["published"]);
                log_session_event!(
                    info,
                    "Command relayed",
                    session,
                    command = kind.as_deref().unwrap_or("?"),
                    routing_key = %self.publisher.routing_key()
                );
                Ok(())
            }
            Err(e) => {
                metric_inc!(COMMANDS_RELAYED, &["failed"]);
                log_session_event!(
                    warn,
                    "Command not relayed",
                    session,
                    command = kind.as_deref().unwrap_or("?"),
                    error = %e
                );
                Err(e)
            }
        }
    }

    /// Run one bus delivery through the event path.
    pub fn handle_bus_delivery(
        &mut self,
        routing_key: &str,
        body: &[u8],
        received_at: DateTime<Utc>,
    ) -> RelayOutcome {
        let _timer = HistogramTimer::new(&EVENT_RELAY_DURATION);

        let parsed = Envelope::from_slice(body).and_then(|envelope| {
            embeddable_body(body, &envelope)
                .map(|raw| (envelope, raw))
                .ok_or_else(|| EnvelopeError::Malformed("body cannot be embedded".into()))
        });
        let (envelope, raw) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                metric_inc!(PARSE_FAILURES);
                metric_inc!(EVENTS_QUARANTINED, &[e.reason()]);
                log_event!(
                    warn,
                    COMPONENT,
                    "Dropping unparseable bus message",
                    routing_key = %routing_key,
                    bytes = body.len(),
                    error = %e
                );
                self.quarantine.admit(routing_key, &e, body, received_at);
                return RelayOutcome::Dropped(e);
            }
        };

        let decoded = MonitoringEvent::from_envelope(&envelope);
        if let Err(e) = &decoded {
            metric_inc!(EVENTS_QUARANTINED, &[e.reason()]);
            log_event!(
                warn,
                COMPONENT,
                "Quarantined bus message; relaying it undecoded",
                routing_key = %routing_key,
                kind = %envelope.kind,
                error = %e
            );
            self.quarantine.admit(routing_key, e, body, received_at);
        }
        let kind = decoded.as_ref().ok().map(MonitoringEvent::kind);

        // Serialised once, shared by every session.
        let frame = event_frame(&raw);

        let appended = self.log.append(kind, envelope, raw, routing_key, received_at);
        metric_inc!(EVENTS_RECEIVED, &[kind.map_or("undecoded", |k| k.as_str())]);
        MESSAGE_LOG_SIZE.set(self.log.len() as f64);
        if appended.evicted {
            metric_inc!(MESSAGE_LOG_EVICTIONS);
        }

        let transition = match &decoded {
            Ok(event) => {
                let (topology, transition) = std::mem::take(&mut self.topology).apply(event);
                self.topology = topology;
                if transition.changed_graph() {
                    TOPOLOGY_NODES.set(self.topology.nodes.len() as f64);
                    TOPOLOGY_EDGES.set(self.topology.edges.len() as f64);
                }
                transition
            }
            Err(_) => Transition::Unchanged,
        };

        let broadcast = self.broadcast(&frame);

        log_event!(
            debug,
            COMPONENT,
            "Event relayed",
            index = appended.index,
            kind = ?kind,
            transition = ?transition,
            delivered = broadcast.delivered,
            lagging = broadcast.lagging
        );

        let report = RelayReport {
            log_index: appended.index,
            kind,
            transition,
            broadcast,
        };
        match decoded {
            Ok(_) => RelayOutcome::Relayed(report),
            Err(e) => RelayOutcome::Quarantined(report, e),
        }
    }

    /// Offer `frame` to every session; closed sessions are removed.
    pub fn broadcast(&mut self, frame: &OutboundFrame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut gone = Vec::new();

        for (id, session) in self.sessions.iter_mut() {
            match session.offer(frame) {
                Ok(()) => report.delivered += 1,
                Err(e @ SessionSendError::Lagging) => {
                    report.lagging += 1;
                    metric_inc!(SESSION_SEND_FAILURES, &[e.label()]);
                    log_session_event!(debug, "Session lagging; frame dropped", id);
                }
                Err(e) => {
                    report.closed += 1;
                    metric_inc!(SESSION_SEND_FAILURES, &[e.label()]);
                    gone.push(*id);
                }
            }
        }

        BROADCAST_DELIVERIES.inc_by(report.delivered as f64);
        for id in gone {
            self.close_session(id);
        }
        report
    }

    fn answer(&self, query: Query) {
        // A dropped reply means the asker gave up; nothing to do.
        match query {
            Query::Topology(reply) => {
                let _ = reply.send(self.topology.clone());
            }
            Query::Dangling(reply) => {
                let dangling = self.topology.dangling_edges().into_iter().cloned().collect();
                let _ = reply.send(dangling);
            }
            Query::Messages {
                offset,
                limit,
                reply,
            } => {
                let events = self
                    .log
                    .range(offset, limit)
                    .into_iter()
                    .map(|event| event.as_ref().clone())
                    .collect();
                let _ = reply.send(MessagePage {
                    offset,
                    first_index: self.log.first_index(),
                    total_received: self.log.total_received(),
                    events,
                });
            }
            Query::Message { index, reply } => {
                let _ = reply.send(self.log.get(index).map(|event| event.as_ref().clone()));
            }
            Query::Quarantine(reply) => {
                let _ = reply.send(self.quarantine.entries().cloned().collect());
            }
            Query::Sessions(reply) => {
                let _ = reply.send(self.sessions.values().map(Session::info).collect());
            }
            Query::Status(reply) => {
                let _ = reply.send(self.status());
            }
        }
    }
}
