//! Prometheus metrics for the dashboard bridge.
//!
//! All metrics follow the naming convention: `mc_<component>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., events_received_total)
//! - **Gauge**: Value that can go up or down (e.g., sessions_connected)
//! - **Histogram**: Distribution of values (e.g., event_relay_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT PATH (bus -> sessions)
    // =========================================================================

    /// Accepted monitoring events by kind
    pub static ref EVENTS_RECEIVED: CounterVec = CounterVec::new(
        Opts::new("mc_bridge_events_received_total", "Monitoring events accepted from the bus"),
        &["kind"]
    ).expect("metric creation failed");

    /// Bus messages that were not a JSON envelope
    pub static ref PARSE_FAILURES: Counter = Counter::new(
        "mc_bridge_parse_failures_total",
        "Bus messages dropped because they were not a valid envelope"
    ).expect("metric creation failed");

    /// Envelopes with an unknown kind or a payload that does not fit its kind
    pub static ref EVENTS_QUARANTINED: CounterVec = CounterVec::new(
        Opts::new("mc_bridge_events_quarantined_total", "Bus messages quarantined"),
        &["reason"]  // reason: malformed/unknown_kind/invalid_payload
    ).expect("metric creation failed");

    /// Time from delivery to broadcast
    pub static ref EVENT_RELAY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "mc_bridge_event_relay_duration_seconds",
            "Time spent logging, reducing and broadcasting one event"
        ).buckets(exponential_buckets(0.00001, 2.0, 16).expect("bucket creation failed"))
    ).expect("metric creation failed");

    // =========================================================================
    // COMMAND PATH (sessions -> bus)
    // =========================================================================

    /// Commands relayed to the bus
    pub static ref COMMANDS_RELAYED: CounterVec = CounterVec::new(
        Opts::new("mc_bridge_commands_relayed_total", "Dashboard commands relayed to the bus"),
        &["outcome"]  // outcome: published/failed
    ).expect("metric creation failed");

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Currently connected dashboard sessions
    pub static ref SESSIONS_CONNECTED: Gauge = Gauge::new(
        "mc_sessions_connected",
        "Number of connected dashboard sessions"
    ).expect("metric creation failed");

    /// Frames queued for sessions
    pub static ref BROADCAST_DELIVERIES: Counter = Counter::new(
        "mc_sessions_broadcast_deliveries_total",
        "Event frames handed to session outboxes"
    ).expect("metric creation failed");

    /// Failed session sends
    pub static ref SESSION_SEND_FAILURES: CounterVec = CounterVec::new(
        Opts::new("mc_sessions_send_failures_total", "Session sends that did not go through"),
        &["reason"]  // reason: lagging/closed/timeout
    ).expect("metric creation failed");

    // =========================================================================
    // TOPOLOGY AND LOG
    // =========================================================================

    pub static ref TOPOLOGY_NODES: Gauge = Gauge::new(
        "mc_topology_nodes",
        "Agents currently in the topology"
    ).expect("metric creation failed");

    pub static ref TOPOLOGY_EDGES: Gauge = Gauge::new(
        "mc_topology_edges",
        "Edges currently in the topology"
    ).expect("metric creation failed");

    pub static ref MESSAGE_LOG_SIZE: Gauge = Gauge::new(
        "mc_message_log_entries",
        "Events retained in the message log"
    ).expect("metric creation failed");

    pub static ref MESSAGE_LOG_EVICTIONS: Counter = Counter::new(
        "mc_message_log_evictions_total",
        "Events evicted from the message log for capacity"
    ).expect("metric creation failed");

    // =========================================================================
    // BROKER
    // =========================================================================

    /// Broker connection attempts
    pub static ref BUS_CONNECT_ATTEMPTS: CounterVec = CounterVec::new(
        Opts::new("mc_bus_connect_attempts_total", "Broker connection attempts"),
        &["outcome"]  // outcome: success/failed
    ).expect("metric creation failed");
}

/// Proof that the metrics are registered.
pub struct MetricsHandle {
    registry: Registry,
}

impl MetricsHandle {
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already registered metrics are skipped.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event path
        Box::new(EVENTS_RECEIVED.clone()),
        Box::new(PARSE_FAILURES.clone()),
        Box::new(EVENTS_QUARANTINED.clone()),
        Box::new(EVENT_RELAY_DURATION.clone()),
        // Command path
        Box::new(COMMANDS_RELAYED.clone()),
        // Sessions
        Box::new(SESSIONS_CONNECTED.clone()),
        Box::new(BROADCAST_DELIVERIES.clone()),
        Box::new(SESSION_SEND_FAILURES.clone()),
        // Topology and log
        Box::new(TOPOLOGY_NODES.clone()),
        Box::new(TOPOLOGY_EDGES.clone()),
        Box::new(MESSAGE_LOG_SIZE.clone()),
        Box::new(MESSAGE_LOG_EVICTIONS.clone()),
        // Broker
        Box::new(BUS_CONNECT_ATTEMPTS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        registry: REGISTRY.clone(),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}
