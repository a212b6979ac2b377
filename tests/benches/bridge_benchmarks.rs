//! # Bridge Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | mc-01 Topology | replay of a registration/connection stream |
//! | mc-02 Message Log | append at capacity (evicting) |
//! | mc-03 Dashboard Bridge | one bus delivery through parse, log, reduce and fan-out |

use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mc_01_topology::replay;
use mc_02_message_log::MessageLog;
use mc_03_dashboard_bridge::adapters::CommandPublisher;
use mc_03_dashboard_bridge::domain::CoreConfig;
use mc_03_dashboard_bridge::{BridgeCore, SessionId};
use shared_types::{BusTopology, MonitoringEvent};
use tokio::sync::mpsc;

/// Registrations for `agents` ids, then a chain of connections between them.
fn chain_events(agents: i64) -> Vec<MonitoringEvent> {
    let mut events: Vec<MonitoringEvent> =
        (0..agents).map(MonitoringEvent::registration).collect();
    events.extend((1..agents).map(|id| MonitoringEvent::connection(id - 1, id, "c")));
    events
}

// ============================================================================
// MC-01: Topology replay
// ============================================================================

fn bench_topology_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-01-topology");

    for agents in [10i64, 100, 1000] {
        let events = chain_events(agents);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::new("replay", agents), &events, |b, events| {
            b.iter(|| black_box(replay(events.iter())))
        });
    }

    group.finish();
}

// ============================================================================
// MC-02: Message log append
// ============================================================================

fn bench_message_log_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-02-message-log");
    let event = MonitoringEvent::registration(1);
    let envelope = event.to_envelope();
    let raw = serde_json::value::to_raw_value(&envelope).unwrap_or_default();
    let kind = Some(event.kind());

    group.bench_function("append_evicting", |b| {
        let mut log = MessageLog::with_capacity(1_000);
        for _ in 0..1_000 {
            log.append(
                kind,
                envelope.clone(),
                raw.clone(),
                "bench.monitoring.agent",
                Utc::now(),
            );
        }
        b.iter(|| {
            black_box(log.append(
                kind,
                envelope.clone(),
                raw.clone(),
                "bench.monitoring.agent",
                Utc::now(),
            ))
        })
    });

    group.finish();
}

// ============================================================================
// MC-03: Bus delivery through the core
// ============================================================================

fn bench_bus_delivery(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-03-dashboard-bridge");
    group.measurement_time(Duration::from_secs(5));

    let topology = BusTopology::for_domain("bench");
    let body = MonitoringEvent::connection(1, 2, "c")
        .to_envelope()
        .to_vec()
        .unwrap_or_default();

    for sessions in [0usize, 10, 100] {
        let mut core = BridgeCore::new(
            &CoreConfig::default(),
            CommandPublisher::unavailable(&topology),
        );
        // Receivers stay alive; full outboxes only count as lagging.
        let mut receivers = Vec::with_capacity(sessions);
        for _ in 0..sessions {
            let (tx, rx) = mpsc::channel(64);
            core.open_session(SessionId::new(), tx);
            receivers.push(rx);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("handle_bus_delivery", sessions),
            &body,
            |b, body| {
                b.iter(|| {
                    black_box(core.handle_bus_delivery(
                        "bench.monitoring.agent",
                        body,
                        Utc::now(),
                    ))
                })
            },
        );
        drop(receivers);
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_topology_replay,
    bench_message_log_append,
    bench_bus_delivery
);
criterion_main!(benches);
