//! # Event Path Flows
//!
//! Monitoring events published by a simulated agent, through the bridge, to
//! registered sessions.
//!
//! ```text
//! SimulatedAgent ──<domain>.monitoring.*──→ InMemoryBroker ──→ bridge core ──→ sessions
//! ```

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use shared_types::{AgentId, EdgeId, MonitoringEvent};

    use mc_03_dashboard_bridge::{OutboundFrame, SessionId};
    use shared_bus::InMemoryBroker;
    use tokio::sync::mpsc;

    use crate::fixtures::{eventually, start_bridge, within, SimulatedAgent};

    fn parse(frame: &OutboundFrame) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    async fn next_frame(frames: &mut mpsc::Receiver<OutboundFrame>) -> Value {
        parse(&within(frames.recv()).await.unwrap())
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    #[tokio::test]
    async fn test_one_event_reaches_every_session_once() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;

        let mut sessions = Vec::new();
        for _ in 0..3 {
            sessions.push(
                bridge
                    .handle()
                    .open_session(SessionId::new(), 16)
                    .await
                    .unwrap(),
            );
        }

        agent.publish(&MonitoringEvent::registration(1)).await;

        for frames in sessions.iter_mut() {
            let frame = next_frame(frames).await;
            assert_eq!(frame["event"], "publish-event");
            assert_eq!(frame["data"]["type"], "AGENT_REGISTRATION");
        }

        // Everything queued has been processed once a query is answered.
        let status = bridge.handle().status().await.unwrap();
        assert_eq!(status.sessions, 3);
        for frames in sessions.iter_mut() {
            assert!(frames.try_recv().is_err());
        }

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_event_with_no_sessions_is_still_logged_and_reduced() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;

        agent.publish(&MonitoringEvent::registration(4)).await;

        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().events_received == 1 }
            })
            .await
        );
        let topology = handle.topology().await.unwrap();
        assert!(topology.contains_node(&AgentId::from(4)));

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_sessions_receive_events_in_publish_order() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        let mut frames = bridge
            .handle()
            .open_session(SessionId::new(), 64)
            .await
            .unwrap();

        for id in 0..20 {
            agent.publish(&MonitoringEvent::registration(id)).await;
        }
        for id in 0..20 {
            let frame = next_frame(&mut frames).await;
            assert_eq!(frame["data"]["payload"]["agent_id"], id);
        }

        let page = bridge.handle().messages(0, 100).await.unwrap();
        let indexes: Vec<u64> = page.events.iter().map(|e| e.index()).collect();
        assert_eq!(indexes, (0..20).collect::<Vec<_>>());

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_broadcast_carries_the_envelope_as_published() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        let mut frames = bridge
            .handle()
            .open_session(SessionId::new(), 4)
            .await
            .unwrap();

        let body = json!({
            "type": "AGENT_CONNECTION_MSG",
            "payload": {"parent": 1, "child": 2, "constraint": [[0, 1], [1, 0]], "agent_id": 1},
            "timestamp": 1700000000.25
        });
        agent
            .publish_raw("agent.1", body.to_string().as_bytes())
            .await;

        let frame = next_frame(&mut frames).await;
        assert_eq!(frame["data"], body);

        bridge.shutdown().await;
    }

    // =========================================================================
    // RESILIENCE
    // =========================================================================

    #[tokio::test]
    async fn test_malformed_payload_is_dropped_and_next_event_processed() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        let mut frames = bridge
            .handle()
            .open_session(SessionId::new(), 4)
            .await
            .unwrap();

        agent.publish_raw("agent", b"{\"type\": AGENT_REG").await;
        agent.publish(&MonitoringEvent::registration(9)).await;

        let frame = next_frame(&mut frames).await;
        assert_eq!(frame["data"]["payload"]["agent_id"], 9);

        let status = bridge.handle().status().await.unwrap();
        assert_eq!(status.events_received, 1);
        assert_eq!(status.quarantined, 1);
        assert_eq!(status.nodes, 1);

        let quarantined = bridge.handle().quarantine().await.unwrap();
        assert_eq!(quarantined[0].reason, "malformed");
        assert_eq!(quarantined[0].routing_key, "itest.monitoring.agent");

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_kinds_are_quarantined_and_still_relayed() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        let mut frames = bridge
            .handle()
            .open_session(SessionId::new(), 4)
            .await
            .unwrap();

        agent
            .publish_raw("agent", br#"{"type":"AGENT_TELEPORTED","payload":{}}"#)
            .await;
        agent
            .publish_raw("agent", br#"{"type":"AGENT_REGISTRATION","payload":{}}"#)
            .await;
        agent.publish(&MonitoringEvent::registration(1)).await;

        let mut kinds = Vec::new();
        for _ in 0..3 {
            let frame = next_frame(&mut frames).await;
            kinds.push(frame["data"]["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec!["AGENT_TELEPORTED", "AGENT_REGISTRATION", "AGENT_REGISTRATION"]
        );

        let reasons: Vec<&str> = bridge
            .handle()
            .quarantine()
            .await
            .unwrap()
            .iter()
            .map(|q| q.reason)
            .collect();
        assert_eq!(reasons, vec!["unknown_kind", "invalid_payload"]);

        let page = bridge.handle().messages(0, 10).await.unwrap();
        let decoded: Vec<bool> = page.events.iter().map(|e| e.kind().is_some()).collect();
        assert_eq!(decoded, vec![false, false, true]);
        assert_eq!(bridge.handle().topology().await.unwrap().nodes.len(), 1);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_session_does_not_stop_broadcast() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;

        let gone = bridge
            .handle()
            .open_session(SessionId::new(), 4)
            .await
            .unwrap();
        let mut alive = bridge
            .handle()
            .open_session(SessionId::new(), 4)
            .await
            .unwrap();
        drop(gone);

        agent.publish(&MonitoringEvent::registration(1)).await;
        agent.publish(&MonitoringEvent::registration(2)).await;

        next_frame(&mut alive).await;
        next_frame(&mut alive).await;
        assert_eq!(bridge.handle().sessions().await.unwrap().len(), 1);

        bridge.shutdown().await;
    }

    // =========================================================================
    // TOPOLOGY
    // =========================================================================

    #[tokio::test]
    async fn test_shutdown_keeps_incident_edge() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;

        for event in [
            MonitoringEvent::registration(1),
            MonitoringEvent::registration(2),
            MonitoringEvent::connection(1, 2, "c1"),
            MonitoringEvent::shutdown(1),
        ] {
            agent.publish(&event).await;
        }

        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().events_received == 4 }
            })
            .await
        );

        let topology = handle.topology().await.unwrap();
        let nodes: Vec<&AgentId> = topology.nodes.iter().map(|n| &n.id).collect();
        assert_eq!(nodes, vec![&AgentId::from(2)]);
        assert_eq!(topology.edges.len(), 1);
        let edge = &topology.edges[0];
        assert_eq!(edge.id, EdgeId::new(1, 2));
        assert_eq!(edge.from, AgentId::from(1));
        assert_eq!(edge.to, AgentId::from(2));
        assert_eq!(edge.constraint, json!("c1"));

        assert_eq!(handle.dangling_edges().await.unwrap().len(), 1);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_removes_edge_created_in_either_direction() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;

        for event in [
            MonitoringEvent::registration(1),
            MonitoringEvent::registration(2),
            MonitoringEvent::connection(2, 1, "c1"),
            MonitoringEvent::disconnection(1, 2),
        ] {
            agent.publish(&event).await;
        }

        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().events_received == 4 }
            })
            .await
        );
        let topology = handle.topology().await.unwrap();
        assert_eq!(topology.nodes.len(), 2);
        assert!(topology.edges.is_empty());

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_agent_disconnect_leaves_event_path_up() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        agent.publish(&MonitoringEvent::registration(1)).await;
        agent.disconnect().await;

        // The agent leaving does not affect the bridge's own queue.
        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.status().await.unwrap().nodes == 1 }
            })
            .await
        );
        assert!(handle.status().await.unwrap().event_path);

        bridge.shutdown().await;
    }
}
