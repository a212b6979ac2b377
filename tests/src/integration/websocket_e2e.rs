//! # WebSocket End-to-End
//!
//! Real dashboard sockets against a started bridge:
//!
//! ```text
//! tungstenite client ⇄ ws server ⇄ bridge core ⇄ InMemoryBroker ⇄ SimulatedAgent
//! ```

#[cfg(test)]
mod tests {
    use futures::{SinkExt, StreamExt};
    use mc_03_dashboard_bridge::RunningBridge;
    use serde_json::Value;
    use shared_bus::InMemoryBroker;
    use shared_types::MonitoringEvent;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use crate::fixtures::{eventually, start_bridge, within, SimulatedAgent};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    /// Connect a dashboard and wait until the core has registered it.
    async fn dashboard(bridge: &RunningBridge, expected_sessions: usize) -> Client {
        let url = format!("ws://{}/", bridge.ws_addr());
        let (client, _) = connect_async(url.as_str()).await.unwrap();
        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.sessions().await.unwrap().len() == expected_sessions }
            })
            .await
        );
        client
    }

    /// Next text frame, parsed.
    async fn next_event(client: &mut Client) -> Value {
        loop {
            let message = within(client.next()).await.unwrap().unwrap();
            if let Ok(text) = message.to_text() {
                if !text.is_empty() {
                    return serde_json::from_str(text).unwrap();
                }
            }
        }
    }

    #[tokio::test]
    async fn test_dashboard_receives_published_events() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let agent = SimulatedAgent::connect(&broker).await;
        let mut first = dashboard(&bridge, 1).await;
        let mut second = dashboard(&bridge, 2).await;

        agent.publish(&MonitoringEvent::registration(12)).await;

        for client in [&mut first, &mut second] {
            let frame = next_event(client).await;
            assert_eq!(frame["event"], "publish-event");
            assert_eq!(frame["data"]["type"], "AGENT_REGISTRATION");
            assert_eq!(frame["data"]["payload"]["agent_id"], 12);
        }

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_dashboard_command_reaches_factory_unchanged() {
        let broker = InMemoryBroker::new();
        let factory = SimulatedAgent::connect(&broker).await;
        let mut commands = factory.commands().await;
        let bridge = start_bridge(&broker).await;
        let mut client = dashboard(&bridge, 1).await;

        let data = r#"{"type":"REQUEST_AGENT_REPORT",  "agent_id":7}"#;
        let frame = format!(r#"{{"event":"dashboard-command","data":{}}}"#, data);
        client.send(Message::text(frame)).await.unwrap();

        let delivery = within(commands.next()).await.unwrap().unwrap();
        assert_eq!(delivery.routing_key, "itest.command.dashboard");
        assert_eq!(delivery.body, data.as_bytes());

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_bad_frames_are_ignored_and_session_stays_open() {
        let broker = InMemoryBroker::new();
        let factory = SimulatedAgent::connect(&broker).await;
        let mut commands = factory.commands().await;
        let bridge = start_bridge(&broker).await;
        let mut client = dashboard(&bridge, 1).await;

        client.send(Message::text("hello")).await.unwrap();
        client
            .send(Message::text(r#"{"event":"chat","data":{"type":"ADD_AGENT"}}"#))
            .await
            .unwrap();
        client
            .send(Message::text(r#"{"event":"dashboard-command"}"#))
            .await
            .unwrap();
        client
            .send(Message::text(
                r#"{"event":"dashboard-command","data":{"type":"SAVE_SIMULATION"}}"#,
            ))
            .await
            .unwrap();

        // Only the well-formed command is relayed.
        let delivery = within(commands.next()).await.unwrap().unwrap();
        assert_eq!(delivery.body, br#"{"type":"SAVE_SIMULATION"}"#.to_vec());

        factory.publish(&MonitoringEvent::registration(1)).await;
        let frame = next_event(&mut client).await;
        assert_eq!(frame["data"]["payload"]["agent_id"], 1);
        assert_eq!(bridge.handle().sessions().await.unwrap().len(), 1);

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnect_removes_session() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let mut client = dashboard(&bridge, 1).await;

        client.close(None).await.unwrap();

        let handle = bridge.handle().clone();
        assert!(
            eventually(|| {
                let handle = handle.clone();
                async move { handle.sessions().await.unwrap().is_empty() }
            })
            .await
        );

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_dashboards() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;
        let mut client = dashboard(&bridge, 1).await;

        within(bridge.shutdown()).await;

        let closed = within(async {
            loop {
                match client.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return true,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed);
    }
}
