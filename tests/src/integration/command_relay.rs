//! # Command Path Flows
//!
//! Dashboard commands handed to the bridge core arrive on the command routing
//! key exactly as the session sent them.

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use mc_03_dashboard_bridge::SessionId;
    use serde_json::value::RawValue;
    use shared_bus::InMemoryBroker;
    use shared_types::DashboardCommand;

    use crate::fixtures::{start_bridge, within, SimulatedAgent};

    fn raw(text: &str) -> Box<RawValue> {
        RawValue::from_string(text.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_command_bytes_relayed_unchanged() {
        let broker = InMemoryBroker::new();
        let factory = SimulatedAgent::connect(&broker).await;
        let mut commands = factory.commands().await;
        let bridge = start_bridge(&broker).await;

        // Odd spacing and an unknown field must survive untouched.
        let text = r#"{ "type" : "ADD_AGENT", "num_agents":3, "note":"x" }"#;
        bridge
            .handle()
            .command(SessionId::new(), raw(text))
            .await
            .unwrap();

        let delivery = within(commands.next()).await.unwrap().unwrap();
        assert_eq!(delivery.routing_key, "itest.command.dashboard");
        assert_eq!(delivery.exchange, "itest.ddcop");
        assert_eq!(delivery.body, text.as_bytes());

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_every_command_kind_is_relayed_in_order() {
        let broker = InMemoryBroker::new();
        let factory = SimulatedAgent::connect(&broker).await;
        let mut commands = factory.commands().await;
        let bridge = start_bridge(&broker).await;
        let session = SessionId::new();

        let sent = vec![
            DashboardCommand::Test {
                message: Some("this is a test command".into()),
            },
            DashboardCommand::AddAgent { num_agents: 2 },
            DashboardCommand::RemoveAgent { num_agents: 1 },
            DashboardCommand::ChangeConstraint { num_agents: 1 },
            DashboardCommand::RequestAgentReport { agent_id: 3.into() },
            DashboardCommand::SaveSimulation,
            DashboardCommand::PlaySimulation {
                simulation: serde_json::json!({"filename": "run-1.json"}),
            },
            DashboardCommand::SaveMetrics,
        ];
        for command in &sent {
            let text = String::from_utf8(command.to_vec()).unwrap();
            bridge.handle().command(session, raw(&text)).await.unwrap();
        }

        for command in &sent {
            let delivery = within(commands.next()).await.unwrap().unwrap();
            assert_eq!(delivery.body, command.to_vec());
            assert_eq!(
                DashboardCommand::peek_kind(&delivery.body).as_deref(),
                Some(command.kind())
            );
        }

        bridge.shutdown().await;
    }

    #[tokio::test]
    async fn test_commands_without_a_listener_are_dropped_quietly() {
        let broker = InMemoryBroker::new();
        let bridge = start_bridge(&broker).await;

        bridge
            .handle()
            .command(SessionId::new(), raw(r#"{"type":"SAVE_METRICS"}"#))
            .await
            .unwrap();

        // Still healthy: unroutable publishes are not failures.
        let status = bridge.handle().status().await.unwrap();
        assert!(status.is_healthy());

        bridge.shutdown().await;
    }
}
