//! Configuration from the environment.
//!
//! Starts from [`BridgeConfig::default`] and applies overrides. The first four
//! names are the ones existing deployments already set:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AMQP_BROKER_URL` | broker host, or the full URL when it contains `://` |
//! | `AMQP_BROKER_PORT` | broker port |
//! | `SOCKET_PORT` | WebSocket port |
//! | `DOMAIN` | exchange/routing key prefix |
//! | `MC_BROKER_VHOST`, `MC_BROKER_USER`, `MC_BROKER_PASSWORD` | broker login |
//! | `MC_CONNECT_ATTEMPTS`, `MC_CONNECT_BACKOFF`, `MC_CONNECT_MAX_BACKOFF` | connect retry |
//! | `MC_WS_HOST`, `MC_SESSION_BUFFER`, `MC_SEND_TIMEOUT`, `MC_MAX_FRAME_SIZE` | sessions |
//! | `MC_ADMIN_HOST`, `MC_ADMIN_PORT`, `MC_ADMIN_ENABLED`, `MC_MAX_PAGE_SIZE` | admin API |
//! | `MC_INPUT_BUFFER`, `MC_MESSAGE_LOG_CAPACITY`, `MC_QUARANTINE_CAPACITY` | core |
//! | `MC_OFFLINE` | use the in-process broker |

use std::str::FromStr;
use std::time::Duration;

use mc_03_dashboard_bridge::domain::parse_duration;
use mc_03_dashboard_bridge::{BridgeConfig, ConfigError};
use tracing::{info, warn};

/// Everything the runtime needs to start.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub bridge: BridgeConfig,
    /// Run against the in-process broker.
    pub offline: bool,
}

/// Load `.env` (if present), then read the process environment.
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        info!(path = %path.display(), "Loaded .env");
    }
    load_config_from(|key| std::env::var(key).ok())
}

/// Build the configuration from `lookup` and validate it.
pub fn load_config_from<F>(lookup: F) -> Result<RuntimeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env(lookup);
    let mut config = BridgeConfig::default();

    if let Some(broker) = env.string("AMQP_BROKER_URL") {
        if broker.contains("://") {
            config.broker.url = Some(broker);
        } else {
            config.broker.host = broker;
        }
    }
    env.parse("AMQP_BROKER_PORT", &mut config.broker.port)?;
    env.parse("SOCKET_PORT", &mut config.websocket.port)?;
    match env.string("DOMAIN") {
        Some(domain) => config.bus.domain = domain,
        None => warn!(
            domain = %config.bus.domain,
            "DOMAIN not set; using the default"
        ),
    }

    if let Some(vhost) = env.string("MC_BROKER_VHOST") {
        config.broker.vhost = Some(vhost);
    }
    if let Some(user) = env.string("MC_BROKER_USER") {
        config.broker.username = Some(user);
    }
    if let Some(password) = env.string("MC_BROKER_PASSWORD") {
        config.broker.password = Some(password);
    }
    env.parse("MC_CONNECT_ATTEMPTS", &mut config.broker.connect_attempts)?;
    env.duration("MC_CONNECT_BACKOFF", &mut config.broker.initial_backoff)?;
    env.duration("MC_CONNECT_MAX_BACKOFF", &mut config.broker.max_backoff)?;

    env.parse("MC_WS_HOST", &mut config.websocket.host)?;
    env.parse("MC_SESSION_BUFFER", &mut config.websocket.session_buffer)?;
    env.duration("MC_SEND_TIMEOUT", &mut config.websocket.send_timeout)?;
    env.parse("MC_MAX_FRAME_SIZE", &mut config.websocket.max_frame_size)?;

    env.parse("MC_ADMIN_HOST", &mut config.admin.host)?;
    env.parse("MC_ADMIN_PORT", &mut config.admin.port)?;
    env.parse("MC_ADMIN_ENABLED", &mut config.admin.enabled)?;
    env.parse("MC_MAX_PAGE_SIZE", &mut config.admin.max_page_size)?;

    env.parse("MC_INPUT_BUFFER", &mut config.core.input_buffer)?;
    env.parse("MC_MESSAGE_LOG_CAPACITY", &mut config.core.message_log_capacity)?;
    env.parse("MC_QUARANTINE_CAPACITY", &mut config.core.quarantine_capacity)?;

    let mut offline = false;
    env.parse("MC_OFFLINE", &mut offline)?;

    config.validate()?;
    Ok(RuntimeConfig {
        bridge: config,
        offline,
    })
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set, non-empty value.
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.string(key) {
            *target = value.parse().map_err(|_| invalid(key, &value))?;
        }
        Ok(())
    }

    fn duration(&self, key: &str, target: &mut Duration) -> Result<(), ConfigError> {
        if let Some(value) = self.string(key) {
            *target = parse_duration(&value).map_err(|_| invalid(key, &value))?;
        }
        Ok(())
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        key: key.to_string(),
        value: value.to_string(),
    }
}
