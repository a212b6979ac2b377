//! Bridge configuration with validation.

use serde::{Deserialize, Serialize};
use shared_types::BusTopology;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Broker connection
    pub broker: BrokerConfig,
    /// Exchange naming
    pub bus: BusConfig,
    /// Dashboard session server
    pub websocket: WebSocketConfig,
    /// Inspection API (localhost only by default)
    pub admin: AdminConfig,
    /// Core loop buffers and retention
    pub core: CoreConfig,
}

impl BridgeConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.enabled && self.admin.port != 0 && self.admin.port == self.websocket.port {
            return Err(ConfigError::DuplicatePorts);
        }

        let domain = &self.bus.domain;
        if domain.is_empty() || domain.contains(['#', '*', ' ']) {
            return Err(ConfigError::InvalidDomain(domain.clone()));
        }

        if self.broker.connect_attempts == 0 {
            return Err(ConfigError::InvalidLimit(
                "connect_attempts cannot be 0".into(),
            ));
        }

        if self.websocket.session_buffer == 0 {
            return Err(ConfigError::InvalidLimit("session_buffer cannot be 0".into()));
        }

        if self.websocket.max_frame_size == 0 {
            return Err(ConfigError::InvalidLimit("max_frame_size cannot be 0".into()));
        }

        if self.core.input_buffer == 0 {
            return Err(ConfigError::InvalidLimit("input_buffer cannot be 0".into()));
        }

        if self.core.message_log_capacity == 0 {
            return Err(ConfigError::InvalidLimit(
                "message_log_capacity cannot be 0".into(),
            ));
        }

        if self.websocket.send_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "send_timeout cannot be 0".into(),
            ));
        }

        if self.broker.initial_backoff > self.broker.max_backoff {
            return Err(ConfigError::InvalidTimeout(
                "initial_backoff exceeds max_backoff".into(),
            ));
        }

        Ok(())
    }

    /// Exchange, routing keys and binding pattern for the configured domain.
    pub fn topology(&self) -> BusTopology {
        BusTopology::for_domain(&self.bus.domain)
    }

    /// Get WebSocket server bind address
    pub fn ws_addr(&self) -> SocketAddr {
        SocketAddr::new(self.websocket.host, self.websocket.port)
    }

    /// Get Admin server bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }
}

/// AMQP broker connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Full `amqp://` URL; overrides the individual fields when set
    pub url: Option<String>,
    /// Broker host
    pub host: String,
    /// Broker port (default: 5672)
    pub port: u16,
    /// Virtual host (`None` = broker default)
    pub vhost: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Connection attempts before giving up
    pub connect_attempts: u32,
    /// Delay before the second attempt; doubles per attempt
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Upper bound on the delay between attempts
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5672,
            vhost: None,
            username: None,
            password: None,
            connect_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl BrokerConfig {
    /// AMQP URL to connect to.
    pub fn endpoint(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (Some(user), None) => format!("{}@", user),
            _ => String::new(),
        };
        let vhost = match self.vhost.as_deref() {
            Some("/") => "/%2f".to_string(),
            Some(v) => format!("/{}", v.trim_start_matches('/')),
            None => String::new(),
        };
        format!("amqp://{}{}:{}{}", credentials, self.host, self.port, vhost)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Exchange naming
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Deployment domain; prefixes every exchange and routing key
    pub domain: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            domain: "mascoord".to_string(),
        }
    }
}

/// WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
    /// Frames queued per session before deliveries to it are dropped
    pub session_buffer: usize,
    /// A socket write taking longer than this closes the session
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
    /// Largest inbound frame accepted, in bytes
    pub max_frame_size: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
            session_buffer: 256,
            send_timeout: Duration::from_secs(5),
            max_frame_size: 1024 * 1024,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 8081)
    pub port: u16,
    /// Enable admin server
    pub enabled: bool,
    /// Largest page `/messages` returns
    pub max_page_size: usize,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8081,
            enabled: true,
            max_page_size: 500,
        }
    }
}

/// Core loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Inputs queued for the core before producers wait
    pub input_buffer: usize,
    /// Events retained by the message log
    pub message_log_capacity: usize,
    /// Rejected bus messages retained for inspection
    pub quarantine_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            input_buffer: 1024,
            message_log_capacity: mc_02_message_log::DEFAULT_LOG_CAPACITY,
            quarantine_capacity: mc_02_message_log::DEFAULT_QUARANTINE_CAPACITY,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// WebSocket and admin servers on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Domain unusable as a routing key prefix
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// Value that could not be parsed from the environment
    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse `500ms`, `5s`, `2m` or plain seconds.
pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
    let s = s.trim();
    // `ms` before `s`: "500ms" also ends in 's'.
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| "invalid milliseconds")
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| "invalid seconds")
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .map(|m| Duration::from_secs(m * 60))
            .map_err(|_| "invalid minutes")
    } else {
        s.parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| "invalid duration format")
    }
}
