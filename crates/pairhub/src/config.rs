//! Server configuration.

use std::time::Duration;

use pairhub_room::RoomConfig;
use pairhub_session::DEFAULT_OUTBOUND_CAPACITY;
use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ServerConfig::bind_addr`].
pub const ENV_BIND: &str = "PAIRHUB_BIND";
/// Environment variable overriding the reconnect grace, in seconds.
pub const ENV_GRACE_SECS: &str = "PAIRHUB_GRACE_SECS";
/// Environment variable overriding the idle timeout, in seconds.
pub const ENV_IDLE_SECS: &str = "PAIRHUB_IDLE_SECS";

/// Everything the gateway needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// How long a new connection has to send its `Handshake`.
    pub handshake_timeout: Duration,

    /// A connection that sends nothing for this long is dropped. Clients
    /// keep it alive with `Heartbeat`.
    pub idle_timeout: Duration,

    /// Events buffered per connection. A client that falls this far
    /// behind is disconnected.
    pub outbound_capacity: usize,

    /// How long shutdown waits for connections to flush their last
    /// events before giving up on them.
    pub shutdown_timeout: Duration,

    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            shutdown_timeout: Duration::from_secs(5),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `PAIRHUB_BIND`, `PAIRHUB_GRACE_SECS` and
    /// `PAIRHUB_IDLE_SECS` where set.
    ///
    /// # Errors
    /// [`ConfigError::InvalidVar`] if a seconds variable isn't a
    /// non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so tests don't have to touch the process environment.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(addr) = lookup(ENV_BIND) {
            config.bind_addr = addr;
        }
        if let Some(secs) = seconds(&lookup, ENV_GRACE_SECS)? {
            config.room.reconnect_grace = secs;
        }
        if let Some(secs) = seconds(&lookup, ENV_IDLE_SECS)? {
            config.idle_timeout = secs;
        }
        Ok(config)
    }
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidVar { name, value })
        })
        .transpose()
}

/// Errors raised while reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {name}")]
    InvalidVar { name: &'static str, value: String },
}
