//! Signaling server configuration.
//!
//! Configuration is loaded from environment variables. Nothing here is
//! secret, so `Debug` is derived.

use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default heartbeat interval in seconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 30;

/// Default grace window after a room's expiry before it is reclaimed (10 minutes).
pub const DEFAULT_ROOM_GRACE_PERIOD_SECONDS: u64 = 600;

/// Default bound on a single relay write to a peer connection.
pub const DEFAULT_PEER_SEND_TIMEOUT_MS: u64 = 5000;

/// Default shutdown drain period in seconds.
pub const DEFAULT_SHUTDOWN_DRAIN_SECONDS: u64 = 0;

/// Signaling server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// How often a session refreshes its participant's `last_active`.
    pub heartbeat_interval_seconds: u64,

    /// Time after `expired_at` during which joined sessions survive.
    pub room_grace_period_seconds: u64,

    /// Upper bound on waiting for a peer's outbound queue when relaying.
    pub peer_send_timeout_ms: u64,

    /// Time to wait for in-flight connections after a shutdown signal.
    pub shutdown_drain_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let heartbeat_interval_seconds = parse_u64(
            vars,
            "HEARTBEAT_INTERVAL_SECONDS",
            DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
        )?;
        if heartbeat_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "HEARTBEAT_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }

        let room_grace_period_seconds = parse_u64(
            vars,
            "ROOM_GRACE_PERIOD_SECONDS",
            DEFAULT_ROOM_GRACE_PERIOD_SECONDS,
        )?;

        let peer_send_timeout_ms =
            parse_u64(vars, "PEER_SEND_TIMEOUT_MS", DEFAULT_PEER_SEND_TIMEOUT_MS)?;
        if peer_send_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "PEER_SEND_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        let shutdown_drain_seconds = parse_u64(
            vars,
            "SHUTDOWN_DRAIN_SECONDS",
            DEFAULT_SHUTDOWN_DRAIN_SECONDS,
        )?;

        Ok(Config {
            bind_address,
            heartbeat_interval_seconds,
            room_grace_period_seconds,
            peer_send_timeout_ms,
            shutdown_drain_seconds,
        })
    }

    /// Heartbeat interval as a `Duration`.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds)
    }

    /// Room grace window as a `Duration`.
    pub fn room_grace_period(&self) -> Duration {
        Duration::from_secs(self.room_grace_period_seconds)
    }

    /// Peer relay timeout as a `Duration`.
    pub fn peer_send_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_send_timeout_ms)
    }
}

fn parse_u64(vars: &HashMap<String, String>, name: &str, default: u64) -> Result<u64, ConfigError> {
    match vars.get(name) {
        Some(value_str) => value_str.parse().map_err(|e| {
            ConfigError::InvalidValue(format!(
                "{} must be a valid non-negative integer, got '{}': {}",
                name, value_str, e
            ))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(config.room_grace_period(), Duration::from_secs(600));
        assert_eq!(config.peer_send_timeout(), Duration::from_millis(5000));
        assert_eq!(config.shutdown_drain_seconds, 0);
    }

    #[test]
    fn test_from_vars_overrides() {
        let vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string()),
            ("HEARTBEAT_INTERVAL_SECONDS".to_string(), "5".to_string()),
            ("ROOM_GRACE_PERIOD_SECONDS".to_string(), "60".to_string()),
            ("PEER_SEND_TIMEOUT_MS".to_string(), "250".to_string()),
            ("SHUTDOWN_DRAIN_SECONDS".to_string(), "10".to_string()),
        ]);

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.heartbeat_interval_seconds, 5);
        assert_eq!(config.room_grace_period_seconds, 60);
        assert_eq!(config.peer_send_timeout_ms, 250);
        assert_eq!(config.shutdown_drain_seconds, 10);
    }

    #[test]
    fn test_zero_grace_period_is_allowed() {
        let vars = HashMap::from([("ROOM_GRACE_PERIOD_SECONDS".to_string(), "0".to_string())]);
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.room_grace_period(), Duration::ZERO);
    }

    #[test]
    fn test_zero_heartbeat_rejected() {
        let vars = HashMap::from([("HEARTBEAT_INTERVAL_SECONDS".to_string(), "0".to_string())]);
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(msg) if msg.contains("greater than 0")));
    }

    #[test]
    fn test_zero_peer_timeout_rejected() {
        let vars = HashMap::from([("PEER_SEND_TIMEOUT_MS".to_string(), "0".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_non_numeric_value_rejected() {
        let vars = HashMap::from([(
            "HEARTBEAT_INTERVAL_SECONDS".to_string(),
            "thirty".to_string(),
        )]);
        let err = Config::from_vars(&vars).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue(msg) if msg.contains("HEARTBEAT_INTERVAL_SECONDS"))
        );
    }

    #[test]
    fn test_negative_value_rejected() {
        let vars = HashMap::from([("ROOM_GRACE_PERIOD_SECONDS".to_string(), "-1".to_string())]);
        assert!(Config::from_vars(&vars).is_err());
    }
}
