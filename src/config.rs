//! Client Configuration
//!
//! Everything fixed at session setup: where the relay is, how fast the loop
//! ticks, the arena geometry and the countdown. Loaded from JSON with
//! defaults for every missing field.

use std::path::Path;
use std::time::Duration;
use serde::{Serialize, Deserialize};

use crate::game::dot::ArenaConfig;
use crate::game::session::SessionConfig;

/// Default relay address.
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:1234";

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Relay `host:port`.
    pub relay_addr: String,
    /// Loop frequency (Hz).
    pub tick_rate: u32,
    /// Arena geometry and boundary rule.
    pub arena: ArenaConfig,
    /// Countdown settings.
    pub session: SessionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay_addr: DEFAULT_RELAY_ADDR.to_string(),
            tick_rate: crate::TICK_RATE,
            arena: ArenaConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.relay_addr.trim().is_empty() {
            return Err(ConfigurationError::MissingRelayAddr);
        }
        if self.tick_rate == 0 {
            return Err(ConfigurationError::ZeroTickRate);
        }
        self.arena.validate()?;
        self.session.validate()
    }

    /// Time between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}

/// Invalid setup. Fatal: the loop never starts, or stops at once.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Boundary policy name not recognised.
    #[error("Unknown boundary policy '{0}' (expected wrap or clamp)")]
    UnknownBoundaryPolicy(String),

    /// Arena dimensions not positive.
    #[error("Invalid arena size {width}x{height}")]
    InvalidArena {
        /// Configured width.
        width: i32,
        /// Configured height.
        height: i32,
    },

    /// Dot size not positive, or larger than the arena.
    #[error("Invalid entity size {0}")]
    InvalidEntitySize(i32),

    /// Unit velocity not positive.
    #[error("Invalid unit velocity {0}")]
    InvalidVelocity(i32),

    /// Countdown of zero ticks.
    #[error("Countdown must be at least one tick")]
    ZeroCountdown,

    /// Tick rate of zero.
    #[error("Tick rate must be at least 1 Hz")]
    ZeroTickRate,

    /// No relay address.
    #[error("Relay address is empty")]
    MissingRelayAddr,

    /// Relay started the session before assigning an identity.
    #[error("Session started before an identity was assigned")]
    MissingIdentity,

    /// Relay assigned a slot outside 1..=3.
    #[error("Relay assigned invalid player id {0}")]
    InvalidIdentity(i32),

    /// Config file unreadable.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dot::BoundaryPolicy;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.relay_addr, "127.0.0.1:1234");
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.session.countdown_ticks, 1800);
        assert_eq!(config.arena.boundary, BoundaryPolicy::Wrap);
        assert!(config.validate().is_ok());

        // One minute of ticks at the default rate.
        let minute = config.tick_interval() * config.session.countdown_ticks;
        assert!((minute.as_secs_f64() - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_partial_json() {
        let config = ClientConfig::from_json_str(
            r#"{ "relay_addr": "relay.local:9000", "arena": { "boundary": "clamp" } }"#,
        )
        .unwrap();

        assert_eq!(config.relay_addr, "relay.local:9000");
        assert_eq!(config.arena.boundary, BoundaryPolicy::Clamp);
        assert_eq!(config.arena.width, 640);
        assert_eq!(config.tick_rate, 30);
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = ClientConfig::default();
        config.session.countdown_ticks = 90;
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(ClientConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            ClientConfig::from_json_str(r#"{ "arena": { "boundary": "bounce" } }"#),
            Err(ConfigurationError::Parse(_))
        ));
        assert!(matches!(
            ClientConfig::from_json_str(r#"{ "tick_rate": -1 }"#),
            Err(ConfigurationError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ClientConfig::from_json_file("/nonexistent/dot-chase.json");
        assert!(matches!(result, Err(ConfigurationError::Read { .. })));
    }

    #[test]
    fn test_validate_rejects() {
        let config = ClientConfig { tick_rate: 0, ..ClientConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigurationError::ZeroTickRate)));

        let config = ClientConfig { relay_addr: " ".into(), ..ClientConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigurationError::MissingRelayAddr)));

        let mut config = ClientConfig::default();
        config.session.countdown_ticks = 0;
        assert!(matches!(config.validate(), Err(ConfigurationError::ZeroCountdown)));

        let mut config = ClientConfig::default();
        config.arena.unit_velocity = 0;
        assert!(matches!(config.validate(), Err(ConfigurationError::InvalidVelocity(0))));
    }
}
