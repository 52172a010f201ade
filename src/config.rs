//! Server and engine configuration.
//!
//! Defaults suit local play; every field can be overridden from the
//! environment (`CRASH_*` variables).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::{DEFAULT_CLIENT_SEED, DEFAULT_GROWTH_RATE, DEFAULT_TICK_INTERVAL_MS};

/// How `start` picks the client seed for the crash point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientSeedPolicy {
    /// Seed of the earliest placed bet still in the ledger when the round
    /// starts, else the default seed.
    #[default]
    CarryOver,
    /// Always the default seed.
    Fixed,
}

impl FromStr for ClientSeedPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "carry_over" | "carryover" => Ok(Self::CarryOver),
            "fixed" => Ok(Self::Fixed),
            other => Err(ConfigError::Invalid {
                key: "CRASH_CLIENT_SEED_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

/// Round engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Compound growth per tick.
    pub growth_rate: f64,
    /// Wait between ticks.
    pub tick_interval: Duration,
    /// Client seed selection at round start.
    pub client_seed_policy: ClientSeedPolicy,
    /// Seed used when a bet carries none, and by the `Fixed` policy.
    pub default_client_seed: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            growth_rate: DEFAULT_GROWTH_RATE,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            client_seed_policy: ClientSeedPolicy::CarryOver,
            default_client_seed: DEFAULT_CLIENT_SEED.to_string(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Pause between the end of one round and the start of the next.
    pub intermission: Duration,
    /// Round engine settings.
    pub engine: EngineConfig,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            intermission: Duration::from_secs(5),
            engine: EngineConfig::default(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("CRASH_BIND_ADDR") {
            config.bind_addr = parse("CRASH_BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("CRASH_MAX_CONNECTIONS") {
            config.max_connections = parse("CRASH_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("CRASH_INTERMISSION_MS") {
            config.intermission = Duration::from_millis(parse("CRASH_INTERMISSION_MS", &v)?);
        }
        if let Some(v) = lookup("CRASH_TICK_MS") {
            let ms: u64 = parse("CRASH_TICK_MS", &v)?;
            if ms == 0 {
                return Err(ConfigError::Invalid {
                    key: "CRASH_TICK_MS",
                    value: v,
                });
            }
            config.engine.tick_interval = Duration::from_millis(ms);
        }
        if let Some(v) = lookup("CRASH_GROWTH_RATE") {
            let rate: f64 = parse("CRASH_GROWTH_RATE", &v)?;
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::Invalid {
                    key: "CRASH_GROWTH_RATE",
                    value: v,
                });
            }
            config.engine.growth_rate = rate;
        }
        if let Some(v) = lookup("CRASH_CLIENT_SEED_POLICY") {
            config.engine.client_seed_policy = v.parse()?;
        }
        if let Some(v) = lookup("CRASH_DEFAULT_CLIENT_SEED") {
            config.engine.default_client_seed = v;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A variable could not be parsed or is out of range.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}
