//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::ScoreMode;

const DEFAULT_ADDR: &str = "0.0.0.0:8888";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Simulation tick
    pub tick: Duration,
    pub enemy_spawn_interval: Duration,
    pub reward_spawn_interval: Duration,
    pub score_mode: ScoreMode,

    /// Upper bound on concurrent sessions
    pub max_connections: usize,
    /// Per-room broadcast buffer
    pub broadcast_capacity: usize,
    /// Bound on a single socket write
    pub write_timeout: Duration,
    /// How long a new connection may take to send its handshake line
    pub handshake_timeout: Duration,
    /// Fire presses per second per session
    pub fire_rate_limit: u32,

    /// JSON roster of `username -> password`
    pub credentials_file: Option<PathBuf>,
    /// PostgREST base URL; takes precedence over the file
    pub credentials_url: Option<String>,
    pub credentials_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR for hosts that hand out a port
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{port}"),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
        };

        let defaults = Self::default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),

            tick: millis(&lookup, "TICK_MS", defaults.tick)?,
            enemy_spawn_interval: millis(&lookup, "ENEMY_SPAWN_MS", defaults.enemy_spawn_interval)?,
            reward_spawn_interval: millis(&lookup, "REWARD_SPAWN_MS", defaults.reward_spawn_interval)?,
            score_mode: parsed(&lookup, "SCORE_MODE", defaults.score_mode)?,

            max_connections: positive(&lookup, "MAX_CONNECTIONS", defaults.max_connections)?,
            broadcast_capacity: positive(&lookup, "BROADCAST_CAPACITY", defaults.broadcast_capacity)?,
            write_timeout: millis(&lookup, "WRITE_TIMEOUT_MS", defaults.write_timeout)?,
            handshake_timeout: millis(&lookup, "HANDSHAKE_TIMEOUT_MS", defaults.handshake_timeout)?,
            fire_rate_limit: positive(&lookup, "FIRE_RATE_LIMIT", defaults.fire_rate_limit)?,

            credentials_file: lookup("CREDENTIALS_FILE").map(PathBuf::from),
            credentials_url: lookup("CREDENTIALS_URL"),
            credentials_api_key: lookup("CREDENTIALS_API_KEY"),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            log_level: "info".to_string(),
            tick: Duration::from_millis(20),
            enemy_spawn_interval: Duration::from_millis(5_000),
            reward_spawn_interval: Duration::from_millis(10_000),
            score_mode: ScoreMode::PerPlayer,
            max_connections: 256,
            broadcast_capacity: 64,
            write_timeout: Duration::from_millis(2_000),
            handshake_timeout: Duration::from_millis(5_000),
            fire_rate_limit: 10,
            credentials_file: None,
            credentials_url: None,
            credentials_api_key: None,
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Numeric setting that must be greater than zero
fn positive<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    let value = parsed(lookup, name, default)?;
    if value <= T::default() {
        return Err(ConfigError::Invalid {
            name,
            value: lookup(name).unwrap_or_default(),
        });
    }
    Ok(value)
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let ms = positive(lookup, name, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8888".parse().unwrap());
        assert_eq!(config.tick, Duration::from_millis(20));
        assert_eq!(config.enemy_spawn_interval, Duration::from_secs(5));
        assert_eq!(config.reward_spawn_interval, Duration::from_secs(10));
        assert_eq!(config.score_mode, ScoreMode::PerPlayer);
        assert_eq!(config.max_connections, 256);
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert!(config.credentials_file.is_none());
    }

    #[test]
    fn test_port_overrides_server_addr() {
        let config = config_from(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SERVER_ADDR", "127.0.0.1:7000"),
            ("TICK_MS", "50"),
            ("SCORE_MODE", "shared"),
            ("FIRE_RATE_LIMIT", "3"),
            ("HANDSHAKE_TIMEOUT_MS", "750"),
            ("CREDENTIALS_FILE", "/etc/sky/users.json"),
        ])
        .unwrap();
        assert_eq!(config.server_addr, "127.0.0.1:7000".parse().unwrap());
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.score_mode, ScoreMode::Shared);
        assert_eq!(config.fire_rate_limit, 3);
        assert_eq!(config.handshake_timeout, Duration::from_millis(750));
        assert_eq!(
            config.credentials_file,
            Some(PathBuf::from("/etc/sky/users.json"))
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("SERVER_ADDR", "not-an-addr")]),
            Err(ConfigError::InvalidAddress)
        ));
        assert!(matches!(
            config_from(&[("TICK_MS", "fast")]),
            Err(ConfigError::Invalid { name: "TICK_MS", .. })
        ));
        assert!(matches!(
            config_from(&[("TICK_MS", "0")]),
            Err(ConfigError::Invalid { name: "TICK_MS", .. })
        ));
        assert!(matches!(
            config_from(&[("SCORE_MODE", "team")]),
            Err(ConfigError::Invalid { name: "SCORE_MODE", .. })
        ));
    }
}
