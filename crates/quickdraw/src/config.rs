//! Server configuration.

use std::str::FromStr;
use std::time::Duration;

use quickdraw_room::RoomConfig;
use serde::{Deserialize, Serialize};

/// Everything the server needs to start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// How long a new connection has to send its handshake.
    pub handshake_timeout: Duration,

    /// How often the server pings each connection.
    pub keepalive_interval: Duration,

    /// A connection from which nothing at all has arrived for this long,
    /// not even a pong, is treated as lost. A client that only listens
    /// stays connected as long as its socket answers pings.
    pub keepalive_timeout: Duration,

    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            handshake_timeout: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(10),
            keepalive_timeout: Duration::from_secs(30),
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Builds a config from `QUICKDRAW_*` environment variables, falling
    /// back to the defaults for anything unset or unparsable.
    ///
    /// - `QUICKDRAW_BIND_ADDR`
    /// - `QUICKDRAW_HANDSHAKE_TIMEOUT_SECS`
    /// - `QUICKDRAW_KEEPALIVE_INTERVAL_SECS`
    /// - `QUICKDRAW_KEEPALIVE_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = lookup("QUICKDRAW_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let handshake_timeout = parse_or(
            &lookup,
            "QUICKDRAW_HANDSHAKE_TIMEOUT_SECS",
            defaults.handshake_timeout.as_secs(),
        );
        let keepalive_interval = parse_or(
            &lookup,
            "QUICKDRAW_KEEPALIVE_INTERVAL_SECS",
            defaults.keepalive_interval.as_secs(),
        );
        let keepalive_timeout = parse_or(
            &lookup,
            "QUICKDRAW_KEEPALIVE_TIMEOUT_SECS",
            defaults.keepalive_timeout.as_secs(),
        );

        Self {
            bind_addr,
            handshake_timeout: Duration::from_secs(handshake_timeout),
            keepalive_interval: Duration::from_secs(keepalive_interval),
            keepalive_timeout: Duration::from_secs(keepalive_timeout),
            room: defaults.room,
        }
    }
}

fn parse_or<T: FromStr + Copy>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(%key, value = %raw, "ignoring unparsable setting");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.keepalive_interval, Duration::from_secs(10));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(30));
        assert_eq!(config.room.max_name_chars, 20);
    }

    #[test]
    fn test_from_lookup_reads_values() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("QUICKDRAW_BIND_ADDR", "0.0.0.0:9000"),
            ("QUICKDRAW_KEEPALIVE_INTERVAL_SECS", "5"),
            ("QUICKDRAW_KEEPALIVE_TIMEOUT_SECS", "20"),
            ("QUICKDRAW_HANDSHAKE_TIMEOUT_SECS", " 2 "),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(20));
        assert_eq!(config.handshake_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_from_lookup_bad_number_falls_back() {
        let config =
            ServerConfig::from_lookup(lookup_from(&[("QUICKDRAW_KEEPALIVE_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.keepalive_timeout, Duration::from_secs(30));
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }
}
