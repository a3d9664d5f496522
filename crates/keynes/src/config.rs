//! Server configuration.
//!
//! Everything has a default; [`ServerConfig::from_env`] overrides the
//! defaults from environment variables:
//!
//! | variable                        | meaning                               |
//! |---------------------------------|---------------------------------------|
//! | `KEYNES_BIND`                   | listen address, e.g. `0.0.0.0:4000`   |
//! | `PORT`                          | port on `0.0.0.0`, if `KEYNES_BIND` is unset |
//! | `KEYNES_SNAPSHOT_PATH`          | enables snapshots to this JSON file   |
//! | `KEYNES_SNAPSHOT_INTERVAL_SECS` | seconds between snapshots (default 30) |

use std::path::PathBuf;
use std::time::Duration;

use keynes_room::RoomConfig;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4000";

/// Default time between periodic snapshots.
pub const DEFAULT_SNAPSHOT_INTERVAL: Duration = Duration::from_secs(30);

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Where and how often room state is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    pub interval: Duration,
}

impl SnapshotConfig {
    /// Snapshots to `path` every [`DEFAULT_SNAPSHOT_INTERVAL`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interval: DEFAULT_SNAPSHOT_INTERVAL,
        }
    }
}

/// Configuration for a [`KeynesServer`](crate::KeynesServer).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub room: RoomConfig,
    /// `None` disables persistence.
    pub snapshot: Option<SnapshotConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            room: RoomConfig::default(),
            snapshot: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("KEYNES_BIND").filter(|v| !v.trim().is_empty()) {
            config.bind_addr = addr.trim().to_string();
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: port.clone(),
            })?;
            config.bind_addr = format!("0.0.0.0:{port}");
        }

        if let Some(path) = lookup("KEYNES_SNAPSHOT_PATH").filter(|v| !v.trim().is_empty()) {
            let mut snapshot = SnapshotConfig::new(path.trim());
            if let Some(secs) = lookup("KEYNES_SNAPSHOT_INTERVAL_SECS") {
                let parsed = secs.trim().parse::<u64>().ok().filter(|s| *s > 0);
                let secs = parsed.ok_or(ConfigError::Invalid {
                    key: "KEYNES_SNAPSHOT_INTERVAL_SECS",
                    value: secs,
                })?;
                snapshot.interval = Duration::from_secs(secs);
            }
            config.snapshot = Some(snapshot);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_empty_is_default() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert!(config.snapshot.is_none());
    }

    #[test]
    fn test_from_lookup_bind_wins_over_port() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("KEYNES_BIND", "127.0.0.1:9000"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_from_lookup_port() {
        let config = ServerConfig::from_lookup(lookup(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_from_lookup_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn test_from_lookup_snapshot_default_interval() {
        let config = ServerConfig::from_lookup(lookup(&[("KEYNES_SNAPSHOT_PATH", "/tmp/rooms.json")])).unwrap();
        let snapshot = config.snapshot.unwrap();
        assert_eq!(snapshot.path, PathBuf::from("/tmp/rooms.json"));
        assert_eq!(snapshot.interval, Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_snapshot_interval() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("KEYNES_SNAPSHOT_PATH", "rooms.json"),
            ("KEYNES_SNAPSHOT_INTERVAL_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.snapshot.unwrap().interval, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_zero_interval_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[
            ("KEYNES_SNAPSHOT_PATH", "rooms.json"),
            ("KEYNES_SNAPSHOT_INTERVAL_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("KEYNES_SNAPSHOT_INTERVAL_SECS"));
    }

    #[test]
    fn test_from_lookup_interval_without_path_ignored() {
        let config = ServerConfig::from_lookup(lookup(&[("KEYNES_SNAPSHOT_INTERVAL_SECS", "nope")])).unwrap();
        assert!(config.snapshot.is_none());
    }
}
