//! TOML file configuration structures.
//!
//! These structs directly map to the `dt-config.toml` file format. Every
//! section has defaults, so an empty file is a valid configuration for
//! local development (aside from the database URL, which may also come
//! from `DATABASE_URL`).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub bet: BetSection,
    #[serde(default)]
    pub lifecycle: LifecycleSection,
    #[serde(default)]
    pub dispatcher: DispatcherSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Database configuration section. `DATABASE_URL` overrides `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

/// Redis configuration section. An empty URL disables the KV layer; the
/// engines then run in degraded mode with SQL as the sole authority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: String,
}

/// Bet engine overrides. Amounts are decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetSection {
    #[serde(default = "default_min_bet")]
    pub min_bet: String,
    #[serde(default = "default_max_bet")]
    pub max_bet: String,
    #[serde(default = "default_tx_timeout_ms")]
    pub tx_timeout_ms: u64,
    /// In-flight lock TTL; must outlive the betting window.
    #[serde(default = "default_lock_ttl_secs")]
    pub idem_lock_ttl_secs: u64,
    /// Result cache TTL.
    #[serde(default = "default_result_ttl_secs")]
    pub idem_result_ttl_secs: u64,
}

impl Default for BetSection {
    fn default() -> Self {
        Self {
            min_bet: default_min_bet(),
            max_bet: default_max_bet(),
            tx_timeout_ms: default_tx_timeout_ms(),
            idem_lock_ttl_secs: default_lock_ttl_secs(),
            idem_result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

fn default_min_bet() -> String {
    "0.01".to_string()
}

fn default_max_bet() -> String {
    "1000000".to_string()
}

fn default_tx_timeout_ms() -> u64 {
    3_000
}

fn default_lock_ttl_secs() -> u64 {
    45
}

fn default_result_ttl_secs() -> u64 {
    120
}

/// Lifecycle engine overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleSection {
    #[serde(default = "default_bet_window_secs")]
    pub bet_window_secs: u64,
    #[serde(default = "default_round_info_ttl_secs")]
    pub round_info_ttl_secs: u64,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        Self {
            bet_window_secs: default_bet_window_secs(),
            round_info_ttl_secs: default_round_info_ttl_secs(),
        }
    }
}

fn default_bet_window_secs() -> u64 {
    45
}

fn default_round_info_ttl_secs() -> u64 {
    60
}

/// Outbox dispatcher overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSection {
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,
}

impl Default for DispatcherSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            batch_size: default_batch_size(),
            publish_timeout_ms: default_publish_timeout_ms(),
        }
    }
}

fn default_tick_ms() -> u64 {
    1_000
}

fn default_batch_size() -> i64 {
    100
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_parses_with_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.bet.min_bet, "0.01");
        assert_eq!(config.bet.idem_lock_ttl_secs, 45);
        assert_eq!(config.lifecycle.bet_window_secs, 45);
        assert_eq!(config.dispatcher.batch_size, 100);
        assert!(config.redis.url.is_empty());
    }

    #[test]
    fn sections_override_defaults() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[database]
url = "postgres://localhost/dt"
max_connections = 4

[redis]
url = "redis://localhost:6379"

[bet]
max_bet = "50000"
idem_result_ttl_secs = 300

[lifecycle]
bet_window_secs = 30
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.bet.max_bet, "50000");
        assert_eq!(config.bet.idem_result_ttl_secs, 300);
        assert_eq!(config.bet.min_bet, "0.01");
        assert_eq!(config.lifecycle.bet_window_secs, 30);
    }
}
