//! Configuration loading.

mod file;

pub use file::{
    BetSection, DatabaseConfig, DispatcherSection, FileConfig, LifecycleSection, RedisConfig,
    ServerConfig,
};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dt_core::processors::OutboxDispatcherConfig;
use dt_core::services::{BetConfig, IdemConfig, LifecycleConfig};

/// Errors raised while loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid decimal for {field}: {value}")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("no database URL: set [database].url or the DATABASE_URL environment variable")]
    MissingDatabaseUrl,
}

/// Loads the TOML file and applies CLI overrides.
pub struct ConfigLoader {
    path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(path: &Path, listen_override: Option<SocketAddr>) -> Self {
        Self {
            path: path.to_path_buf(),
            listen_override,
        }
    }

    /// Read and parse the file. A missing file yields the defaults so a
    /// bare `dt-server` starts for local development.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let mut config = if self.path.exists() {
            let raw = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: self.path.clone(),
                source,
            })?
        } else {
            tracing::warn!(path = %self.path.display(), "config file not found, using defaults");
            FileConfig::default()
        };

        if let Some(listen) = self.listen_override {
            config.server.listen = listen;
        }
        Ok(config)
    }
}

/// Database URL: environment wins over the file.
pub fn database_url(config: &FileConfig) -> Result<String, ConfigError> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        if !url.is_empty() {
            return Ok(url);
        }
    }
    if config.database.url.is_empty() {
        return Err(ConfigError::MissingDatabaseUrl);
    }
    Ok(config.database.url.clone())
}

/// Build the bet engine config from the file section.
pub fn bet_config(section: &BetSection) -> Result<BetConfig, ConfigError> {
    let defaults = BetConfig::default();
    let min_bet = section
        .min_bet
        .parse()
        .map_err(|_| ConfigError::InvalidDecimal {
            field: "bet.min_bet",
            value: section.min_bet.clone(),
        })?;
    let max_bet = section
        .max_bet
        .parse()
        .map_err(|_| ConfigError::InvalidDecimal {
            field: "bet.max_bet",
            value: section.max_bet.clone(),
        })?;
    Ok(BetConfig {
        min_bet,
        max_bet,
        tx_timeout: Duration::from_millis(section.tx_timeout_ms),
        ..defaults
    })
}

/// Build the idempotency TTLs from the file section.
pub fn idem_config(section: &BetSection) -> IdemConfig {
    IdemConfig {
        lock_ttl: Duration::from_secs(section.idem_lock_ttl_secs),
        result_ttl: Duration::from_secs(section.idem_result_ttl_secs),
    }
}

/// Build the lifecycle config from the file section.
pub fn lifecycle_config(section: &LifecycleSection) -> LifecycleConfig {
    LifecycleConfig {
        bet_window: Duration::from_secs(section.bet_window_secs),
        round_info_ttl: Duration::from_secs(section.round_info_ttl_secs),
    }
}

/// Build the dispatcher config from the file section.
pub fn dispatcher_config(section: &DispatcherSection) -> OutboxDispatcherConfig {
    OutboxDispatcherConfig {
        tick: Duration::from_millis(section.tick_ms),
        batch_size: section.batch_size,
        publish_timeout: Duration::from_millis(section.publish_timeout_ms),
    }
}
