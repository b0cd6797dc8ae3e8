//! Daemon configuration (TOML)
//!
//! ```toml
//! [guild]
//! id = "4BBB52AA-D768-4FC6-8EDE-C299F2822F0F"
//! api_key = "..."            # LOTTO_API_KEY overrides
//!
//! [lottery]
//! excluded_users = ["Treasurer.1234"]
//! prize_shares = [50, 20, 10]
//! utc_offset_minutes = 60
//!
//! [storage]
//! data_dir = "/var/lib/lotto"
//! backend = "file"
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lotto_core::constants::{DEFAULT_PRIZE_SHARES, DEFAULT_SINK_LABEL, UNIT_SIZE};
use lotto_core::{LotteryRules, PrizeSplit};
use lotto_engine::Schedule;
use lotto_network::{GuildLogConfig, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable that overrides `guild.api_key`
pub const API_KEY_ENV: &str = "LOTTO_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub guild: GuildConfig,
    #[serde(default)]
    pub lottery: LotteryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            api_key: String::new(),
            api_base_url: default_api_base_url(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    pub excluded_users: BTreeSet<String>,
    pub unit_size: u64,
    pub prize_shares: Vec<u8>,
    pub sink_label: String,
    pub utc_offset_minutes: i32,
    /// Draw as soon as the cashout passes instead of waiting for an operator
    pub auto_draw: bool,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self {
            excluded_users: BTreeSet::new(),
            unit_size: UNIT_SIZE,
            prize_shares: DEFAULT_PRIZE_SHARES.to_vec(),
            sink_label: DEFAULT_SINK_LABEL.to_string(),
            utc_offset_minutes: 0,
            auto_draw: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub initial_delay_secs: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            initial_delay_secs: 10,
            poll_interval_secs: 30,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Sled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub backend: Backend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            backend: Backend::File,
        }
    }
}

impl Config {
    /// Read, apply the environment override and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&contents)?;
        config.apply_api_key(std::env::var(API_KEY_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// A non-empty key replaces the configured one
    pub fn apply_api_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.guild.api_key = key;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.guild.id.trim().is_empty() {
            return Err(ConfigError::Invalid("guild.id is required".to_string()));
        }
        if self.sync.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.sync.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sync.request_timeout_secs must be positive".to_string(),
            ));
        }
        self.rules()?;
        Ok(())
    }

    pub fn rules(&self) -> Result<LotteryRules, ConfigError> {
        let lottery = &self.lottery;
        let prize_split = PrizeSplit::new(lottery.prize_shares.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let rules = LotteryRules {
            unit_size: lottery.unit_size,
            prize_split,
            sink_label: lottery.sink_label.clone(),
            excluded_users: lottery.excluded_users.clone(),
            ..LotteryRules::default()
        }
        .with_utc_offset_minutes(lottery.utc_offset_minutes)
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        rules
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(rules)
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            initial_delay: Duration::from_secs(self.sync.initial_delay_secs),
            poll_interval: Duration::from_secs(self.sync.poll_interval_secs),
        }
    }

    pub fn guild_log(&self) -> GuildLogConfig {
        GuildLogConfig {
            base_url: self.guild.api_base_url.clone(),
            guild_id: self.guild.id.clone(),
            api_key: self.guild.api_key.clone(),
            request_timeout: Duration::from_secs(self.sync.request_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [guild]
        id = "GUILD-1"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();

        assert_eq!(config.guild.api_base_url, "https://api.guildwars2.com");
        assert_eq!(config.lottery.unit_size, 10_000);
        assert_eq!(config.lottery.prize_shares, vec![50, 20, 10]);
        assert!(!config.lottery.auto_draw);
        assert_eq!(config.sync.initial_delay_secs, 10);
        assert_eq!(config.sync.poll_interval_secs, 30);
        assert_eq!(config.storage.backend, Backend::File);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [guild]
            id = "GUILD-1"
            api_key = "file-key"
            api_base_url = "http://localhost:8080"

            [lottery]
            excluded_users = ["Treasurer.1234"]
            prize_shares = [60, 30]
            sink_label = "Bank"
            utc_offset_minutes = 120
            auto_draw = true

            [sync]
            poll_interval_secs = 60

            [storage]
            data_dir = "/tmp/lotto"
            backend = "sled"
            "#,
        )
        .unwrap();

        let rules = config.rules().unwrap();
        assert_eq!(rules.winners(), 2);
        assert_eq!(rules.utc_offset.local_minus_utc(), 7200);
        assert!(rules.excluded_users.contains("Treasurer.1234"));
        assert_eq!(rules.sink_label, "Bank");

        assert_eq!(config.schedule().poll_interval, Duration::from_secs(60));
        assert_eq!(config.schedule().initial_delay, Duration::from_secs(10));
        assert_eq!(config.storage.backend, Backend::Sled);

        let guild_log = config.guild_log();
        assert_eq!(guild_log.base_url, "http://localhost:8080");
        assert_eq!(guild_log.api_key, "file-key");
        assert_eq!(guild_log.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_env_key_overrides_file() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.guild.api_key = "file-key".to_string();

        config.apply_api_key(Some("  ".to_string()));
        assert_eq!(config.guild.api_key, "file-key");

        config.apply_api_key(Some("env-key".to_string()));
        assert_eq!(config.guild.api_key, "env-key");
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(matches!(Config::parse("[lottery]\n"), Err(ConfigError::Parse(_))));

        let mut config = Config::parse(MINIMAL).unwrap();
        config.lottery.prize_shares = vec![80, 30];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::parse(MINIMAL).unwrap();
        config.guild.id = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::parse(MINIMAL).unwrap();
        config.lottery.unit_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::parse(MINIMAL).unwrap();
        config.lottery.unit_size = u64::MAX;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
