use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;
use crate::configs::*;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        crate::log_println!("Loading configuration from: {}", config_path);

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        Self::from_toml(&config_str)
    }

    pub fn from_toml(source: &str) -> AnyResult<Self> {
        let config: Config = toml::from_str(source)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.player.reconnect_attempts, 5);
        assert_eq!(config.player.reconnect_delay_ms, 1000);
        assert_eq!(config.cache.ttl_days, 28);
        assert_eq!(config.history.retention_days, 30);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [player]
            reconnect_attempts = 2

            [logging]
            level = "debug"

            [logging.file]
            path = "logs/jukebox.log"
            "#,
        )
        .unwrap();

        assert_eq!(config.player.reconnect_attempts, 2);
        assert_eq!(config.player.reconnect_delay_ms, 1000);
        let logging = config.logging.unwrap();
        assert_eq!(logging.level.as_deref(), Some("debug"));
        let file = logging.file.unwrap();
        assert_eq!(file.path, "logs/jukebox.log");
        assert_eq!(file.max_lines, 10_000);
    }

    #[test]
    fn test_rejects_wrong_types() {
        assert!(Config::from_toml("[player]\nreconnect_attempts = \"many\"").is_err());
    }
}
