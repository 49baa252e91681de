//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::locking::ResourceId;
use crate::domain::session::ManagerConfig;

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const KEYS: &[&str] = &[
    "manager.write_delay_ms",
    "manager.read_delay_ms",
    "logging.filter",
    "demo.book_id",
    "demo.title",
    "demo.new_title",
    "demo.rival_title",
    "demo.probe_delay_ms",
    "demo.settle_delay_ms",
];

/// pesslock configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manager: ManagerSettings,
    pub logging: LoggingConfig,
    pub demo: DemoConfig,
}

/// Simulated latency inside the lock window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSettings {
    pub write_delay_ms: u64,
    pub read_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
}

/// Two-user contention walkthrough run by `pesslock demo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub book_id: ResourceId,
    pub title: String,
    pub new_title: String,
    pub rival_title: String,
    /// When Bob first tries the book; must fall inside Alice's write
    pub probe_delay_ms: u64,
    /// When Bob reads again; must fall after Alice's write
    pub settle_delay_ms: u64,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            write_delay_ms: 1500,
            read_delay_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            book_id: 1,
            title: "The Hobbit".to_string(),
            new_title: "Harry Potter".to_string(),
            rival_title: "Watership Down".to_string(),
            probe_delay_ms: 1000,
            settle_delay_ms: 2000,
        }
    }
}

impl ManagerSettings {
    pub fn write_delay(&self) -> Duration {
        Duration::from_millis(self.write_delay_ms)
    }

    pub fn read_delay(&self) -> Duration {
        Duration::from_millis(self.read_delay_ms)
    }
}

impl From<&ManagerSettings> for ManagerConfig {
    fn from(settings: &ManagerSettings) -> Self {
        ManagerConfig::default()
            .with_write_delay(settings.write_delay())
            .with_read_delay(settings.read_delay())
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("PESSLOCK_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("pesslock")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default path, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.logging.filter.trim().is_empty() {
            return Err(anyhow!("logging.filter must not be empty"));
        }
        if self.demo.probe_delay_ms >= self.manager.write_delay_ms {
            return Err(anyhow!(
                "demo.probe_delay_ms ({}) must be less than manager.write_delay_ms ({})",
                self.demo.probe_delay_ms,
                self.manager.write_delay_ms
            ));
        }
        if self.demo.settle_delay_ms <= self.manager.write_delay_ms {
            return Err(anyhow!(
                "demo.settle_delay_ms ({}) must be greater than manager.write_delay_ms ({})",
                self.demo.settle_delay_ms,
                self.manager.write_delay_ms
            ));
        }
        Ok(())
    }

    /// Build the session manager configuration
    pub fn manager_config(&self) -> ManagerConfig {
        ManagerConfig::from(&self.manager)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "manager.write_delay_ms" => Ok(self.manager.write_delay_ms.to_string()),
            "manager.read_delay_ms" => Ok(self.manager.read_delay_ms.to_string()),

            "logging.filter" => Ok(self.logging.filter.clone()),

            "demo.book_id" => Ok(self.demo.book_id.to_string()),
            "demo.title" => Ok(self.demo.title.clone()),
            "demo.new_title" => Ok(self.demo.new_title.clone()),
            "demo.rival_title" => Ok(self.demo.rival_title.clone()),
            "demo.probe_delay_ms" => Ok(self.demo.probe_delay_ms.to_string()),
            "demo.settle_delay_ms" => Ok(self.demo.settle_delay_ms.to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `pesslock config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let millis = |value: &str| -> anyhow::Result<u64> {
            value
                .parse()
                .with_context(|| format!("Invalid {} value: {}", key, value))
        };

        match key {
            "manager.write_delay_ms" => self.manager.write_delay_ms = millis(value)?,
            "manager.read_delay_ms" => self.manager.read_delay_ms = millis(value)?,

            "logging.filter" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("logging.filter must not be empty"));
                }
                self.logging.filter = value.to_string();
            }

            "demo.book_id" => {
                self.demo.book_id = value
                    .parse()
                    .with_context(|| format!("Invalid book_id value: {}", value))?;
            }
            "demo.title" => self.demo.title = value.to_string(),
            "demo.new_title" => self.demo.new_title = value.to_string(),
            "demo.rival_title" => self.demo.rival_title = value.to_string(),
            "demo.probe_delay_ms" => self.demo.probe_delay_ms = millis(value)?,
            "demo.settle_delay_ms" => self.demo.settle_delay_ms = millis(value)?,

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `pesslock config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().expect("default config should validate");

        let manager = config.manager_config();
        assert_eq!(manager.write_delay, Duration::from_millis(1500));
        assert!(manager.read_delay.is_zero());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("demo.new_title", "Dune").unwrap();
        config.set("logging.filter", "pesslock_core=debug").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.get("demo.new_title").unwrap(), "Dune");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[manager]\nread_delay_ms = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.manager.read_delay_ms, 5);
        assert_eq!(config.manager.write_delay_ms, 1500);
        assert_eq!(config.demo.title, "The Hobbit");
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[demo]\nsettle_delay_ms = 100\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("settle_delay_ms"));
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        config.set("manager.write_delay_ms", "2500").unwrap();
        assert_eq!(config.get("manager.write_delay_ms").unwrap(), "2500");

        assert!(config.set("manager.read_delay_ms", "soon").is_err());
        assert!(config.set("logging.filter", "  ").is_err());
        assert!(config.set("nope", "1").is_err());
        assert!(config.get("nope").is_err());
    }

    #[test]
    fn test_list_covers_every_key() {
        let listed = Config::default().list().unwrap();
        assert_eq!(listed.len(), KEYS.len());
        assert!(listed.contains(&("demo.book_id".to_string(), "1".to_string())));
    }
}
