use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Audio stream configuration
    pub audio: AudioConfig,

    /// Notification source configuration
    pub monitoring: MonitoringConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Stream to watch (media, ring, alarm, notification, system)
    pub stream: String,

    /// Per-stream wpctl target overrides, keyed by stream name
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Notification source: "pactl" (event-driven) or "poll" (timer)
    pub source: String,

    /// Tick period for the poll source (in seconds)
    pub poll_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Whether to include timestamps in logs
    pub timestamps: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            audio: AudioConfig {
                stream: "media".to_string(),
                targets: HashMap::new(),
            },
            monitoring: MonitoringConfig {
                source: "pactl".to_string(),
                poll_interval: 2,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                timestamps: true,
            },
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)
                    .context("Failed to read configuration file")?;

                let config: Config = toml::from_str(&content)
                    .context("Failed to parse configuration file")?;

                Ok(config)
            } else {
                // Create default config file
                let default_config = Config::default();
                let toml_content = toml::to_string_pretty(&default_config)
                    .context("Failed to serialize default configuration")?;

                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .context("Failed to create config directory")?;
                }

                std::fs::write(path, toml_content)
                    .context("Failed to write default configuration file")?;

                Ok(default_config)
            }
        } else {
            // No config file specified, use defaults
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        std::fs::write(path, toml_content)
            .context("Failed to write configuration file")?;

        Ok(())
    }
}
