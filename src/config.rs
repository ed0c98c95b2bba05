//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transcript database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Blueprint document location and format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default = "default_schema_path")]
    pub path: String,

    /// 'auto', 'entities' or 'legacy'
    #[serde(default = "default_schema_format")]
    pub format: String,
}

/// Metadata search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Field names that mark an entity as searchable
    #[serde(default = "default_display_fields")]
    pub display_fields: Vec<String>,
}

/// Streaming chat connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default = "default_stream_url")]
    pub url: String,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Query parameter carrying the bearer token
    #[serde(default = "default_token_param")]
    pub token_param: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/blueprint/blueprint.db".to_string()
}

fn default_schema_path() -> String {
    "blueprint.json".to_string()
}

fn default_schema_format() -> String {
    "auto".to_string()
}

fn default_display_fields() -> Vec<String> {
    vec!["name".to_string(), "first_name".to_string()]
}

fn default_stream_url() -> String {
    "ws://localhost:8080/ws".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_token_param() -> String {
    "token".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            path: default_schema_path(),
            format: default_schema_format(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            display_fields: default_display_fields(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            token_param: default_token_param(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./blueprint.yaml (current directory)
    /// 3. ~/.config/blueprint/blueprint.yaml
    pub fn load(path: &str) -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_default();
        let search_paths = vec![
            PathBuf::from(shellexpand::tilde(path).to_string()),
            PathBuf::from("blueprint.yaml"),
            home.join(".config/blueprint/blueprint.yaml"),
        ];

        for search_path in &search_paths {
            if search_path.exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                tracing::debug!(path = %search_path.display(), "loaded configuration");
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).to_string())
    }

    /// Get the schema path, expanding ~ to home directory
    pub fn schema_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.schema.path).to_string())
    }

    /// Forced schema adapter id, or None for auto-detection
    pub fn schema_format(&self) -> Option<&str> {
        match self.schema.format.as_str() {
            "" | "auto" => None,
            other => Some(other),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.stream.reconnect_delay_ms)
    }
}
