//! Arauto configuration file handling
//!
//! Provides default configuration generation and loading. Configuration
//! files are TOML and stored adjacent to the WhatsApp credential store.
//!
//! This is OPERATOR configuration: deployment paths, pacing, logging. The
//! contact store contents are owned by the surrounding system and only read
//! here.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default seconds between consecutive sends
const DEFAULT_PACING_SECS: u64 = 2;

/// Arauto operator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArautoConfig {
    /// WhatsApp transport configuration
    pub whatsapp: WhatsappConfig,

    /// Operator database (contact store + broadcast audit log)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Broadcast pacing
    #[serde(default)]
    pub broadcast: BroadcastSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// WhatsApp-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappConfig {
    /// Path where the transport persists its credential material.
    /// The contents are opaque to Arauto.
    pub store_path: PathBuf,

    /// Device name shown in WhatsApp's linked devices list
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Broadcast pacing configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BroadcastSettings {
    /// Seconds to wait between consecutive sends. The remote network flags
    /// faster senders for abuse; the preview ETA uses this same value.
    #[serde(default = "default_pacing_secs")]
    pub pacing_secs: u64,
}

impl BroadcastSettings {
    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            pacing_secs: DEFAULT_PACING_SECS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

fn default_device_name() -> String {
    "Arauto".to_string()
}

fn default_pacing_secs() -> u64 {
    DEFAULT_PACING_SECS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl ArautoConfig {
    /// Create a new configuration with the given store path
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            whatsapp: WhatsappConfig {
                store_path,
                device_name: default_device_name(),
            },
            database: DatabaseConfig::default(),
            broadcast: BroadcastSettings::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: ArautoConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(store_path: &Path) -> String {
        format!(
            r#"# Arauto Broadcast Service Configuration (Operator Settings)
#
# Deployment settings only: paths, pacing, logging. Contact data lives in
# the database below and is written by the surrounding system; Arauto only
# reads it.

[whatsapp]
# Path where the WhatsApp transport persists its credential material.
# The contents are managed by the transport and opaque to Arauto.
store_path = "{store_path}"

# Device name shown in WhatsApp's linked devices list
device_name = "Arauto"

[database]
# SQLite database with the contact store and the broadcast audit log
path = "{db_path}"

[broadcast]
# Seconds to wait between consecutive sends. Sending faster gets the account
# flagged by the remote network. The preview ETA uses this same value.
pacing_secs = 2

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/arauto/arauto.log"
"#,
            store_path = store_path.display(),
            db_path = default_db_path().display(),
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        store_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(store_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }
}

/// Get the default config file path based on the store path
///
/// The config file is stored adjacent to the WhatsApp store directory:
/// - Store: ~/.local/share/arauto/wa-session/
/// - Config: ~/.local/share/arauto/config.toml
pub fn default_config_path(store_path: &Path) -> PathBuf {
    store_path
        .parent()
        .unwrap_or(store_path)
        .join("config.toml")
}

/// Get the default WhatsApp store path
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arauto")
        .join("wa-session")
}

/// Get the default database path
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arauto")
        .join("arauto.db")
}

/// Resolve the config path from an optional CLI flag
pub fn resolve_config_path(config: Option<String>) -> PathBuf {
    config
        .map(PathBuf::from)
        .unwrap_or_else(|| default_config_path(&default_store_path()))
}

/// Load the config, creating a commented default first if none exists
pub fn load_or_create(config_path: &Path) -> Result<ArautoConfig, Box<dyn std::error::Error>> {
    if config_path.exists() {
        return ArautoConfig::load(config_path);
    }

    println!("📝 No config file found. Creating default configuration...");
    ArautoConfig::create_default(config_path, &default_store_path())?;
    println!("   Created: {}", config_path.display());
    ArautoConfig::load(config_path)
}

/// Open the operator database, creating the file if needed
pub async fn open_pool(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = path.parent() {
        // Creating the directory is best-effort; the connect below reports
        // the real error if the path is unusable.
        let _ = fs::create_dir_all(parent);
    }
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}
