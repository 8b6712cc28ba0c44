use std::path::{Path, PathBuf};

use color_eyre::{Result, eyre::Context};
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 5005;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite file path or a full database URL
    #[serde(default = "default_database")]
    database: String,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the browser front end
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("tape-catalog").join("catalog.db"))
        .unwrap_or_else(|| PathBuf::from("catalog.db"))
        .to_string_lossy()
        .to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            server: ServerConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("tape-catalog").join("config.toml"))
    }

    /// Load the default config file, or built-in defaults when there is none
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the default config file unless one already exists
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path()
            .ok_or_else(|| color_eyre::eyre::eyre!("No config directory on this platform"))?;
        Self::default().write_if_missing(&path)?;
        Ok(path)
    }

    fn write_if_missing(&self, path: &Path) -> Result<()> {
        if path.exists() {
            log::info!("Config already exists at {}", path.display());
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Connection URL for the store
    pub fn database_url(&self) -> String {
        database_url(&self.database)
    }

    pub fn port(&self) -> u16 {
        self.server.port
    }

    pub fn static_dir(&self) -> Option<PathBuf> {
        self.server
            .static_dir
            .as_deref()
            .map(expand_path)
    }
}

/// Expand ~ to home directory
fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Turn a database setting into a connection URL; bare paths become SQLite files
pub fn database_url(setting: &str) -> String {
    if setting.contains("://") || setting.starts_with("sqlite:") {
        return setting.to_string();
    }
    format!("sqlite://{}?mode=rwc", expand_path(setting).display())
}
