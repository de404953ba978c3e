use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::{Identity, Session};

const DEFAULT_LOG_FILTER: &str = "fitsync=info";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// The signed-in account
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AccountConfig {
    /// Stable account identifier from the identity provider
    pub user_id: Option<String>,
    /// Name used for the profile until one is submitted
    pub display_name: Option<String>,
}

/// Remote document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Document API base URL (e.g., "https://fit.example.com/api").
    /// When unset, the remote tree is kept in a local Automerge file.
    pub url: Option<String>,
    /// Bearer token for the document API
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Automerge file used when no URL is configured
    pub document_path: Option<PathBuf>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sync before read commands (default: false)
    #[serde(default)]
    pub auto_sync: bool,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            document_path: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auto_sync: false,
        }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite cache
    pub database_path: ConfigValue<PathBuf>,
    /// Tracing filter directive
    pub log_filter: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub account: AccountConfig,
    pub remote: RemoteConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    log_filter: Option<String>,
    account: Option<AccountConfig>,
    remote: Option<RemoteConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let default_db_path = Self::default_data_dir().join("fitsync.db");

        // Start with defaults
        let mut database_path = ConfigValue::new(default_db_path, ConfigSource::Default);
        let mut log_filter =
            ConfigValue::new(DEFAULT_LOG_FILTER.to_string(), ConfigSource::Default);
        let mut config_file = None;
        let mut account = AccountConfig::default();
        let mut remote = RemoteConfig::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path = ConfigValue::new(resolve(&path, db_path), ConfigSource::File);
            }
            if let Some(filter) = file_config.log_filter {
                log_filter = ConfigValue::new(filter, ConfigSource::File);
            }
            if let Some(account_config) = file_config.account {
                account = account_config;
            }
            if let Some(mut remote_config) = file_config.remote {
                remote_config.document_path =
                    remote_config.document_path.map(|p| resolve(&path, p));
                remote = remote_config;
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("FITSYNC_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(user_id) = std::env::var("FITSYNC_USER_ID") {
            account.user_id = Some(user_id);
        }
        if let Ok(name) = std::env::var("FITSYNC_DISPLAY_NAME") {
            account.display_name = Some(name);
        }
        if let Ok(url) = std::env::var("FITSYNC_REMOTE_URL") {
            remote.url = Some(url);
        }
        if let Ok(key) = std::env::var("FITSYNC_API_KEY") {
            remote.api_key = Some(key);
        }
        if let Ok(doc_path) = std::env::var("FITSYNC_DOCUMENT_PATH") {
            remote.document_path = Some(PathBuf::from(doc_path));
        }

        Ok(Self {
            database_path,
            log_filter,
            config_file,
            account,
            remote,
        })
    }

    /// Session for the configured account; signed out when no user id is set.
    pub fn session(&self) -> Session {
        match &self.account.user_id {
            Some(user_id) if !user_id.is_empty() => {
                let mut identity = Identity::new(user_id);
                identity.display_name = self.account.display_name.clone();
                Session::signed_in(identity)
            }
            _ => Session::signed_out(),
        }
    }

    /// Automerge file backing the remote tree when no URL is configured.
    pub fn document_path(&self) -> PathBuf {
        self.remote
            .document_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("remote.automerge"))
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitsync/
    /// - macOS: ~/Library/Application Support/fitsync/
    /// - Windows: %APPDATA%/fitsync/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitsync")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fitsync/
    /// - macOS: ~/Library/Application Support/fitsync/
    /// - Windows: %APPDATA%/fitsync/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitsync")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_file: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_file
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
