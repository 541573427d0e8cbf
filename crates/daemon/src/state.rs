use std::{fs, path::PathBuf};

use common::prelude::{ObjectId, SecretKey};
use serde::{Deserialize, Serialize};
use service::{Config, ConfigError, ServiceState, StateSetupError};

pub const APP_NAME: &str = "lesspaper";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "guard.sqlite";
pub const KEYS_DIR_NAME: &str = "keys";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level for stdout (and the log file, when enabled)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily log files (optional, stdout only if not set)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Pool size for the sqlite database
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.lesspaper)
    pub guard_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Directory holding one private key PEM per registered user
    pub keys_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.lesspaper)
    pub fn guard_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory. The database itself is created
    /// the first time the service is opened.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let guard_dir = Self::guard_dir(custom_path)?;

        if guard_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let keys_path = guard_dir.join(KEYS_DIR_NAME);
        fs::create_dir_all(&keys_path)?;

        let config = config.unwrap_or_default();
        // fail before anything is written if the level is unusable
        Config::default().with_log_level(&config.log_level)?;

        let config_path = guard_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        Ok(Self {
            db_path: guard_dir.join(DB_FILE_NAME),
            guard_dir,
            keys_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let guard_dir = Self::guard_dir(custom_path)?;

        if !guard_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = guard_dir.join(DB_FILE_NAME);
        let keys_path = guard_dir.join(KEYS_DIR_NAME);
        let config_path = guard_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        if !keys_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", KEYS_DIR_NAME)));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            guard_dir,
            db_path,
            keys_path,
            config_path,
            config,
        })
    }

    /// The service configuration this state directory describes.
    pub fn service_config(&self) -> Result<Config, StateError> {
        let config = Config {
            sqlite_path: Some(self.db_path.clone()),
            max_connections: self.config.max_connections,
            ..Config::default()
        }
        .with_log_level(&self.config.log_level)?;
        Ok(config)
    }

    /// Open (creating and migrating if needed) the database and managers.
    pub async fn open_service(&self) -> Result<ServiceState, StateError> {
        let config = self.service_config()?;
        Ok(ServiceState::from_config(&config).await?)
    }

    fn key_path(&self, user_id: &ObjectId) -> PathBuf {
        self.keys_path.join(format!("{}.pem", user_id))
    }

    /// Store a user's private key; returns where it was written.
    pub fn save_key(&self, user_id: &ObjectId, key: &SecretKey) -> Result<PathBuf, StateError> {
        let path = self.key_path(user_id);
        if path.exists() {
            return Err(StateError::KeyExists(user_id.to_string()));
        }
        fs::write(&path, key.to_pem())?;
        Ok(path)
    }

    /// Load a user's private key from the keys directory
    pub fn load_key(&self, user_id: &ObjectId) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(self.key_path(user_id))?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("guard directory not initialized. Run 'guard init' first")]
    NotInitialized,

    #[error("guard directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("a key for {0} is already stored")]
    KeyExists(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("service setup failed: {0}")]
    Service(#[from] StateSetupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
