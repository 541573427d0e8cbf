use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// upper bound on pooled connections to a file-backed
    ///  database; an in-memory one always uses a single connection
    pub max_connections: u32,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sqlite_path: None,
            max_connections: 5,
            log_level: tracing::Level::INFO,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("max connections must be at least 1")]
    NoConnections,
}

impl Config {
    /// Parse a textual log level (`"debug"`, `"INFO"`, ...) into the config.
    pub fn with_log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        self.log_level = level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(level.to_string()))?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::NoConnections);
        }
        Ok(())
    }
}
