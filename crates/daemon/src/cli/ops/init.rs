use std::path::PathBuf;

use clap::Args;

use guard_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Log level written to the config (default: info)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Directory for daily log files (optional, stderr only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Pool size for the sqlite database
    #[arg(long, default_value_t = 5)]
    pub max_connections: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            max_connections: self.max_connections,
        };

        let state = AppState::init(ctx.path.clone(), Some(config))?;
        // creates the database file and applies migrations
        state.open_service().await?;

        let log_dir_str = match &state.config.log_dir {
            Some(dir) => dir.display().to_string(),
            None => "none (stderr only)".to_string(),
        };

        let output = format!(
            "Initialized guard directory at: {}\n\
             - Database: {}\n\
             - Keys: {}\n\
             - Config: {}\n\
             - Log level: {}\n\
             - Log dir: {}",
            state.guard_dir.display(),
            state.db_path.display(),
            state.keys_path.display(),
            state.config_path.display(),
            state.config.log_level,
            log_dir_str
        );

        Ok(output)
    }
}
