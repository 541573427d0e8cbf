use url::Url;

use super::config::{Config, ConfigError};
use super::database::{Database, DatabaseSetupError};
use super::managers::{DirectoryManager, FileManager, SharingManager, UserManager};

/// Main service state - the database and the managers working on it
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    users: UserManager,
    directories: DirectoryManager,
    files: FileManager,
    sharing: SharingManager,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        config.validate()?;

        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // the database file may be missing, its directory may not
                let parent_exists = path
                    .parent()
                    .map(|dir| dir.as_os_str().is_empty() || dir.exists())
                    .unwrap_or(false);
                if !parent_exists {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {}", sqlite_database_url);
        let database = Database::connect_with(&sqlite_database_url, config.max_connections).await?;

        Ok(Self::from_database(database))
    }

    pub fn from_database(database: Database) -> Self {
        Self {
            users: UserManager::new(database.clone()),
            directories: DirectoryManager::new(database.clone()),
            files: FileManager::new(database.clone()),
            sharing: SharingManager::new(database.clone()),
            database,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn users(&self) -> &UserManager {
        &self.users
    }

    pub fn directories(&self) -> &DirectoryManager {
        &self.directories
    }

    pub fn files(&self) -> &FileManager {
        &self.files
    }

    pub fn sharing(&self) -> &SharingManager {
        &self.sharing
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        self.database()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_state() {
        let state = State::from_config(&Config::default()).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&**state.database())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_missing_database_directory() {
        let config = Config {
            sqlite_path: Some("/definitely/not/here/guard.sqlite".into()),
            ..Config::default()
        };
        assert!(matches!(
            State::from_config(&config).await,
            Err(StateSetupError::DatabasePathDoesNotExist)
        ));
    }
}
