//! Metadata and access-control core of the LessPaper document store.
//!
//! This crate provides:
//! - Database (SQLite schema, typed column wrappers and per-table queries)
//! - Managers for users, directories, files and sharing
//! - State management (database + managers built from a [`Config`])

pub mod config;
pub mod database;
pub mod error;
pub mod managers;
pub mod state;
mod transaction;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use database::{Database, DatabaseSetupError};
pub use error::GuardError;
pub use managers::{DirectoryManager, FileManager, SharingManager, UserManager};
pub use state::{State as ServiceState, StateSetupError};
