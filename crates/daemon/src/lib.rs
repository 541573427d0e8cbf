// Logging setup
pub mod process;

// App state (configuration, paths, user keys)
pub mod state;

pub use process::init_logging;
pub use state::{AppConfig, AppState, StateError};
