use common::id::IdError;

/// Why a guard operation did not go through.
///
/// Managers use this internally and collapse it to the operation's plain
/// failure value at the public boundary, so callers can never tell a
/// missing object from one they are not allowed to touch.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found or not permitted")]
    NotFound,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("{step}: expected {expected} affected rows, got {actual}")]
    UnexpectedCount {
        step: &'static str,
        expected: u64,
        actual: u64,
    },
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for GuardError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => GuardError::NotFound,
            sqlx::Error::Database(ref db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                GuardError::Constraint(db_err.message().to_string())
            }
            other => GuardError::Database(other),
        }
    }
}

impl GuardError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GuardError::Validation(msg.into())
    }

    fn log(&self, operation: &'static str) {
        match self {
            GuardError::InvalidId(_)
            | GuardError::Validation(_)
            | GuardError::NotFound
            | GuardError::Constraint(_) => {
                tracing::debug!(operation, error = %self, "guard operation rejected")
            }
            GuardError::UnexpectedCount { .. } => {
                tracing::warn!(operation, error = %self, "guard operation aborted")
            }
            GuardError::Database(_) => {
                tracing::error!(operation, error = %self, "guard operation failed")
            }
        }
    }
}

/// Log a failed outcome and reduce it to `None`.
pub(crate) trait Collapse<T> {
    fn collapse(self, operation: &'static str) -> Option<T>;
}

impl<T> Collapse<T> for Result<T, GuardError> {
    fn collapse(self, operation: &'static str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                err.log(operation);
                None
            }
        }
    }
}
