//! Every multi-row mutation runs as: begin, act, then commit if each step
//! touched exactly the rows it meant to, or roll back otherwise.
//!
//! Steps take the connection behind the transaction (`&mut *tx`) and return
//! `Result<_, GuardError>`; [`finish`] turns the combined result into a
//! commit or an explicit rollback.
//!
//! Transactions start with `BEGIN IMMEDIATE`, so writers queue on the busy
//! timeout. A deferred one that reads first cannot upgrade to a writer after
//! another connection commits.

use sqlx::sqlite::SqliteQueryResult;
use sqlx::{Sqlite, Transaction};

use crate::database::Database;
use crate::error::GuardError;

pub(crate) async fn begin(db: &Database) -> Result<Transaction<'static, Sqlite>, GuardError> {
    Ok(db.begin_with("BEGIN IMMEDIATE").await?)
}

/// Commit on success, roll back on failure.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    result: Result<T, GuardError>,
) -> Result<T, GuardError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

/// Fail the step unless it affected exactly `expected` rows.
pub(crate) fn expect_rows(
    result: SqliteQueryResult,
    expected: u64,
    step: &'static str,
) -> Result<(), GuardError> {
    let actual = result.rows_affected();
    if actual != expected {
        return Err(GuardError::UnexpectedCount {
            step,
            expected,
            actual,
        });
    }
    Ok(())
}

/// A conditional single-row write that matched nothing was refused by its
/// own predicate: missing object or missing permission.
pub(crate) fn expect_one(result: SqliteQueryResult) -> Result<(), GuardError> {
    match result.rows_affected() {
        1 => Ok(()),
        0 => Err(GuardError::NotFound),
        actual => Err(GuardError::UnexpectedCount {
            step: "conditional write",
            expected: 1,
            actual,
        }),
    }
}
