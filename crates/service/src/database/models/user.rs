use sqlx::sqlite::SqliteQueryResult;
use sqlx::{FromRow, SqliteExecutor};

use common::id::ObjectId;
use common::metadata::{UserCredentials, UserInformation};

use crate::database::types::DObjectId;

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: DObjectId,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub public_key: String,
    pub encrypted_private_key: String,
    pub root_directory_id: DObjectId,
    pub quick_number: u32,
}

/// Fields supplied when registering a user.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub id: &'a ObjectId,
    pub root_directory_id: &'a ObjectId,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub salt: &'a str,
    pub public_key: &'a str,
    pub encrypted_private_key: &'a str,
}

const USER_COLUMNS: &str = "id, email, password_hash, salt, public_key, encrypted_private_key, root_directory_id, quick_number";

impl UserRecord {
    pub async fn insert(
        user: &NewUser<'_>,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, salt, public_key,
                encrypted_private_key, root_directory_id
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(DObjectId::from(user.id))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.salt)
        .bind(user.public_key)
        .bind(user.encrypted_private_key)
        .bind(DObjectId::from(user.root_directory_id))
        .execute(conn)
        .await
    }

    pub async fn get(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(DObjectId::from(id))
        .fetch_optional(conn)
        .await
    }

    pub async fn by_email(
        email: &str,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(conn)
        .await
    }

    /// Users whose email is in `emails`; unknown addresses are skipped.
    pub async fn by_emails(
        emails: &[String],
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<UserRecord>, sqlx::Error> {
        let emails = serde_json::to_string(emails).map_err(|e| sqlx::Error::Encode(e.into()))?;
        sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email IN (SELECT value FROM json_each(?1)) ORDER BY email",
            USER_COLUMNS
        ))
        .bind(emails)
        .fetch_all(conn)
        .await
    }

    /// Atomically bump and return the owner's quick number.
    pub async fn next_quick_number(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<u32>, sqlx::Error> {
        sqlx::query_scalar::<_, u32>(
            r#"
            UPDATE users
            SET quick_number = quick_number + 1
            WHERE id = ?1
            RETURNING quick_number
            "#,
        )
        .bind(DObjectId::from(id))
        .fetch_optional(conn)
        .await
    }

    pub async fn delete(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(DObjectId::from(id))
            .execute(conn)
            .await
    }

    /// Every revision that goes away with this user: revisions they own,
    /// files they own, and anything under a directory they own.
    pub async fn owned_revision_ids(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<DObjectId>, sqlx::Error> {
        sqlx::query_scalar::<_, DObjectId>(
            r#"
            SELECT r.id
            FROM revisions r
            JOIN files f ON f.id = r.file_id
            JOIN directories p ON p.id = f.parent_id
            WHERE r.owner_id = ?1
               OR f.owner_id = ?1
               OR EXISTS (
                   SELECT 1 FROM directories o
                   WHERE o.owner_id = ?1
                     AND instr(p.path, '/' || o.id || '/') > 0
               )
            ORDER BY r.quick_number
            "#,
        )
        .bind(DObjectId::from(id))
        .fetch_all(conn)
        .await
    }
}

impl From<UserRecord> for UserInformation {
    fn from(row: UserRecord) -> Self {
        UserInformation {
            id: row.id.into(),
            email: row.email,
            password_hash: row.password_hash,
            salt: row.salt,
            public_key: row.public_key,
            encrypted_private_key: row.encrypted_private_key,
            root_directory_id: row.root_directory_id.into(),
            quick_number: row.quick_number,
        }
    }
}

impl From<UserRecord> for UserCredentials {
    fn from(row: UserRecord) -> Self {
        UserCredentials {
            id: row.id.into(),
            password_hash: row.password_hash,
            salt: row.salt,
            public_key: row.public_key,
            encrypted_private_key: row.encrypted_private_key,
        }
    }
}
