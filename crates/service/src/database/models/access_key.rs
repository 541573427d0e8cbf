use std::collections::HashMap;

use sqlx::sqlite::SqliteQueryResult;
use sqlx::{FromRow, SqliteExecutor};

use common::id::ObjectId;
use common::metadata::AccessKey;

use crate::database::types::DObjectId;

#[derive(Debug, Clone, FromRow)]
pub struct AccessKeyRecord {
    pub revision_id: DObjectId,
    pub user_id: DObjectId,
    pub issuer_id: DObjectId,
    pub encrypted_key: String,
}

/// One revision of a file being staged for sharing, with the requester's
/// own key if they have one.
#[derive(Debug, Clone, FromRow)]
pub struct StagedKeyRecord {
    pub file_id: DObjectId,
    pub revision_id: DObjectId,
    pub user_id: Option<DObjectId>,
    pub issuer_id: Option<DObjectId>,
    pub encrypted_key: Option<String>,
}

impl From<AccessKeyRecord> for AccessKey {
    fn from(row: AccessKeyRecord) -> Self {
        AccessKey {
            user: row.user_id.into(),
            issuer: row.issuer_id.into(),
            encrypted_key: row.encrypted_key,
        }
    }
}

impl StagedKeyRecord {
    pub fn access_key(&self) -> Option<AccessKey> {
        match (&self.user_id, &self.issuer_id, &self.encrypted_key) {
            (Some(user), Some(issuer), Some(key)) => Some(AccessKey {
                user: (**user).clone(),
                issuer: (**issuer).clone(),
                encrypted_key: key.clone(),
            }),
            _ => None,
        }
    }
}

impl AccessKeyRecord {
    pub async fn insert(
        revision: &ObjectId,
        key: &AccessKey,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO access_keys (revision_id, user_id, issuer_id, encrypted_key)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(DObjectId::from(revision))
        .bind(DObjectId::from(&key.user))
        .bind(DObjectId::from(&key.issuer))
        .bind(&key.encrypted_key)
        .execute(conn)
        .await
    }

    /// Add a key issued by `requester` to a revision of a file the
    /// requester may write to.
    pub async fn insert_shared(
        requester: &ObjectId,
        revision: &ObjectId,
        key: &AccessKey,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            INSERT INTO access_keys (revision_id, user_id, issuer_id, encrypted_key)
            SELECT r.id, ?2, ?3, ?4
            FROM revisions r
            JOIN files f ON f.id = r.file_id
            WHERE r.id = ?1 AND "#,
            file_grants!("f.id", "?3", WRITE)
        ))
        .bind(DObjectId::from(revision))
        .bind(DObjectId::from(&key.user))
        .bind(DObjectId::from(requester))
        .bind(&key.encrypted_key)
        .execute(conn)
        .await
    }

    /// The user's own keys for every revision of `file`, by revision id.
    pub async fn own_for_file(
        user: &ObjectId,
        file: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<HashMap<ObjectId, AccessKey>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AccessKeyRecord>(
            r#"
            SELECT k.revision_id, k.user_id, k.issuer_id, k.encrypted_key
            FROM access_keys k
            JOIN revisions r ON r.id = k.revision_id
            WHERE r.file_id = ?1 AND k.user_id = ?2
            "#,
        )
        .bind(DObjectId::from(file))
        .bind(DObjectId::from(user))
        .fetch_all(conn)
        .await?;
        Ok(by_revision(rows))
    }

    /// The user's own keys for every revision of every file directly
    /// inside `directory`, by revision id.
    pub async fn own_in_directory(
        user: &ObjectId,
        directory: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<HashMap<ObjectId, AccessKey>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AccessKeyRecord>(
            r#"
            SELECT k.revision_id, k.user_id, k.issuer_id, k.encrypted_key
            FROM access_keys k
            JOIN revisions r ON r.id = k.revision_id
            JOIN files f ON f.id = r.file_id
            WHERE f.parent_id = ?1 AND k.user_id = ?2
            "#,
        )
        .bind(DObjectId::from(directory))
        .bind(DObjectId::from(user))
        .fetch_all(conn)
        .await?;
        Ok(by_revision(rows))
    }

    /// Revisions of every readable file anywhere under `directory`, with
    /// the requester's own key.
    pub async fn staged_for_subtree(
        requester: &ObjectId,
        directory: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<StagedKeyRecord>, sqlx::Error> {
        sqlx::query_as::<_, StagedKeyRecord>(concat!(
            r#"
            SELECT f.id AS file_id, r.id AS revision_id, k.user_id, k.issuer_id, k.encrypted_key
            FROM files f
            JOIN directories d ON d.id = f.parent_id
            JOIN revisions r ON r.file_id = f.id
            LEFT JOIN access_keys k ON k.revision_id = r.id AND k.user_id = ?2
            WHERE instr(d.path, '/' || ?1 || '/') > 0 AND "#,
            file_grants!("f.id", "?2", READ),
            r#"
            ORDER BY d.path, f.position, f.id, r.quick_number
            "#
        ))
        .bind(DObjectId::from(directory))
        .bind(DObjectId::from(requester))
        .fetch_all(conn)
        .await
    }

    /// Revisions of one file, with the requester's own key.
    pub async fn staged_for_file(
        requester: &ObjectId,
        file: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<StagedKeyRecord>, sqlx::Error> {
        sqlx::query_as::<_, StagedKeyRecord>(
            r#"
            SELECT r.file_id, r.id AS revision_id, k.user_id, k.issuer_id, k.encrypted_key
            FROM revisions r
            LEFT JOIN access_keys k ON k.revision_id = r.id AND k.user_id = ?2
            WHERE r.file_id = ?1
            ORDER BY r.quick_number
            "#,
        )
        .bind(DObjectId::from(file))
        .bind(DObjectId::from(requester))
        .fetch_all(conn)
        .await
    }
}

fn by_revision(rows: Vec<AccessKeyRecord>) -> HashMap<ObjectId, AccessKey> {
    rows.into_iter()
        .map(|row| (ObjectId::from(row.revision_id.clone()), AccessKey::from(row)))
        .collect()
}
