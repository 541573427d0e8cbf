use sqlx::sqlite::SqliteQueryResult;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use common::id::ObjectId;
use common::metadata::{AccessKey, FileRevision};

use crate::database::types::DObjectId;

#[derive(Debug, Clone, FromRow)]
pub struct RevisionRecord {
    pub id: DObjectId,
    pub file_id: DObjectId,
    pub owner_id: DObjectId,
    pub size_bytes: i64,
    pub quick_number: u32,
    pub changed_at: OffsetDateTime,
}

impl RevisionRecord {
    /// Add a revision to `file`, owned by the file's owner.
    pub async fn insert(
        id: &ObjectId,
        file: &ObjectId,
        size_bytes: u64,
        quick_number: u32,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        let size_bytes =
            i64::try_from(size_bytes).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            r#"
            INSERT INTO revisions (id, file_id, owner_id, size_bytes, quick_number, changed_at)
            SELECT ?1, f.id, f.owner_id, ?3, ?4, ?5
            FROM files f
            WHERE f.id = ?2
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(file))
        .bind(size_bytes)
        .bind(quick_number)
        .bind(OffsetDateTime::now_utc())
        .execute(conn)
        .await
    }

    /// All revisions of a file, oldest first.
    pub async fn for_file(
        file: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<RevisionRecord>, sqlx::Error> {
        sqlx::query_as::<_, RevisionRecord>(
            r#"
            SELECT id, file_id, owner_id, size_bytes, quick_number, changed_at
            FROM revisions
            WHERE file_id = ?1
            ORDER BY quick_number
            "#,
        )
        .bind(DObjectId::from(file))
        .fetch_all(conn)
        .await
    }

    pub async fn ids_for_file(
        file: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<DObjectId>, sqlx::Error> {
        sqlx::query_scalar::<_, DObjectId>(
            "SELECT id FROM revisions WHERE file_id = ?1 ORDER BY quick_number",
        )
        .bind(DObjectId::from(file))
        .fetch_all(conn)
        .await
    }

    pub fn into_view(self, access_key: Option<AccessKey>) -> FileRevision {
        FileRevision {
            id: self.id.into(),
            quick_number: self.quick_number,
            size_bytes: self.size_bytes.max(0) as u64,
            changed_at: self.changed_at,
            access_key,
        }
    }
}
