use sqlx::sqlite::SqliteQueryResult;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use common::id::ObjectId;
use common::metadata::{DocumentLanguage, ExtensionType, Tag};
use common::permission::Permission;

use super::acl::AclRecord;
use crate::database::types::{DObjectId, DPermission};

#[derive(Debug, Clone, FromRow)]
pub struct FileRecord {
    pub id: DObjectId,
    pub owner_id: DObjectId,
    pub parent_id: DObjectId,
    pub name: String,
    pub quick_number: u32,
    pub extension: String,
    pub language: String,
    pub thumbnail_id: Option<String>,
    pub tags: Json<Vec<Tag>>,
}

/// A child file joined with the revision picked for a directory listing.
#[derive(Debug, Clone, FromRow)]
pub struct FileChildRecord {
    pub id: DObjectId,
    pub name: String,
    pub quick_number: u32,
    pub extension: String,
    pub language: String,
    pub revision_id: DObjectId,
    pub revision_quick_number: u32,
    pub size_bytes: i64,
    pub changed_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    pub id: &'a ObjectId,
    pub parent_id: &'a ObjectId,
    pub name: &'a str,
    pub quick_number: u32,
    pub extension: ExtensionType,
    pub language: DocumentLanguage,
}

impl FileRecord {
    pub fn extension(&self) -> ExtensionType {
        ExtensionType::parse(&self.extension)
    }

    pub fn language(&self) -> DocumentLanguage {
        DocumentLanguage::parse(&self.language)
    }

    /// Create the file at the end of its parent's children, owned by the
    /// parent's owner, if `requester` may write to the parent.
    pub async fn insert(
        requester: &ObjectId,
        file: &NewFile<'_>,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            INSERT INTO files (id, owner_id, parent_id, name, position, quick_number, extension, language)
            SELECT
                ?1, p.owner_id, p.id, ?3,
                COALESCE((SELECT MAX(c.position) + 1 FROM files c WHERE c.parent_id = p.id), 0),
                ?4, ?5, ?6
            FROM directories p
            WHERE p.id = ?2 AND "#,
            directory_grants!("p.id", "?7", WRITE)
        ))
        .bind(DObjectId::from(file.id))
        .bind(DObjectId::from(file.parent_id))
        .bind(file.name)
        .bind(file.quick_number)
        .bind(file.extension.as_str())
        .bind(file.language.as_str())
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }

    /// Snapshot a directory's ACL onto a freshly created file.
    pub async fn copy_acl_from_directory(
        directory: &ObjectId,
        file: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO file_acl (file_id, user_id, permission)
            SELECT ?2, user_id, permission
            FROM directory_acl
            WHERE directory_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(DObjectId::from(directory))
        .bind(DObjectId::from(file))
        .execute(conn)
        .await
    }

    pub async fn grant(
        id: &ObjectId,
        user: &ObjectId,
        permission: Permission,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO file_acl (file_id, user_id, permission)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (file_id, user_id) DO UPDATE SET permission = excluded.permission
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(user))
        .bind(DPermission::from(permission))
        .execute(conn)
        .await
    }

    pub async fn revoke(
        id: &ObjectId,
        user: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query("DELETE FROM file_acl WHERE file_id = ?1 AND user_id = ?2")
            .bind(DObjectId::from(id))
            .bind(DObjectId::from(user))
            .execute(conn)
            .await
    }

    pub async fn acl(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<AclRecord>, sqlx::Error> {
        sqlx::query_as::<_, AclRecord>(
            r#"
            SELECT file_id AS object_id, user_id, permission
            FROM file_acl
            WHERE file_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(DObjectId::from(id))
        .fetch_all(conn)
        .await
    }

    /// ACL rows of every file directly inside `parent`.
    pub async fn child_acls(
        parent: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<AclRecord>, sqlx::Error> {
        sqlx::query_as::<_, AclRecord>(
            r#"
            SELECT a.file_id AS object_id, a.user_id, a.permission
            FROM file_acl a
            JOIN files f ON f.id = a.file_id
            WHERE f.parent_id = ?1
            ORDER BY a.rowid
            "#,
        )
        .bind(DObjectId::from(parent))
        .fetch_all(conn)
        .await
    }

    pub async fn readable(
        requester: &ObjectId,
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(concat!(
            r#"
            SELECT f.id, f.owner_id, f.parent_id, f.name, f.quick_number,
                   f.extension, f.language, f.thumbnail_id, f.tags
            FROM files f
            WHERE f.id = ?1 AND "#,
            file_grants!("f.id", "?2", READ)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(requester))
        .fetch_optional(conn)
        .await
    }

    pub async fn writable(
        requester: &ObjectId,
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(concat!(
            r#"
            SELECT f.id, f.owner_id, f.parent_id, f.name, f.quick_number,
                   f.extension, f.language, f.thumbnail_id, f.tags
            FROM files f
            WHERE f.id = ?1 AND "#,
            file_grants!("f.id", "?2", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(requester))
        .fetch_optional(conn)
        .await
    }

    /// Readable files directly inside `parent`, each with the newest
    /// revision whose quick number is at most `selector` (or the newest
    /// overall). Files with no such revision are left out.
    pub async fn children(
        requester: &ObjectId,
        parent: &ObjectId,
        selector: Option<u32>,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<FileChildRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileChildRecord>(concat!(
            r#"
            SELECT
                f.id, f.name, f.quick_number, f.extension, f.language,
                r.id AS revision_id,
                r.quick_number AS revision_quick_number,
                r.size_bytes,
                r.changed_at
            FROM files f
            JOIN revisions r ON r.id = (
                SELECT r2.id FROM revisions r2
                WHERE r2.file_id = f.id
                  AND (?3 IS NULL OR r2.quick_number <= ?3)
                ORDER BY r2.quick_number DESC
                LIMIT 1
            )
            WHERE f.parent_id = ?1 AND "#,
            file_grants!("f.id", "?2", READ),
            r#"
            ORDER BY f.position
            "#
        ))
        .bind(DObjectId::from(parent))
        .bind(DObjectId::from(requester))
        .bind(selector)
        .fetch_all(conn)
        .await
    }

    pub async fn rename(
        requester: &ObjectId,
        id: &ObjectId,
        name: &str,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            UPDATE files
            SET name = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1 AND "#,
            file_grants!("files.id", "?3", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(name)
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }

    /// Move the file to the end of `new_parent`'s children. Needs write on
    /// both the current and the new parent directory; the file keeps its
    /// own ACL.
    pub async fn reparent(
        requester: &ObjectId,
        id: &ObjectId,
        new_parent: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            UPDATE files
            SET
                parent_id = ?2,
                position = COALESCE((SELECT MAX(c.position) + 1 FROM files c WHERE c.parent_id = ?2), 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
              AND parent_id != ?2
              AND "#,
            directory_grants!("files.parent_id", "?3", WRITE),
            r#"
              AND "#,
            directory_grants!("?2", "?3", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(new_parent))
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }

    pub async fn set_quick_number(
        id: &ObjectId,
        quick_number: u32,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE files
            SET quick_number = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(quick_number)
        .execute(conn)
        .await
    }

    /// Delete a file the requester may write to, with its revisions and
    /// keys.
    pub async fn delete(
        requester: &ObjectId,
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            DELETE FROM files
            WHERE id = ?1 AND "#,
            file_grants!("files.id", "?2", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }
}
