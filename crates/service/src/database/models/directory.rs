use sqlx::sqlite::SqliteQueryResult;
use sqlx::{FromRow, SqliteExecutor};

use common::id::ObjectId;
use common::permission::Permission;

use super::acl::AclRecord;
use crate::database::types::{DObjectId, DPath, DPermission};

pub const ROOT_DIRECTORY_NAME: &str = "__root_dir";

#[derive(Debug, Clone, FromRow)]
pub struct DirectoryRecord {
    pub id: DObjectId,
    pub owner_id: DObjectId,
    pub parent_id: Option<DObjectId>,
    pub name: String,
    pub path: DPath,
    pub is_root: bool,
}

/// A child directory with the number of entries directly inside it.
#[derive(Debug, Clone, FromRow)]
pub struct DirectoryChildRecord {
    pub id: DObjectId,
    pub name: String,
    pub child_count: u32,
}

impl DirectoryRecord {
    pub async fn insert_root(
        owner: &ObjectId,
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO directories (id, owner_id, parent_id, name, path, is_root)
            VALUES (?1, ?2, NULL, ?3, ?4, TRUE)
            "#,
        )
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(owner))
        .bind(ROOT_DIRECTORY_NAME)
        .bind(DPath::from(vec![id.clone()]))
        .execute(conn)
        .await
    }

    /// Create `id` under `parent` if `requester` may write to the parent.
    ///
    /// The new directory belongs to the parent's owner and goes to the end
    /// of the parent's child list.
    pub async fn insert_child(
        requester: &ObjectId,
        parent: &ObjectId,
        id: &ObjectId,
        name: &str,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            INSERT INTO directories (id, owner_id, parent_id, name, path, position)
            SELECT
                ?1, p.owner_id, p.id, ?3, p.path || ?1 || '/',
                COALESCE((SELECT MAX(c.position) + 1 FROM directories c WHERE c.parent_id = p.id), 0)
            FROM directories p
            WHERE p.id = ?2 AND "#,
            directory_grants!("p.id", "?4", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(parent))
        .bind(name)
        .bind(DObjectId::from(requester))
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
            INSERT INTO directory_acl (directory_id, user_id, permission)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (directory_id, user_id) DO UPDATE SET permission = excluded.permission
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
        sqlx::query("DELETE FROM directory_acl WHERE directory_id = ?1 AND user_id = ?2")
            .bind(DObjectId::from(id))
            .bind(DObjectId::from(user))
            .execute(conn)
            .await
    }

    /// Snapshot the ACL of `from` onto the freshly created `to`.
    pub async fn copy_acl(
        from: &ObjectId,
        to: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO directory_acl (directory_id, user_id, permission)
            SELECT ?2, user_id, permission
            FROM directory_acl
            WHERE directory_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(DObjectId::from(from))
        .bind(DObjectId::from(to))
        .execute(conn)
        .await
    }

    pub async fn acl(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<AclRecord>, sqlx::Error> {
        sqlx::query_as::<_, AclRecord>(
            r#"
            SELECT directory_id AS object_id, user_id, permission
            FROM directory_acl
            WHERE directory_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(DObjectId::from(id))
        .fetch_all(conn)
        .await
    }

    /// ACL rows of every direct child directory of `parent`.
    pub async fn child_acls(
        parent: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<AclRecord>, sqlx::Error> {
        sqlx::query_as::<_, AclRecord>(
            r#"
            SELECT a.directory_id AS object_id, a.user_id, a.permission
            FROM directory_acl a
            JOIN directories d ON d.id = a.directory_id
            WHERE d.parent_id = ?1
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
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DirectoryRecord>(concat!(
            r#"
            SELECT d.id, d.owner_id, d.parent_id, d.name, d.path, d.is_root
            FROM directories d
            WHERE d.id = ?1 AND "#,
            directory_grants!("d.id", "?2", READ)
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
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DirectoryRecord>(concat!(
            r#"
            SELECT d.id, d.owner_id, d.parent_id, d.name, d.path, d.is_root
            FROM directories d
            WHERE d.id = ?1 AND "#,
            directory_grants!("d.id", "?2", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(requester))
        .fetch_optional(conn)
        .await
    }

    pub async fn get(
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Option<DirectoryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DirectoryRecord>(
            r#"
            SELECT id, owner_id, parent_id, name, path, is_root
            FROM directories
            WHERE id = ?1
            "#,
        )
        .bind(DObjectId::from(id))
        .fetch_optional(conn)
        .await
    }

    /// Direct child directories of `parent` the requester can read, in
    /// insertion order.
    pub async fn children(
        requester: &ObjectId,
        parent: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<DirectoryChildRecord>, sqlx::Error> {
        sqlx::query_as::<_, DirectoryChildRecord>(concat!(
            r#"
            SELECT
                d.id,
                d.name,
                (SELECT COUNT(*) FROM directories c WHERE c.parent_id = d.id)
                    + (SELECT COUNT(*) FROM files f WHERE f.parent_id = d.id) AS child_count
            FROM directories d
            WHERE d.parent_id = ?1 AND "#,
            directory_grants!("d.id", "?2", READ),
            r#"
            ORDER BY d.position
            "#
        ))
        .bind(DObjectId::from(parent))
        .bind(DObjectId::from(requester))
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
            UPDATE directories
            SET name = ?2, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1 AND "#,
            directory_grants!("directories.id", "?3", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(name)
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }

    /// Re-point `id` at `new_parent`, appending it to the new parent's
    /// children.
    ///
    /// Matches nothing unless the requester may write to both the current
    /// and the new parent, the parent actually changes, and the new parent
    /// is not `id` or one of its descendants.
    pub async fn reparent(
        requester: &ObjectId,
        id: &ObjectId,
        new_parent: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            UPDATE directories
            SET
                parent_id = ?2,
                position = COALESCE((SELECT MAX(c.position) + 1 FROM directories c WHERE c.parent_id = ?2), 0),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?1
              AND id != ?2
              AND parent_id IS NOT NULL
              AND parent_id != ?2
              AND NOT EXISTS (
                  SELECT 1 FROM directories np
                  WHERE np.id = ?2 AND instr(np.path, '/' || ?1 || '/') > 0
              )
              AND "#,
            directory_grants!("directories.parent_id", "?3", WRITE),
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

    /// Drop `prefix` from the front of every path in the subtree of `node`,
    /// keeping the separator: `/r/a/n/x/` with prefix `/r/a/` becomes `/n/x/`.
    pub async fn strip_path_prefix(
        node: &ObjectId,
        prefix: &DPath,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE directories
            SET path = substr(path, length(?2))
            WHERE instr(path, '/' || ?1 || '/') > 0
              AND substr(path, 1, length(?2)) = ?2
            "#,
        )
        .bind(DObjectId::from(node))
        .bind(prefix.encode())
        .execute(conn)
        .await
    }

    /// Put `prefix` in front of every path in the subtree of `node`.
    pub async fn prepend_path_prefix(
        node: &ObjectId,
        prefix: &DPath,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE directories
            SET path = ?2 || substr(path, 2)
            WHERE instr(path, '/' || ?1 || '/') > 0
            "#,
        )
        .bind(DObjectId::from(node))
        .bind(prefix.encode())
        .execute(conn)
        .await
    }

    /// Number of directories in the subtree of `node`, itself included.
    pub async fn subtree_size(
        node: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<u64, sqlx::Error> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM directories WHERE instr(path, '/' || ?1 || '/') > 0",
        )
        .bind(DObjectId::from(node))
        .fetch_one(conn)
        .await?;
        Ok(count.max(0) as u64)
    }

    /// Every revision of every file anywhere under `node`.
    pub async fn subtree_revision_ids(
        node: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<Vec<DObjectId>, sqlx::Error> {
        sqlx::query_scalar::<_, DObjectId>(
            r#"
            SELECT r.id
            FROM revisions r
            JOIN files f ON f.id = r.file_id
            JOIN directories d ON d.id = f.parent_id
            WHERE instr(d.path, '/' || ?1 || '/') > 0
            ORDER BY r.quick_number
            "#,
        )
        .bind(DObjectId::from(node))
        .fetch_all(conn)
        .await
    }

    /// Delete a non-root directory the requester may write to. Descendants,
    /// their files, revisions, keys and ACL rows go with it by cascade.
    pub async fn delete(
        requester: &ObjectId,
        id: &ObjectId,
        conn: impl SqliteExecutor<'_>,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlx::query(concat!(
            r#"
            DELETE FROM directories
            WHERE id = ?1
              AND NOT is_root
              AND "#,
            directory_grants!("directories.id", "?2", WRITE)
        ))
        .bind(DObjectId::from(id))
        .bind(DObjectId::from(requester))
        .execute(conn)
        .await
    }
}
