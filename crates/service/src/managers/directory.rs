use common::id::{IdKind, ObjectId};
use common::metadata::{
    DirectoryMetadata, DirectorySummary, DocumentLanguage, ExtensionType, FileRevision,
    FileSummary, ObjectSummary, PermissionResponse,
};
use common::permission::{self, Permission};

use super::{check_keeps_permission_writer, check_name, entries, object_ids, permission_for};
use crate::database::models::{AccessKeyRecord, AclRecord, DirectoryRecord, FileRecord};
use crate::database::Database;
use crate::error::{Collapse, GuardError};
use crate::transaction::{self, expect_one, expect_rows};

/// Directory tree operations: creation, moves, renames, deletion and
/// listings.
#[derive(Clone, Debug)]
pub struct DirectoryManager {
    db: Database,
}

impl DirectoryManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create `directory_id` named `name` under `parent_id`, with a copy of
    /// the parent's ACL.
    #[tracing::instrument(skip(self))]
    pub async fn insert_directory(
        &self,
        requester: &ObjectId,
        parent_id: &ObjectId,
        name: &str,
        directory_id: &ObjectId,
    ) -> bool {
        self.try_insert(requester, parent_id, name, directory_id)
            .await
            .collapse("insert_directory")
            .is_some()
    }

    /// Move `directory_id` under `new_parent_id`, rewriting the path of the
    /// whole subtree.
    #[tracing::instrument(skip(self))]
    pub async fn move_directory(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> bool {
        self.try_move(requester, directory_id, new_parent_id)
            .await
            .collapse("move_directory")
            .is_some()
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_directory(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        name: &str,
    ) -> bool {
        self.try_rename(requester, directory_id, name)
            .await
            .collapse("rename_directory")
            .is_some()
    }

    /// Delete a directory with everything below it. Returns the ids of all
    /// revisions that went with it, so their blobs can be purged.
    #[tracing::instrument(skip(self))]
    pub async fn delete_directory(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
    ) -> Option<Vec<ObjectId>> {
        self.try_delete(requester, directory_id)
            .await
            .collapse("delete_directory")
    }

    /// Directory view with its direct children. `revision_selector` picks,
    /// per child file, the newest revision with a quick number no greater
    /// than it; files without one are left out.
    #[tracing::instrument(skip(self))]
    pub async fn get_directory_metadata(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        revision_selector: Option<u32>,
    ) -> Option<DirectoryMetadata> {
        self.try_metadata(requester, directory_id, revision_selector)
            .await
            .collapse("get_directory_metadata")
    }

    /// `target`'s flags on each of `directory_ids`, as far as `requester`
    /// may see them. Ids the requester learns nothing about are left out.
    #[tracing::instrument(skip(self))]
    pub async fn get_permissions(
        &self,
        requester: &ObjectId,
        target: &ObjectId,
        directory_ids: &[ObjectId],
    ) -> Vec<PermissionResponse> {
        self.try_permissions(requester, target, directory_ids)
            .await
            .collapse("get_directory_permissions")
            .unwrap_or_default()
    }

    /// Set `subject`'s flags on this directory alone; empty flags remove
    /// the entry.
    #[tracing::instrument(skip(self))]
    pub async fn set_permission(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        subject: &ObjectId,
        permission: Permission,
    ) -> bool {
        self.try_set_permission(requester, directory_id, subject, permission)
            .await
            .collapse("set_directory_permission")
            .is_some()
    }

    async fn try_insert(
        &self,
        requester: &ObjectId,
        parent_id: &ObjectId,
        name: &str,
        directory_id: &ObjectId,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        parent_id.expect_kind(IdKind::Directory)?;
        directory_id.expect_kind(IdKind::Directory)?;
        check_name(name)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<_, GuardError> = async {
            expect_one(
                DirectoryRecord::insert_child(requester, parent_id, directory_id, name, &mut *tx)
                    .await?,
            )?;
            let acl = DirectoryRecord::acl(parent_id, &mut *tx).await?;
            expect_rows(
                DirectoryRecord::copy_acl(parent_id, directory_id, &mut *tx).await?,
                acl.len() as u64,
                "copy parent acl",
            )
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_move(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        directory_id.expect_kind(IdKind::Directory)?;
        new_parent_id.expect_kind(IdKind::Directory)?;
        if directory_id == new_parent_id {
            return Err(GuardError::validation("cannot move a directory into itself"));
        }

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<_, GuardError> = async {
            let node = DirectoryRecord::get(directory_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            let old_parent_id = node.parent_id.ok_or(GuardError::NotFound)?;
            let old_parent = DirectoryRecord::get(&old_parent_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            let new_parent = DirectoryRecord::get(new_parent_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;

            expect_one(
                DirectoryRecord::reparent(requester, directory_id, new_parent_id, &mut *tx).await?,
            )?;

            let stripped =
                DirectoryRecord::strip_path_prefix(directory_id, &old_parent.path, &mut *tx)
                    .await?
                    .rows_affected();
            let prefixed =
                DirectoryRecord::prepend_path_prefix(directory_id, &new_parent.path, &mut *tx)
                    .await?
                    .rows_affected();
            if stripped == 0 || stripped != prefixed {
                return Err(GuardError::UnexpectedCount {
                    step: "rewrite subtree paths",
                    expected: stripped,
                    actual: prefixed,
                });
            }

            tracing::debug!(moved = stripped, "subtree paths rewritten");
            Ok(())
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_rename(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        name: &str,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        directory_id.expect_kind(IdKind::Directory)?;
        check_name(name)?;

        expect_one(DirectoryRecord::rename(requester, directory_id, name, &*self.db).await?)
    }

    async fn try_delete(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
    ) -> Result<Vec<ObjectId>, GuardError> {
        requester.expect_kind(IdKind::User)?;
        directory_id.expect_kind(IdKind::Directory)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<_, GuardError> = async {
            let revisions = DirectoryRecord::subtree_revision_ids(directory_id, &mut *tx).await?;
            expect_one(DirectoryRecord::delete(requester, directory_id, &mut *tx).await?)?;

            let left = DirectoryRecord::subtree_size(directory_id, &mut *tx).await?;
            if left != 0 {
                return Err(GuardError::UnexpectedCount {
                    step: "cascade subtree",
                    expected: 0,
                    actual: left,
                });
            }
            Ok(object_ids(revisions))
        }
        .await;
        transaction::finish(tx, result).await
    }

    // Several independent reads, deliberately outside a transaction.
    async fn try_metadata(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        revision_selector: Option<u32>,
    ) -> Result<DirectoryMetadata, GuardError> {
        requester.expect_kind(IdKind::User)?;
        directory_id.expect_kind(IdKind::Directory)?;

        let conn = &*self.db;
        let directory = DirectoryRecord::readable(requester, directory_id, conn)
            .await?
            .ok_or(GuardError::NotFound)?;
        let acl = entries(DirectoryRecord::acl(directory_id, conn).await?);

        let mut directory_acls =
            AclRecord::group(DirectoryRecord::child_acls(directory_id, conn).await?);
        let directories = DirectoryRecord::children(requester, directory_id, conn)
            .await?
            .into_iter()
            .map(|child| {
                let id = ObjectId::from(child.id);
                let acl = directory_acls.remove(&id).unwrap_or_default();
                DirectorySummary {
                    object: ObjectSummary {
                        permissions: permission::visible_entries(&acl, requester),
                        id,
                        name: child.name,
                    },
                    child_count: child.child_count,
                }
            })
            .collect();

        let mut file_acls = AclRecord::group(FileRecord::child_acls(directory_id, conn).await?);
        let mut keys = AccessKeyRecord::own_in_directory(requester, directory_id, conn).await?;
        let files = FileRecord::children(requester, directory_id, revision_selector, conn)
            .await?
            .into_iter()
            .map(|child| {
                let id = ObjectId::from(child.id);
                let revision_id = ObjectId::from(child.revision_id);
                let acl = file_acls.remove(&id).unwrap_or_default();
                FileSummary {
                    object: ObjectSummary {
                        permissions: permission::visible_entries(&acl, requester),
                        id,
                        name: child.name,
                    },
                    quick_number: child.quick_number,
                    extension: ExtensionType::parse(&child.extension),
                    language: DocumentLanguage::parse(&child.language),
                    revision: FileRevision {
                        access_key: keys.remove(&revision_id),
                        id: revision_id,
                        quick_number: child.revision_quick_number,
                        size_bytes: child.size_bytes.max(0) as u64,
                        changed_at: child.changed_at,
                    },
                }
            })
            .collect();

        Ok(DirectoryMetadata {
            object: ObjectSummary {
                id: directory.id.into(),
                name: directory.name,
                permissions: permission::visible_entries(&acl, requester),
            },
            owner: directory.owner_id.into(),
            is_root: directory.is_root,
            path: directory.path.into(),
            directories,
            files,
        })
    }

    async fn try_permissions(
        &self,
        requester: &ObjectId,
        target: &ObjectId,
        directory_ids: &[ObjectId],
    ) -> Result<Vec<PermissionResponse>, GuardError> {
        requester.expect_kind(IdKind::User)?;
        target.expect_kind(IdKind::User)?;
        for id in directory_ids {
            id.expect_kind(IdKind::Directory)?;
        }

        let mut responses = Vec::with_capacity(directory_ids.len());
        for id in directory_ids {
            let acl = entries(DirectoryRecord::acl(id, &*self.db).await?);
            responses.extend(permission_for(id, &acl, requester, target));
        }
        Ok(responses)
    }

    async fn try_set_permission(
        &self,
        requester: &ObjectId,
        directory_id: &ObjectId,
        subject: &ObjectId,
        permission: Permission,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        directory_id.expect_kind(IdKind::Directory)?;
        subject.expect_kind(IdKind::User)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<_, GuardError> = async {
            let acl = entries(DirectoryRecord::acl(directory_id, &mut *tx).await?);
            if !permission::holds(&acl, requester, Permission::WRITE_PERMISSIONS) {
                return Err(GuardError::NotFound);
            }
            check_keeps_permission_writer(&acl, subject, permission)?;

            if permission.is_empty() {
                expect_one(DirectoryRecord::revoke(directory_id, subject, &mut *tx).await?)
            } else {
                expect_one(
                    DirectoryRecord::grant(directory_id, subject, permission, &mut *tx).await?,
                )
            }
        }
        .await;
        transaction::finish(tx, result).await
    }
}
