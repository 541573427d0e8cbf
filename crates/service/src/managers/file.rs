use common::id::{IdKind, ObjectId};
use common::metadata::{
    AccessKey, DocumentLanguage, ExtensionType, FileMetadata, ObjectSummary, PermissionResponse,
};
use common::permission::{self, Permission};

use super::{
    check_issued_keys, check_keeps_permission_writer, check_key_set, check_name, entries,
    object_ids, permission_for,
};
use crate::database::models::file::NewFile;
use crate::database::models::{
    AccessKeyRecord, DirectoryRecord, FileRecord, RevisionRecord, UserRecord,
};
use crate::database::Database;
use crate::error::{Collapse, GuardError};
use crate::transaction::{self, expect_one, expect_rows};

/// Files and their revisions.
#[derive(Clone, Debug)]
pub struct FileManager {
    db: Database,
}

impl FileManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a file with its first revision under `parent_id`.
    ///
    /// `access_keys` must hold exactly one key per user on the parent's
    /// ACL, each issued by `requester`. Returns the quick number stamped on
    /// the file and the revision.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, access_keys))]
    pub async fn insert_file(
        &self,
        requester: &ObjectId,
        parent_id: &ObjectId,
        file_id: &ObjectId,
        revision_id: &ObjectId,
        name: &str,
        size_bytes: u64,
        access_keys: &[AccessKey],
        language: DocumentLanguage,
        extension: ExtensionType,
    ) -> Option<u32> {
        let file = NewFile {
            id: file_id,
            parent_id,
            name,
            quick_number: 0,
            extension,
            language,
        };
        self.try_insert(requester, file, revision_id, size_bytes, access_keys)
            .await
            .collapse("insert_file")
    }

    /// Add a revision to an existing file. `access_keys` must cover the
    /// file's ACL exactly.
    #[tracing::instrument(skip(self, access_keys))]
    pub async fn insert_revision(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        revision_id: &ObjectId,
        size_bytes: u64,
        access_keys: &[AccessKey],
    ) -> Option<u32> {
        self.try_insert_revision(requester, file_id, revision_id, size_bytes, access_keys)
            .await
            .collapse("insert_revision")
    }

    /// File view with all revisions, or just `revision_id`. Each revision
    /// carries only the requester's own access key.
    #[tracing::instrument(skip(self))]
    pub async fn get_file_metadata(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        revision_id: Option<&ObjectId>,
    ) -> Option<FileMetadata> {
        self.try_metadata(requester, file_id, revision_id)
            .await
            .collapse("get_file_metadata")
    }

    #[tracing::instrument(skip(self))]
    pub async fn move_file(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> bool {
        self.try_move(requester, file_id, new_parent_id)
            .await
            .collapse("move_file")
            .is_some()
    }

    #[tracing::instrument(skip(self))]
    pub async fn rename_file(&self, requester: &ObjectId, file_id: &ObjectId, name: &str) -> bool {
        self.try_rename(requester, file_id, name)
            .await
            .collapse("rename_file")
            .is_some()
    }

    /// Delete a file. Returns the ids of its revisions for blob purging.
    #[tracing::instrument(skip(self))]
    pub async fn delete_file(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
    ) -> Option<Vec<ObjectId>> {
        self.try_delete(requester, file_id)
            .await
            .collapse("delete_file")
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_permissions(
        &self,
        requester: &ObjectId,
        target: &ObjectId,
        file_ids: &[ObjectId],
    ) -> Vec<PermissionResponse> {
        self.try_permissions(requester, target, file_ids)
            .await
            .collapse("get_file_permissions")
            .unwrap_or_default()
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_permission(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        subject: &ObjectId,
        permission: Permission,
    ) -> bool {
        self.try_set_permission(requester, file_id, subject, permission)
            .await
            .collapse("set_file_permission")
            .is_some()
    }

    async fn try_insert(
        &self,
        requester: &ObjectId,
        mut file: NewFile<'_>,
        revision_id: &ObjectId,
        size_bytes: u64,
        access_keys: &[AccessKey],
    ) -> Result<u32, GuardError> {
        requester.expect_kind(IdKind::User)?;
        file.parent_id.expect_kind(IdKind::Directory)?;
        file.id.expect_kind(IdKind::File)?;
        revision_id.expect_kind(IdKind::FileBlob)?;
        check_name(file.name)?;
        check_issued_keys(requester, access_keys)?;
        check_key_set(
            &DirectoryRecord::acl(file.parent_id, &*self.db).await?,
            access_keys,
        )?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<u32, GuardError> = async {
            let parent = DirectoryRecord::writable(requester, file.parent_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            // the ACL may have changed since the check above
            let acl = DirectoryRecord::acl(file.parent_id, &mut *tx).await?;
            check_key_set(&acl, access_keys)?;

            let quick_number = UserRecord::next_quick_number(&parent.owner_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            file.quick_number = quick_number;

            expect_one(FileRecord::insert(requester, &file, &mut *tx).await?)?;
            expect_rows(
                FileRecord::copy_acl_from_directory(file.parent_id, file.id, &mut *tx).await?,
                acl.len() as u64,
                "copy parent acl",
            )?;
            expect_one(
                RevisionRecord::insert(revision_id, file.id, size_bytes, quick_number, &mut *tx)
                    .await?,
            )?;
            for key in access_keys {
                expect_one(AccessKeyRecord::insert(revision_id, key, &mut *tx).await?)?;
            }
            Ok(quick_number)
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_insert_revision(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        revision_id: &ObjectId,
        size_bytes: u64,
        access_keys: &[AccessKey],
    ) -> Result<u32, GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;
        revision_id.expect_kind(IdKind::FileBlob)?;
        check_issued_keys(requester, access_keys)?;
        check_key_set(&FileRecord::acl(file_id, &*self.db).await?, access_keys)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<u32, GuardError> = async {
            let file = FileRecord::writable(requester, file_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            check_key_set(&FileRecord::acl(file_id, &mut *tx).await?, access_keys)?;

            let quick_number = UserRecord::next_quick_number(&file.owner_id, &mut *tx)
                .await?
                .ok_or(GuardError::NotFound)?;
            expect_one(
                RevisionRecord::insert(revision_id, file_id, size_bytes, quick_number, &mut *tx)
                    .await?,
            )?;
            for key in access_keys {
                expect_one(AccessKeyRecord::insert(revision_id, key, &mut *tx).await?)?;
            }
            expect_one(FileRecord::set_quick_number(file_id, quick_number, &mut *tx).await?)?;
            Ok(quick_number)
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_metadata(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        revision_id: Option<&ObjectId>,
    ) -> Result<FileMetadata, GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;
        if let Some(revision_id) = revision_id {
            revision_id.expect_kind(IdKind::FileBlob)?;
        }

        let conn = &*self.db;
        let file = FileRecord::readable(requester, file_id, conn)
            .await?
            .ok_or(GuardError::NotFound)?;
        let acl = entries(FileRecord::acl(file_id, conn).await?);

        let mut revisions = RevisionRecord::for_file(file_id, conn).await?;
        if let Some(revision_id) = revision_id {
            revisions.retain(|revision| *revision.id == *revision_id);
            if revisions.is_empty() {
                return Err(GuardError::NotFound);
            }
        }
        let mut keys = AccessKeyRecord::own_for_file(requester, file_id, conn).await?;
        let revisions = revisions
            .into_iter()
            .map(|revision| {
                let key = keys.remove(&*revision.id);
                revision.into_view(key)
            })
            .collect();

        Ok(FileMetadata {
            object: ObjectSummary {
                id: file.id.clone().into(),
                name: file.name.clone(),
                permissions: permission::visible_entries(&acl, requester),
            },
            owner: file.owner_id.clone().into(),
            parent_id: file.parent_id.clone().into(),
            quick_number: file.quick_number,
            extension: file.extension(),
            language: file.language(),
            thumbnail_id: file.thumbnail_id.clone(),
            tags: file.tags.0,
            revisions,
        })
    }

    async fn try_move(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        new_parent_id: &ObjectId,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;
        new_parent_id.expect_kind(IdKind::Directory)?;

        expect_one(FileRecord::reparent(requester, file_id, new_parent_id, &*self.db).await?)
    }

    async fn try_rename(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        name: &str,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;
        check_name(name)?;

        expect_one(FileRecord::rename(requester, file_id, name, &*self.db).await?)
    }

    async fn try_delete(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
    ) -> Result<Vec<ObjectId>, GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<Vec<ObjectId>, GuardError> = async {
            let revisions = RevisionRecord::ids_for_file(file_id, &mut *tx).await?;
            expect_one(FileRecord::delete(requester, file_id, &mut *tx).await?)?;
            Ok(object_ids(revisions))
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_permissions(
        &self,
        requester: &ObjectId,
        target: &ObjectId,
        file_ids: &[ObjectId],
    ) -> Result<Vec<PermissionResponse>, GuardError> {
        requester.expect_kind(IdKind::User)?;
        target.expect_kind(IdKind::User)?;
        for id in file_ids {
            id.expect_kind(IdKind::File)?;
        }

        let mut responses = Vec::with_capacity(file_ids.len());
        for id in file_ids {
            let acl = entries(FileRecord::acl(id, &*self.db).await?);
            responses.extend(permission_for(id, &acl, requester, target));
        }
        Ok(responses)
    }

    async fn try_set_permission(
        &self,
        requester: &ObjectId,
        file_id: &ObjectId,
        subject: &ObjectId,
        permission: Permission,
    ) -> Result<(), GuardError> {
        requester.expect_kind(IdKind::User)?;
        file_id.expect_kind(IdKind::File)?;
        subject.expect_kind(IdKind::User)?;

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<(), GuardError> = async {
            let acl = entries(FileRecord::acl(file_id, &mut *tx).await?);
            if !permission::holds(&acl, requester, Permission::WRITE_PERMISSIONS) {
                return Err(GuardError::NotFound);
            }
            check_keeps_permission_writer(&acl, subject, permission)?;

            if permission.is_empty() {
                expect_one(FileRecord::revoke(file_id, subject, &mut *tx).await?)
            } else {
                expect_one(FileRecord::grant(file_id, subject, permission, &mut *tx).await?)
            }
        }
        .await;
        transaction::finish(tx, result).await
    }
}
