use common::id::{IdKind, ObjectId};
use common::share::{
    PreparedFile, PreparedRevision, PreparedShare, RevisionShare, ShareRecipient, ShareRequest,
};

use super::check_issued_keys;
use crate::database::models::access_key::StagedKeyRecord;
use crate::database::models::{AccessKeyRecord, DirectoryRecord, FileRecord, UserRecord};
use crate::database::Database;
use crate::error::{Collapse, GuardError};
use crate::transaction::{self, expect_one};

/// Two-phase distribution of wrapped content keys.
///
/// [`prepare_share`](Self::prepare_share) hands the requester its own keys
/// for everything being shared plus the recipients' public keys. The client
/// re-wraps them and comes back through [`share`](Self::share).
#[derive(Clone, Debug)]
pub struct SharingManager {
    db: Database,
}

impl SharingManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stage a share of a directory (every file below it) or a single file
    /// with the users behind `emails`. Unknown addresses are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn prepare_share(
        &self,
        requester: &ObjectId,
        object_id: &ObjectId,
        emails: &[String],
    ) -> Option<PreparedShare> {
        self.try_prepare(requester, object_id, emails)
            .await
            .collapse("prepare_share")
    }

    /// Store the re-wrapped keys. Each revision is written on its own, so a
    /// refused revision does not hold back the others; the result is `true`
    /// only when every revision went through.
    #[tracing::instrument(skip(self, request), fields(revisions = request.revisions.len(), keys = request.key_count()))]
    pub async fn share(&self, requester: &ObjectId, request: &ShareRequest) -> bool {
        if check_share_request(requester, request)
            .collapse("share")
            .is_none()
        {
            return false;
        }

        let mut complete = true;
        for revision in &request.revisions {
            let stored = self
                .try_share_revision(requester, revision)
                .await
                .collapse("share_revision");
            if stored.is_none() {
                tracing::warn!(revision = %revision.revision_id, "revision not shared");
                complete = false;
            }
        }
        complete
    }

    // Staging reads are not wrapped in a transaction.
    async fn try_prepare(
        &self,
        requester: &ObjectId,
        object_id: &ObjectId,
        emails: &[String],
    ) -> Result<PreparedShare, GuardError> {
        requester.expect_kind(IdKind::User)?;

        let conn = &*self.db;
        let staged = match object_id.kind() {
            IdKind::Directory => {
                DirectoryRecord::writable(requester, object_id, conn)
                    .await?
                    .ok_or(GuardError::NotFound)?;
                AccessKeyRecord::staged_for_subtree(requester, object_id, conn).await?
            }
            IdKind::File => {
                FileRecord::writable(requester, object_id, conn)
                    .await?
                    .ok_or(GuardError::NotFound)?;
                AccessKeyRecord::staged_for_file(requester, object_id, conn).await?
            }
            other => {
                return Err(GuardError::validation(format!(
                    "cannot share a {:?}",
                    other
                )))
            }
        };

        let recipients = UserRecord::by_emails(emails, conn)
            .await?
            .into_iter()
            .map(|user| ShareRecipient {
                user_id: user.id.into(),
                email: user.email,
                public_key: user.public_key,
            })
            .collect();

        Ok(PreparedShare {
            files: group_by_file(staged),
            recipients,
        })
    }

    async fn try_share_revision(
        &self,
        requester: &ObjectId,
        revision: &RevisionShare,
    ) -> Result<(), GuardError> {
        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<(), GuardError> = async {
            for key in &revision.keys {
                expect_one(
                    AccessKeyRecord::insert_shared(requester, &revision.revision_id, key, &mut *tx)
                        .await?,
                )?;
            }
            Ok(())
        }
        .await;
        transaction::finish(tx, result).await
    }
}

fn check_share_request(requester: &ObjectId, request: &ShareRequest) -> Result<(), GuardError> {
    requester.expect_kind(IdKind::User)?;
    for revision in &request.revisions {
        revision.revision_id.expect_kind(IdKind::FileBlob)?;
        check_issued_keys(requester, &revision.keys)?;
    }
    Ok(())
}

/// Rows arrive ordered so that each file's revisions are contiguous.
fn group_by_file(rows: Vec<StagedKeyRecord>) -> Vec<PreparedFile> {
    let mut files: Vec<PreparedFile> = Vec::new();
    for row in rows {
        let revision = PreparedRevision {
            access_key: row.access_key(),
            revision_id: row.revision_id.into(),
        };
        let file_id = ObjectId::from(row.file_id);
        match files.last_mut() {
            Some(file) if file.file_id == file_id => file.revisions.push(revision),
            _ => files.push(PreparedFile {
                file_id,
                revisions: vec![revision],
            }),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::metadata::AccessKey;

    fn staged(file: &ObjectId, revision: &ObjectId, key: Option<&ObjectId>) -> StagedKeyRecord {
        StagedKeyRecord {
            file_id: file.into(),
            revision_id: revision.into(),
            user_id: key.map(Into::into),
            issuer_id: key.map(Into::into),
            encrypted_key: key.map(|_| "aa".to_string()),
        }
    }

    #[test]
    fn test_group_by_file() {
        let user = ObjectId::new(IdKind::User);
        let (a, b) = (ObjectId::new(IdKind::File), ObjectId::new(IdKind::File));
        let revisions: Vec<ObjectId> = (0..3).map(|_| ObjectId::new(IdKind::FileBlob)).collect();

        let files = group_by_file(vec![
            staged(&a, &revisions[0], Some(&user)),
            staged(&a, &revisions[1], None),
            staged(&b, &revisions[2], Some(&user)),
        ]);

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_id, a);
        assert_eq!(files[0].revisions.len(), 2);
        assert!(files[0].revisions[0].access_key.is_some());
        assert!(files[0].revisions[1].access_key.is_none());
        assert_eq!(files[1].file_id, b);
        assert_eq!(
            files[1].revisions[0].access_key.as_ref().map(|k| &k.user),
            Some(&user)
        );
    }

    #[test]
    fn test_share_request_issuer_must_be_requester() {
        let (alice, bob) = (ObjectId::new(IdKind::User), ObjectId::new(IdKind::User));
        let request = ShareRequest {
            revisions: vec![RevisionShare {
                revision_id: ObjectId::new(IdKind::FileBlob),
                keys: vec![AccessKey {
                    user: bob.clone(),
                    issuer: bob.clone(),
                    encrypted_key: "aa".to_string(),
                }],
            }],
        };
        assert!(check_share_request(&alice, &request).is_err());
        assert!(check_share_request(&bob, &request).is_ok());
    }

    #[test]
    fn test_share_request_revision_kind() {
        let alice = ObjectId::new(IdKind::User);
        let request = ShareRequest {
            revisions: vec![RevisionShare {
                revision_id: ObjectId::new(IdKind::File),
                keys: Vec::new(),
            }],
        };
        assert!(matches!(
            check_share_request(&alice, &request),
            Err(GuardError::InvalidId(_))
        ));
    }
}
