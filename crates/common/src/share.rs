//! Bundles exchanged during the two-phase share protocol.
//!
//! 1. The guard stages a [`PreparedShare`]: the requester's own access key
//!    for every revision being shared, plus each recipient's public key.
//! 2. The client unwraps its keys, wraps them again per recipient
//!    ([`PreparedShare::fan_out`]) and submits the resulting
//!    [`ShareRequest`].

use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, SecretKey, WrappedKey, WrappedKeyError};
use crate::id::ObjectId;
use crate::metadata::AccessKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRevision {
    pub revision_id: ObjectId,
    /// `None` when no key was ever issued to the requester for this revision.
    pub access_key: Option<AccessKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedFile {
    pub file_id: ObjectId,
    pub revisions: Vec<PreparedRevision>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRecipient {
    pub user_id: ObjectId,
    pub email: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreparedShare {
    pub files: Vec<PreparedFile>,
    pub recipients: Vec<ShareRecipient>,
}

/// New access keys for one revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionShare {
    pub revision_id: ObjectId,
    pub keys: Vec<AccessKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShareRequest {
    pub revisions: Vec<RevisionShare>,
}

impl ShareRequest {
    pub fn key_count(&self) -> usize {
        self.revisions.iter().map(|r| r.keys.len()).sum()
    }
}

impl PreparedShare {
    /// Re-wrap every staged key for every recipient.
    ///
    /// Revisions without a key for the requester are skipped, as are
    /// recipients who are the requester.
    pub fn fan_out(
        &self,
        requester: &ObjectId,
        secret: &SecretKey,
    ) -> Result<ShareRequest, WrappedKeyError> {
        let recipients = self
            .recipients
            .iter()
            .filter(|r| &r.user_id != requester)
            .map(|r| Ok((r.user_id.clone(), PublicKey::from_hex(&r.public_key)?)))
            .collect::<Result<Vec<_>, WrappedKeyError>>()?;

        let mut request = ShareRequest::default();
        if recipients.is_empty() {
            return Ok(request);
        }

        for revision in self.files.iter().flat_map(|f| f.revisions.iter()) {
            let Some(own) = &revision.access_key else {
                continue;
            };
            let content_key = WrappedKey::from_hex(&own.encrypted_key)?.recover(secret)?;

            let keys = recipients
                .iter()
                .map(|(user, public_key)| {
                    Ok(AccessKey {
                        user: user.clone(),
                        issuer: requester.clone(),
                        encrypted_key: WrappedKey::new(&content_key, public_key)?.to_hex(),
                    })
                })
                .collect::<Result<Vec<_>, WrappedKeyError>>()?;

            request.revisions.push(RevisionShare {
                revision_id: revision.revision_id.clone(),
                keys,
            });
        }

        Ok(request)
    }
}
