//! Entry points of the guard, one manager per concern.
//!
//! Every public operation takes the requesting user's id, checks the kinds
//! of the ids it was handed, and runs its storage work through an inner
//! function returning `Result<_, GuardError>`. The outcome is collapsed to
//! `bool`, `Option` or a list at the boundary.

mod directory;
mod file;
mod sharing;
mod user;

pub use directory::DirectoryManager;
pub use file::FileManager;
pub use sharing::SharingManager;
pub use user::UserManager;

use std::collections::HashSet;

use common::id::{IdKind, ObjectId};
use common::metadata::{AccessKey, PermissionResponse};
use common::permission::{self, Permission, PermissionEntry};

use crate::database::models::AclRecord;
use crate::database::types::DObjectId;
use crate::error::GuardError;

pub(crate) fn entries(rows: Vec<AclRecord>) -> Vec<PermissionEntry> {
    rows.into_iter().map(PermissionEntry::from).collect()
}

pub(crate) fn object_ids(rows: Vec<DObjectId>) -> Vec<ObjectId> {
    rows.into_iter().map(ObjectId::from).collect()
}

fn check_name(name: &str) -> Result<(), GuardError> {
    if name.trim().is_empty() {
        return Err(GuardError::validation("name must not be empty"));
    }
    if name.contains('/') {
        return Err(GuardError::validation("name must not contain '/'"));
    }
    Ok(())
}

/// Keys handed in by `requester` must all be issued by them, to users,
/// each carrying some ciphertext.
fn check_issued_keys(requester: &ObjectId, keys: &[AccessKey]) -> Result<(), GuardError> {
    for key in keys {
        key.user.expect_kind(IdKind::User)?;
        if key.issuer != *requester {
            return Err(GuardError::validation(format!(
                "key for {} issued by {}, not the requester",
                key.user, key.issuer
            )));
        }
        if key.encrypted_key.is_empty() {
            return Err(GuardError::validation(format!(
                "empty key for {}",
                key.user
            )));
        }
    }
    Ok(())
}

/// There must be exactly one key per ACL subject: none missing, none extra,
/// none twice.
fn check_key_set(acl: &[AclRecord], keys: &[AccessKey]) -> Result<(), GuardError> {
    let subjects: HashSet<&ObjectId> = acl.iter().map(|row| &*row.user_id).collect();
    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(&key.user) {
            return Err(GuardError::validation(format!(
                "duplicate key for {}",
                key.user
            )));
        }
    }
    if seen != subjects {
        return Err(GuardError::validation(format!(
            "{} keys supplied for {} permitted users",
            seen.len(),
            subjects.len()
        )));
    }
    Ok(())
}

/// What `requester` may learn about `target`'s flags on one object.
fn permission_for(
    object_id: &ObjectId,
    acl: &[PermissionEntry],
    requester: &ObjectId,
    target: &ObjectId,
) -> Option<PermissionResponse> {
    permission::lookup(acl, requester, target)
        .into_iter()
        .find(|entry| entry.user == *target)
        .map(|entry| PermissionResponse {
            object_id: object_id.clone(),
            permission: entry.permission,
        })
}

/// Refuse an ACL edit that would leave nobody able to edit the ACL again.
fn check_keeps_permission_writer(
    acl: &[PermissionEntry],
    subject: &ObjectId,
    permission: Permission,
) -> Result<(), GuardError> {
    if permission.contains(Permission::WRITE_PERMISSIONS) {
        return Ok(());
    }
    let others = acl
        .iter()
        .filter(|entry| entry.user != *subject)
        .any(|entry| entry.permission.contains(Permission::WRITE_PERMISSIONS));
    if !others {
        return Err(GuardError::validation(
            "the last entry with write-permissions cannot be dropped",
        ));
    }
    Ok(())
}
