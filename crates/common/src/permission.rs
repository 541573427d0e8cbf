//! Permission flags and the rules for evaluating an access-control list.
//!
//! An ACL is a flat list of [`PermissionEntry`] values, one per subject.
//! Nothing in here touches storage: the guard embeds the equivalent
//! predicates in its SQL, and uses these functions to filter what it
//! returns to a caller.

use serde::{Deserialize, Serialize};

use crate::id::ObjectId;

bitflags::bitflags! {
    /// Capability bits a subject may hold on a directory or file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Permission: u32 {
        const READ = 1;
        const WRITE = 1 << 1;
        const READ_PERMISSIONS = 1 << 2;
        const WRITE_PERMISSIONS = 1 << 3;

        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        const PERMISSIONS_READ_WRITE =
            Self::READ_PERMISSIONS.bits() | Self::WRITE_PERMISSIONS.bits();
    }
}

impl Permission {
    /// Full control, granted to a user on their own root directory.
    pub fn owner() -> Self {
        Self::READ_WRITE | Self::PERMISSIONS_READ_WRITE
    }

    /// Whether the bits are in the range the guard stores.
    pub fn from_stored(bits: i64) -> Option<Self> {
        u32::try_from(bits).ok().and_then(Self::from_bits)
    }
}

/// One subject's row in an ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub user: ObjectId,
    pub permission: Permission,
}

impl PermissionEntry {
    pub fn new(user: ObjectId, permission: Permission) -> Self {
        Self { user, permission }
    }
}

fn entry_for<'a>(acl: &'a [PermissionEntry], subject: &ObjectId) -> Option<&'a PermissionEntry> {
    acl.iter().find(|e| &e.user == subject)
}

/// True when `subject` has an entry carrying every bit in `flags`.
pub fn holds(acl: &[PermissionEntry], subject: &ObjectId, flags: Permission) -> bool {
    entry_for(acl, subject)
        .map(|e| e.permission.contains(flags))
        .unwrap_or(false)
}

/// The part of `acl` the requester may see.
///
/// With `ReadPermissions` that is the whole list, with only `Read` it is the
/// requester's own entry, and otherwise nothing.
pub fn visible_entries(acl: &[PermissionEntry], requester: &ObjectId) -> Vec<PermissionEntry> {
    let Some(own) = entry_for(acl, requester) else {
        return Vec::new();
    };

    if own.permission.contains(Permission::READ_PERMISSIONS) {
        return acl.to_vec();
    }

    if own.permission.contains(Permission::READ) {
        vec![own.clone()]
    } else {
        Vec::new()
    }
}

/// Look up the entries `requester` is allowed to learn about `target`.
///
/// Asking about oneself follows [`visible_entries`]. Asking about anyone
/// else needs `ReadPermissions` and yields at most the target's entry.
pub fn lookup(
    acl: &[PermissionEntry],
    requester: &ObjectId,
    target: &ObjectId,
) -> Vec<PermissionEntry> {
    if requester == target {
        return visible_entries(acl, requester);
    }

    if !holds(acl, requester, Permission::READ_PERMISSIONS) {
        return Vec::new();
    }

    entry_for(acl, target).cloned().into_iter().collect()
}
