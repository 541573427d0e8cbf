//! ACL predicates embedded in the guard's SQL.
//!
//! `directory_grants!("d.id", "?2", WRITE)` expands to an `EXISTS (...)`
//! clause that holds when the user bound at `?2` carries the WRITE bit on
//! directory `d.id`. Permission checks are always part of the statement
//! that reads or writes the object, never a separate query.

use std::collections::HashMap;

use sqlx::FromRow;

use common::id::ObjectId;
use common::permission::PermissionEntry;

use crate::database::types::{DObjectId, DPermission};

macro_rules! permission_bits {
    (READ) => {
        "1"
    };
    (WRITE) => {
        "2"
    };
    (READ_PERMISSIONS) => {
        "4"
    };
    (WRITE_PERMISSIONS) => {
        "8"
    };
}

macro_rules! directory_grants {
    ($directory:literal, $user:literal, $flag:ident) => {
        concat!(
            "EXISTS (SELECT 1 FROM directory_acl g WHERE g.directory_id = ",
            $directory,
            " AND g.user_id = ",
            $user,
            " AND (g.permission & ",
            permission_bits!($flag),
            ") != 0)"
        )
    };
}

macro_rules! file_grants {
    ($file:literal, $user:literal, $flag:ident) => {
        concat!(
            "EXISTS (SELECT 1 FROM file_acl g WHERE g.file_id = ",
            $file,
            " AND g.user_id = ",
            $user,
            " AND (g.permission & ",
            permission_bits!($flag),
            ") != 0)"
        )
    };
}

/// One ACL row of a directory or file.
#[derive(Debug, Clone, FromRow)]
pub struct AclRecord {
    pub object_id: DObjectId,
    pub user_id: DObjectId,
    pub permission: DPermission,
}

impl From<AclRecord> for PermissionEntry {
    fn from(row: AclRecord) -> Self {
        PermissionEntry::new(row.user_id.into(), row.permission.into())
    }
}

impl AclRecord {
    /// Group rows by the object they belong to, keeping row order.
    pub fn group(rows: Vec<AclRecord>) -> HashMap<ObjectId, Vec<PermissionEntry>> {
        let mut grouped: HashMap<ObjectId, Vec<PermissionEntry>> = HashMap::new();
        for row in rows {
            let object_id = ObjectId::from(row.object_id.clone());
            grouped.entry(object_id).or_default().push(row.into());
        }
        grouped
    }
}
