/**
 * Client-side key handling.
 *  - Public and Private key implementations
 *  - Wrapping revision content keys per recipient
 */
pub mod crypto;
/**
 * Kind-tagged object identifiers.
 */
pub mod id;
/**
 * Read views returned by the guard: directory
 *  and file listings, revisions, user records.
 */
pub mod metadata;
/**
 * Permission flags and the rules deciding
 *  which ACL entries a requester may see.
 */
pub mod permission;
/**
 * Two-phase share bundles.
 */
pub mod share;

pub mod prelude {
    pub use crate::crypto::{ContentKey, PublicKey, SecretKey, WrappedKey};
    pub use crate::id::{IdError, IdKind, ObjectId};
    pub use crate::metadata::{
        AccessKey, DirectoryMetadata, DirectorySummary, DocumentLanguage, ExtensionType,
        FileMetadata, FileRevision, FileSummary, ObjectSummary, PermissionResponse,
        UserCredentials, UserInformation,
    };
    pub use crate::permission::{Permission, PermissionEntry};
    pub use crate::share::{PreparedShare, RevisionShare, ShareRequest};
}
