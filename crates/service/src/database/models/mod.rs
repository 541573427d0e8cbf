#[macro_use]
mod acl;

pub mod access_key;
pub mod directory;
pub mod file;
pub mod revision;
pub mod user;

pub use access_key::AccessKeyRecord;
pub use acl::AclRecord;
pub use directory::{DirectoryChildRecord, DirectoryRecord};
pub use file::{FileChildRecord, FileRecord};
pub use revision::RevisionRecord;
pub use user::UserRecord;
