mod dobject_id;
mod dpath;
mod dpermission;

pub use dobject_id::DObjectId;
pub use dpath::DPath;
pub use dpermission::DPermission;
