pub mod init;
pub mod ls;
pub mod mkdir;
pub mod user;

pub use init::Init;
pub use ls::Ls;
pub use mkdir::Mkdir;
pub use user::User;
