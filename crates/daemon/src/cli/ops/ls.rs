use std::fmt::Write;

use clap::Args;

use common::prelude::{DirectoryMetadata, ObjectId, Permission, PermissionEntry};
use guard_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// User doing the listing
    #[arg(long)]
    pub user: ObjectId,

    /// Directory to list (defaults to the user's root)
    #[arg(long)]
    pub dir: Option<ObjectId>,

    /// Show the directory as of this quick number in the owner's history
    #[arg(long)]
    pub at: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("user {0} not found")]
    UnknownUser(ObjectId),
    #[error("directory {0} not found")]
    NotFound(ObjectId),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, service) = ctx.service().await?;

        let directory_id = match &self.dir {
            Some(id) => id.clone(),
            None => {
                service
                    .users()
                    .get_user_information(&self.user, &self.user)
                    .await
                    .ok_or_else(|| LsError::UnknownUser(self.user.clone()))?
                    .root_directory_id
            }
        };

        let metadata = service
            .directories()
            .get_directory_metadata(&self.user, &directory_id, self.at)
            .await
            .ok_or_else(|| LsError::NotFound(directory_id.clone()))?;

        Ok(render(&metadata))
    }
}

/// `rwRW`-style flag string, `-` for each flag not held.
fn flags(permission: Permission) -> String {
    [
        (Permission::READ, 'r'),
        (Permission::WRITE, 'w'),
        (Permission::READ_PERMISSIONS, 'R'),
        (Permission::WRITE_PERMISSIONS, 'W'),
    ]
    .iter()
    .map(|(flag, c)| if permission.contains(*flag) { *c } else { '-' })
    .collect()
}

fn acl(entries: &[PermissionEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}:{}", entry.user, flags(entry.permission)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn render(metadata: &DirectoryMetadata) -> String {
    let mut out = String::new();
    let path = metadata
        .path
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/");
    let _ = writeln!(out, "{} ({})", metadata.object.name, metadata.object.id);
    let _ = writeln!(out, "path: /{}", path);
    if !metadata.object.permissions.is_empty() {
        let _ = writeln!(out, "acl: {}", acl(&metadata.object.permissions));
    }

    if metadata.directories.is_empty() && metadata.files.is_empty() {
        out.push_str("No items found");
        return out;
    }

    for directory in &metadata.directories {
        let _ = writeln!(
            out,
            "dir   {}  {}  [{} items]",
            directory.object.id, directory.object.name, directory.child_count
        );
    }
    for file in &metadata.files {
        let _ = writeln!(
            out,
            "file  {}  {}  #{} rev {} ({} bytes, {}){}",
            file.object.id,
            file.object.name,
            file.quick_number,
            file.revision.quick_number,
            file.revision.size_bytes,
            file.extension.as_str(),
            if file.revision.access_key.is_some() {
                ""
            } else {
                " [no key]"
            }
        );
    }
    out.trim_end().to_string()
}
