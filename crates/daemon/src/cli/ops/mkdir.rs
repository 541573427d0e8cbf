use clap::Args;

use common::prelude::{IdKind, ObjectId};
use guard_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// User creating the directory
    #[arg(long)]
    pub user: ObjectId,

    /// Directory to create it in
    #[arg(long)]
    pub parent: ObjectId,

    /// Name of the new directory
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("could not create '{0}': the parent is not writable or the name is taken")]
    Refused(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (_, service) = ctx.service().await?;

        let directory_id = ObjectId::new(IdKind::Directory);
        let created = service
            .directories()
            .insert_directory(&self.user, &self.parent, &self.name, &directory_id)
            .await;
        if !created {
            return Err(MkdirError::Refused(self.name.clone()));
        }

        Ok(format!("{} {}", directory_id, self.name))
    }
}
