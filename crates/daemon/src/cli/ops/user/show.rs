use clap::Args;

use common::prelude::ObjectId;
use guard_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Show {
    #[arg(long)]
    pub user: ObjectId,
}

#[derive(Debug, thiserror::Error)]
pub enum UserShowError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("user {0} not found")]
    NotFound(ObjectId),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Show {
    type Error = UserShowError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, service) = ctx.service().await?;

        let info = service
            .users()
            .get_user_information(&self.user, &self.user)
            .await
            .ok_or_else(|| UserShowError::NotFound(self.user.clone()))?;

        let key_str = match state.load_key(&info.id) {
            Ok(_) => "stored locally",
            Err(_) => "not stored locally",
        };

        Ok(format!(
            "{}\n\
             - Email: {}\n\
             - Root directory: {}\n\
             - Quick number: {}\n\
             - Public key: {}\n\
             - Private key: {}",
            info.id, info.email, info.root_directory_id, info.quick_number, info.public_key, key_str
        ))
    }
}
