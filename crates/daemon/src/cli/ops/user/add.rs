use clap::Args;

use common::crypto::KeyError;
use common::prelude::{IdKind, ObjectId, SecretKey};
use guard_daemon::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Add {
    #[arg(long)]
    pub email: String,

    /// Password hash computed by the client
    #[arg(long)]
    pub password_hash: String,

    #[arg(long)]
    pub salt: String,

    /// The new private key, encrypted by the client, if a server-side copy
    /// should be kept. The plain key always lands in the keys directory.
    #[arg(long, default_value = "")]
    pub encrypted_private_key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UserAddError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("key generation failed: {0}")]
    Key(#[from] KeyError),
    #[error("could not register {0}: the email is already in use or invalid")]
    Refused(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Add {
    type Error = UserAddError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let (state, service) = ctx.service().await?;

        let user_id = ObjectId::new(IdKind::User);
        let root_id = ObjectId::new(IdKind::Directory);
        let key = SecretKey::generate()?;

        let inserted = service
            .users()
            .insert_user(
                &user_id,
                &root_id,
                &self.email,
                &self.password_hash,
                &self.salt,
                &key.public().to_hex(),
                &self.encrypted_private_key,
            )
            .await;
        if !inserted {
            return Err(UserAddError::Refused(self.email.clone()));
        }

        // only persisted once the user exists, so a refused insert leaves no key behind
        let key_path = state.save_key(&user_id, &key)?;
        tracing::info!(user = %user_id, "registered user");

        Ok(format!(
            "Registered {}\n\
             - User: {}\n\
             - Root directory: {}\n\
             - Key: {}",
            self.email,
            user_id,
            root_id,
            key_path.display()
        ))
    }
}
