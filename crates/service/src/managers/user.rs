use common::id::{IdKind, ObjectId};
use common::metadata::{UserCredentials, UserInformation};
use common::permission::Permission;

use super::object_ids;
use crate::database::models::user::NewUser;
use crate::database::models::{DirectoryRecord, UserRecord};
use crate::database::Database;
use crate::error::{Collapse, GuardError};
use crate::transaction::{self, expect_one};

/// Account records and the root directory that comes with each.
#[derive(Clone, Debug)]
pub struct UserManager {
    db: Database,
}

impl UserManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register a user together with their root directory.
    #[allow(clippy::too_many_arguments)]
    #[tracing::instrument(skip(self, password_hash, salt, encrypted_private_key))]
    pub async fn insert_user(
        &self,
        user_id: &ObjectId,
        root_directory_id: &ObjectId,
        email: &str,
        password_hash: &str,
        salt: &str,
        public_key: &str,
        encrypted_private_key: &str,
    ) -> bool {
        let user = NewUser {
            id: user_id,
            root_directory_id,
            email,
            password_hash,
            salt,
            public_key,
            encrypted_private_key,
        };
        self.try_insert(&user)
            .await
            .collapse("insert_user")
            .is_some()
    }

    /// Delete an account and everything it owns. Only the user themself
    /// may do this. Returns the revision ids left without an owner.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(
        &self,
        requester: &ObjectId,
        user_id: &ObjectId,
    ) -> Option<Vec<ObjectId>> {
        self.try_delete(requester, user_id)
            .await
            .collapse("delete_user")
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user_information(
        &self,
        requester: &ObjectId,
        user_id: &ObjectId,
    ) -> Option<UserInformation> {
        self.try_information(requester, user_id)
            .await
            .collapse("get_user_information")
    }

    /// Login lookup by email.
    #[tracing::instrument(skip(self))]
    pub async fn get_credentials(&self, email: &str) -> Option<UserCredentials> {
        self.try_credentials(email).await.collapse("get_credentials")
    }

    async fn try_insert(&self, user: &NewUser<'_>) -> Result<(), GuardError> {
        user.id.expect_kind(IdKind::User)?;
        user.root_directory_id.expect_kind(IdKind::Directory)?;
        if user.email.trim().is_empty() {
            return Err(GuardError::validation("email must not be empty"));
        }
        if user.public_key.is_empty() {
            return Err(GuardError::validation("public key must not be empty"));
        }

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<(), GuardError> = async {
            expect_one(UserRecord::insert(user, &mut *tx).await?)?;
            expect_one(
                DirectoryRecord::insert_root(user.id, user.root_directory_id, &mut *tx).await?,
            )?;
            expect_one(
                DirectoryRecord::grant(
                    user.root_directory_id,
                    user.id,
                    Permission::owner(),
                    &mut *tx,
                )
                .await?,
            )
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_delete(
        &self,
        requester: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<Vec<ObjectId>, GuardError> {
        requester.expect_kind(IdKind::User)?;
        user_id.expect_kind(IdKind::User)?;
        if requester != user_id {
            return Err(GuardError::NotFound);
        }

        let mut tx = transaction::begin(&self.db).await?;
        let result: Result<Vec<ObjectId>, GuardError> = async {
            let revisions = UserRecord::owned_revision_ids(user_id, &mut *tx).await?;
            expect_one(UserRecord::delete(user_id, &mut *tx).await?)?;
            Ok(object_ids(revisions))
        }
        .await;
        transaction::finish(tx, result).await
    }

    async fn try_information(
        &self,
        requester: &ObjectId,
        user_id: &ObjectId,
    ) -> Result<UserInformation, GuardError> {
        requester.expect_kind(IdKind::User)?;
        user_id.expect_kind(IdKind::User)?;
        if requester != user_id {
            return Err(GuardError::NotFound);
        }

        UserRecord::get(user_id, &*self.db)
            .await?
            .map(UserInformation::from)
            .ok_or(GuardError::NotFound)
    }

    async fn try_credentials(&self, email: &str) -> Result<UserCredentials, GuardError> {
        UserRecord::by_email(email, &*self.db)
            .await?
            .map(UserCredentials::from)
            .ok_or(GuardError::NotFound)
    }
}
