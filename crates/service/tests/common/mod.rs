//! Shared fixtures for guard integration tests
#![allow(dead_code)]

use common::crypto::{ContentKey, SecretKey, WrappedKey};
use common::id::{IdKind, ObjectId};
use common::metadata::{AccessKey, DocumentLanguage, ExtensionType};
use service::{Database, ServiceState};

/// A registered user together with the private key their access keys are
/// wrapped for.
#[derive(Clone)]
pub struct TestUser {
    pub id: ObjectId,
    pub root: ObjectId,
    pub email: String,
    pub secret: SecretKey,
}

/// A file inserted through [`upload`].
pub struct Upload {
    pub file: ObjectId,
    pub revision: ObjectId,
    pub quick_number: u32,
    pub content_key: ContentKey,
}

pub async fn setup_state() -> ServiceState {
    let database = Database::in_memory().await.unwrap();
    ServiceState::from_database(database)
}

/// State over a file-backed database in `dir`, for tests that need more
/// than one connection.
pub async fn setup_file_state(dir: &std::path::Path) -> ServiceState {
    let config = service::Config {
        sqlite_path: Some(dir.join("guard.sqlite")),
        ..service::Config::default()
    };
    ServiceState::from_config(&config).await.unwrap()
}

pub async fn register(state: &ServiceState, email: &str) -> TestUser {
    let secret = SecretKey::generate().unwrap();
    let id = ObjectId::new(IdKind::User);
    let root = ObjectId::new(IdKind::Directory);

    assert!(
        state
            .users()
            .insert_user(
                &id,
                &root,
                email,
                "password-hash",
                "salt",
                &secret.public().to_hex(),
                "encrypted-private-key",
            )
            .await
    );

    TestUser {
        id,
        root,
        email: email.to_string(),
        secret,
    }
}

pub async fn mkdir(
    state: &ServiceState,
    user: &TestUser,
    parent: &ObjectId,
    name: &str,
) -> ObjectId {
    let id = ObjectId::new(IdKind::Directory);
    assert!(
        state
            .directories()
            .insert_directory(&user.id, parent, name, &id)
            .await,
        "mkdir {} failed",
        name
    );
    id
}

/// Wrap `key` for each of `recipients`, issued by `issuer`.
pub fn wrap_for(key: &ContentKey, issuer: &TestUser, recipients: &[&TestUser]) -> Vec<AccessKey> {
    recipients
        .iter()
        .map(|recipient| AccessKey {
            user: recipient.id.clone(),
            issuer: issuer.id.clone(),
            encrypted_key: WrappedKey::new(key, &recipient.secret.public())
                .unwrap()
                .to_hex(),
        })
        .collect()
}

/// Insert a file as `user`, with keys for exactly `readers` (who must match
/// the parent's ACL).
pub async fn try_upload(
    state: &ServiceState,
    user: &TestUser,
    parent: &ObjectId,
    name: &str,
    readers: &[&TestUser],
) -> Option<Upload> {
    let file = ObjectId::new(IdKind::File);
    let revision = ObjectId::new(IdKind::FileBlob);
    let content_key = ContentKey::generate().unwrap();
    let keys = wrap_for(&content_key, user, readers);

    let quick_number = state
        .files()
        .insert_file(
            &user.id,
            parent,
            &file,
            &revision,
            name,
            1024,
            &keys,
            DocumentLanguage::English,
            ExtensionType::Pdf,
        )
        .await?;

    Some(Upload {
        file,
        revision,
        quick_number,
        content_key,
    })
}

pub async fn upload(
    state: &ServiceState,
    user: &TestUser,
    parent: &ObjectId,
    name: &str,
    readers: &[&TestUser],
) -> Upload {
    try_upload(state, user, parent, name, readers)
        .await
        .unwrap_or_else(|| panic!("upload of {} failed", name))
}

/// Add a revision to `file` as `user`, keyed for `readers`.
pub async fn add_revision(
    state: &ServiceState,
    user: &TestUser,
    file: &ObjectId,
    readers: &[&TestUser],
) -> (ObjectId, u32) {
    let revision = ObjectId::new(IdKind::FileBlob);
    let content_key = ContentKey::generate().unwrap();
    let keys = wrap_for(&content_key, user, readers);
    let quick_number = state
        .files()
        .insert_revision(&user.id, file, &revision, 2048, &keys)
        .await
        .unwrap();
    (revision, quick_number)
}

/// Ids of the child directories of `directory` as seen by `user`.
pub async fn child_directories(
    state: &ServiceState,
    user: &TestUser,
    directory: &ObjectId,
) -> Vec<ObjectId> {
    state
        .directories()
        .get_directory_metadata(&user.id, directory, None)
        .await
        .unwrap()
        .directories
        .into_iter()
        .map(|d| d.object.id)
        .collect()
}

pub async fn path_of(state: &ServiceState, user: &TestUser, directory: &ObjectId) -> Vec<ObjectId> {
    state
        .directories()
        .get_directory_metadata(&user.id, directory, None)
        .await
        .unwrap()
        .path
}
