//! Integration tests for user registration and lookup

mod common;

use ::common::id::{IdKind, ObjectId};
use ::common::permission::Permission;

#[tokio::test]
async fn test_user_information_is_private() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let info = state
        .users()
        .get_user_information(&alice.id, &alice.id)
        .await
        .unwrap();
    assert_eq!(info.id, alice.id);
    assert_eq!(info.email, alice.email);
    assert_eq!(info.root_directory_id, alice.root);
    assert_eq!(info.public_key, alice.secret.public().to_hex());
    assert_eq!(info.quick_number, 0);

    assert!(state
        .users()
        .get_user_information(&bob.id, &alice.id)
        .await
        .is_none());
}

#[tokio::test]
async fn test_credentials_by_email() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;

    let credentials = state
        .users()
        .get_credentials("alice@example.com")
        .await
        .unwrap();
    assert_eq!(credentials.id, alice.id);
    assert_eq!(credentials.password_hash, "password-hash");
    assert_eq!(credentials.salt, "salt");
    assert_eq!(credentials.encrypted_private_key, "encrypted-private-key");

    assert!(state
        .users()
        .get_credentials("missing@example.com")
        .await
        .is_none());
}

#[tokio::test]
async fn test_duplicate_registration_fails() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let users = state.users();

    // same email
    assert!(
        !users
            .insert_user(
                &ObjectId::new(IdKind::User),
                &ObjectId::new(IdKind::Directory),
                "alice@example.com",
                "h",
                "s",
                "pk",
                "epk",
            )
            .await
    );
    // same root directory
    assert!(
        !users
            .insert_user(
                &ObjectId::new(IdKind::User),
                &alice.root,
                "other@example.com",
                "h",
                "s",
                "pk",
                "epk",
            )
            .await
    );
    // same user id
    assert!(
        !users
            .insert_user(
                &alice.id,
                &ObjectId::new(IdKind::Directory),
                "third@example.com",
                "h",
                "s",
                "pk",
                "epk",
            )
            .await
    );
    // ids of the wrong kind
    assert!(
        !users
            .insert_user(
                &ObjectId::new(IdKind::Directory),
                &ObjectId::new(IdKind::Directory),
                "fourth@example.com",
                "h",
                "s",
                "pk",
                "epk",
            )
            .await
    );

    // none of the failed attempts left a user behind
    assert!(users.get_credentials("other@example.com").await.is_none());
    assert!(users.get_credentials("third@example.com").await.is_none());
}

#[tokio::test]
async fn test_delete_user() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let docs = common::mkdir(&state, &alice, &alice.root, "docs").await;
    let first = common::upload(&state, &alice, &alice.root, "a.pdf", &[&alice]).await;
    let second = common::upload(&state, &alice, &docs, "b.pdf", &[&alice]).await;

    // bob has a share in alice's tree and a tree of his own
    assert!(
        state
            .directories()
            .set_permission(&alice.id, &alice.root, &bob.id, Permission::READ)
            .await
    );
    let bobs = common::upload(&state, &bob, &bob.root, "bob.pdf", &[&bob]).await;

    // only alice can delete alice
    assert!(state.users().delete_user(&bob.id, &alice.id).await.is_none());

    let mut orphaned = state.users().delete_user(&alice.id, &alice.id).await.unwrap();
    orphaned.sort();
    let mut expected = vec![first.revision, second.revision];
    expected.sort();
    assert_eq!(orphaned, expected);

    assert!(state.users().get_credentials("alice@example.com").await.is_none());
    assert!(state
        .directories()
        .get_directory_metadata(&bob.id, &alice.root, None)
        .await
        .is_none());
    assert!(state
        .files()
        .get_file_metadata(&bob.id, &bobs.file, None)
        .await
        .is_some());

    // the email can be registered again
    common::register(&state, "alice@example.com").await;
}
