//! Integration tests for the two-phase share protocol

mod common;

use ::common::crypto::WrappedKey;
use ::common::id::{IdKind, ObjectId};
use ::common::metadata::AccessKey;
use ::common::permission::Permission;
use ::common::share::{RevisionShare, ShareRequest};

#[tokio::test]
async fn test_prepare_share_on_empty_directory() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let empty = common::mkdir(&state, &alice, &alice.root, "empty").await;

    let prepared = state
        .sharing()
        .prepare_share(
            &alice.id,
            &empty,
            &[bob.email.clone(), "nobody@example.com".to_string()],
        )
        .await
        .unwrap();

    assert!(prepared.files.is_empty());
    assert_eq!(prepared.recipients.len(), 1);
    assert_eq!(prepared.recipients[0].user_id, bob.id);
    assert_eq!(prepared.recipients[0].email, bob.email);
    assert_eq!(prepared.recipients[0].public_key, bob.secret.public().to_hex());
}

#[tokio::test]
async fn test_prepare_share_requires_write() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let folder = common::mkdir(&state, &alice, &alice.root, "folder").await;

    assert!(state
        .sharing()
        .prepare_share(&bob.id, &folder, &[alice.email.clone()])
        .await
        .is_none());

    assert!(
        state
            .directories()
            .set_permission(&alice.id, &folder, &bob.id, Permission::READ)
            .await
    );
    assert!(state
        .sharing()
        .prepare_share(&bob.id, &folder, &[alice.email.clone()])
        .await
        .is_none());

    // ids of other kinds are rejected outright
    assert!(state
        .sharing()
        .prepare_share(&alice.id, &alice.id, &[])
        .await
        .is_none());
}

#[tokio::test]
async fn test_prepare_share_covers_whole_subtree() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;

    let top = common::mkdir(&state, &alice, &alice.root, "top").await;
    let nested = common::mkdir(&state, &alice, &top, "nested").await;
    let outside = common::mkdir(&state, &alice, &alice.root, "outside").await;

    let a = common::upload(&state, &alice, &top, "a.pdf", &[&alice]).await;
    let (a2, _) = common::add_revision(&state, &alice, &a.file, &[&alice]).await;
    let b = common::upload(&state, &alice, &nested, "b.pdf", &[&alice]).await;
    common::upload(&state, &alice, &outside, "c.pdf", &[&alice]).await;

    let prepared = state
        .sharing()
        .prepare_share(&alice.id, &top, &[])
        .await
        .unwrap();

    assert!(prepared.recipients.is_empty());
    let files: Vec<ObjectId> = prepared.files.iter().map(|f| f.file_id.clone()).collect();
    assert_eq!(files, vec![a.file.clone(), b.file.clone()]);

    let a_revisions: Vec<ObjectId> = prepared.files[0]
        .revisions
        .iter()
        .map(|r| r.revision_id.clone())
        .collect();
    assert_eq!(a_revisions, vec![a.revision.clone(), a2]);
    for revision in prepared.files.iter().flat_map(|f| f.revisions.iter()) {
        let key = revision.access_key.as_ref().unwrap();
        assert_eq!(key.user, alice.id);
    }
}

#[tokio::test]
async fn test_share_round_trip() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let folder = common::mkdir(&state, &alice, &alice.root, "folder").await;
    let upload = common::upload(&state, &alice, &folder, "doc.pdf", &[&alice]).await;
    assert!(
        state
            .files()
            .set_permission(&alice.id, &upload.file, &bob.id, Permission::READ)
            .await
    );

    // bob can see the file but holds no key yet
    let before = state
        .files()
        .get_file_metadata(&bob.id, &upload.file, None)
        .await
        .unwrap();
    assert!(before.revisions[0].access_key.is_none());

    let prepared = state
        .sharing()
        .prepare_share(&alice.id, &folder, &[bob.email.clone()])
        .await
        .unwrap();
    let request = prepared.fan_out(&alice.id, &alice.secret).unwrap();
    assert_eq!(request.key_count(), 1);

    assert!(state.sharing().share(&alice.id, &request).await);

    let after = state
        .files()
        .get_file_metadata(&bob.id, &upload.file, None)
        .await
        .unwrap();
    let key = after.revisions[0].access_key.as_ref().unwrap();
    assert_eq!(key.user, bob.id);
    assert_eq!(key.issuer, alice.id);
    let recovered = WrappedKey::from_hex(&key.encrypted_key)
        .unwrap()
        .recover(&bob.secret)
        .unwrap();
    assert_eq!(recovered, upload.content_key);

    // sharing the same key twice is refused
    assert!(!state.sharing().share(&alice.id, &request).await);
}

#[tokio::test]
async fn test_share_single_file() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let shared = common::upload(&state, &alice, &alice.root, "shared.pdf", &[&alice]).await;
    common::upload(&state, &alice, &alice.root, "private.pdf", &[&alice]).await;

    let prepared = state
        .sharing()
        .prepare_share(&alice.id, &shared.file, &[bob.email.clone()])
        .await
        .unwrap();
    assert_eq!(prepared.files.len(), 1);
    assert_eq!(prepared.files[0].file_id, shared.file);

    let request = prepared.fan_out(&alice.id, &alice.secret).unwrap();
    assert!(state.sharing().share(&alice.id, &request).await);
}

#[tokio::test]
async fn test_share_rejects_foreign_issuer() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let upload = common::upload(&state, &alice, &alice.root, "doc.pdf", &[&alice]).await;
    let request = ShareRequest {
        revisions: vec![RevisionShare {
            revision_id: upload.revision.clone(),
            keys: common::wrap_for(&upload.content_key, &bob, &[&bob]),
        }],
    };

    assert!(!state.sharing().share(&alice.id, &request).await);
    // bob issuing for himself lacks write on the file
    assert!(!state.sharing().share(&bob.id, &request).await);

    let meta = state
        .files()
        .get_file_metadata(&alice.id, &upload.file, None)
        .await
        .unwrap();
    assert_eq!(meta.revisions[0].access_key.as_ref().unwrap().user, alice.id);
}

#[tokio::test]
async fn test_share_is_applied_per_revision() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;

    let upload = common::upload(&state, &alice, &alice.root, "doc.pdf", &[&alice]).await;
    let good = RevisionShare {
        revision_id: upload.revision.clone(),
        keys: common::wrap_for(&upload.content_key, &alice, &[&bob]),
    };
    let missing = RevisionShare {
        revision_id: ObjectId::new(IdKind::FileBlob),
        keys: vec![AccessKey {
            user: bob.id.clone(),
            issuer: alice.id.clone(),
            encrypted_key: "00".to_string(),
        }],
    };
    let request = ShareRequest {
        revisions: vec![missing, good],
    };

    // reported as incomplete, but the valid revision still landed
    assert!(!state.sharing().share(&alice.id, &request).await);

    assert!(
        state
            .files()
            .set_permission(&alice.id, &upload.file, &bob.id, Permission::READ)
            .await
    );
    let meta = state
        .files()
        .get_file_metadata(&bob.id, &upload.file, None)
        .await
        .unwrap();
    assert!(meta.revisions[0].access_key.is_some());
}

#[tokio::test]
async fn test_prepare_share_keeps_files_with_equal_positions_whole() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let first = common::upload(&state, &alice, &alice.root, "a.pdf", &[&alice]).await;
    let second = common::upload(&state, &alice, &alice.root, "b.pdf", &[&alice]).await;
    // interleave the revisions' quick numbers across both files
    common::add_revision(&state, &alice, &first.file, &[&alice]).await;
    common::add_revision(&state, &alice, &second.file, &[&alice]).await;

    sqlx::query("UPDATE files SET position = 0")
        .execute(&**state.database())
        .await
        .unwrap();

    let prepared = state
        .sharing()
        .prepare_share(&alice.id, &alice.root, &[bob.email.clone()])
        .await
        .unwrap();

    assert_eq!(prepared.files.len(), 2);
    let mut ids: Vec<&ObjectId> = prepared.files.iter().map(|f| &f.file_id).collect();
    ids.sort();
    let mut expected = vec![&first.file, &second.file];
    expected.sort();
    assert_eq!(ids, expected);
    for file in &prepared.files {
        assert_eq!(file.revisions.len(), 2);
    }
}
