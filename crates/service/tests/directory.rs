//! Integration tests for directory tree operations

mod common;

use ::common::id::{IdKind, ObjectId};
use ::common::permission::Permission;

#[tokio::test]
async fn test_root_directory_created_with_user() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;

    let root = state
        .directories()
        .get_directory_metadata(&alice.id, &alice.root, None)
        .await
        .unwrap();

    assert!(root.is_root);
    assert_eq!(root.owner, alice.id);
    assert_eq!(root.path, vec![alice.root.clone()]);
    assert_eq!(root.object.permissions.len(), 1);
    assert_eq!(root.object.permissions[0].user, alice.id);
    assert_eq!(root.object.permissions[0].permission, Permission::owner());
    assert!(root.directories.is_empty());
    assert!(root.files.is_empty());
}

#[tokio::test]
async fn test_move_rewrites_subtree_paths() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;
    let r = user.root.clone();

    let a = common::mkdir(&state, &user, &r, "A").await;
    let b = common::mkdir(&state, &user, &r, "B").await;
    let c = common::mkdir(&state, &user, &a, "C").await;

    assert_eq!(common::path_of(&state, &user, &a).await, vec![r.clone(), a.clone()]);
    assert_eq!(common::path_of(&state, &user, &b).await, vec![r.clone(), b.clone()]);
    assert_eq!(
        common::path_of(&state, &user, &c).await,
        vec![r.clone(), a.clone(), c.clone()]
    );

    assert!(state.directories().move_directory(&user.id, &a, &b).await);

    assert_eq!(
        common::path_of(&state, &user, &a).await,
        vec![r.clone(), b.clone(), a.clone()]
    );
    assert_eq!(
        common::path_of(&state, &user, &c).await,
        vec![r.clone(), b.clone(), a.clone(), c.clone()]
    );
    assert_eq!(common::child_directories(&state, &user, &r).await, vec![b.clone()]);
    assert_eq!(common::child_directories(&state, &user, &b).await, vec![a.clone()]);
    assert_eq!(common::child_directories(&state, &user, &a).await, vec![c]);
}

#[tokio::test]
async fn test_path_is_parent_path_plus_self() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let mut parent = user.root.clone();
    let mut expected = vec![user.root.clone()];
    for depth in 0..5 {
        let child = common::mkdir(&state, &user, &parent, &format!("level-{}", depth)).await;
        expected.push(child.clone());
        assert_eq!(common::path_of(&state, &user, &child).await, expected);
        parent = child;
    }
}

#[tokio::test]
async fn test_move_under_own_descendant_is_refused() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let a = common::mkdir(&state, &user, &user.root, "A").await;
    let c = common::mkdir(&state, &user, &a, "C").await;
    let d = common::mkdir(&state, &user, &c, "D").await;

    assert!(!state.directories().move_directory(&user.id, &a, &c).await);
    assert!(!state.directories().move_directory(&user.id, &a, &d).await);
    assert!(!state.directories().move_directory(&user.id, &a, &a).await);
    assert!(!state.directories().move_directory(&user.id, &user.root, &a).await);

    // nothing moved
    assert_eq!(
        common::path_of(&state, &user, &d).await,
        vec![user.root.clone(), a.clone(), c.clone(), d.clone()]
    );
}

#[tokio::test]
async fn test_move_to_current_parent_is_refused() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;
    let a = common::mkdir(&state, &user, &user.root, "A").await;

    assert!(!state.directories().move_directory(&user.id, &a, &user.root).await);
    assert_eq!(
        common::path_of(&state, &user, &a).await,
        vec![user.root.clone(), a]
    );
}

#[tokio::test]
async fn test_duplicate_directory_name_fails() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    common::mkdir(&state, &user, &user.root, "docs").await;
    let duplicate = ObjectId::new(IdKind::Directory);
    assert!(
        !state
            .directories()
            .insert_directory(&user.id, &user.root, "docs", &duplicate)
            .await
    );

    assert_eq!(common::child_directories(&state, &user, &user.root).await.len(), 1);
    assert!(state
        .directories()
        .get_directory_metadata(&user.id, &duplicate, None)
        .await
        .is_none());
}

#[tokio::test]
async fn test_same_name_in_different_parents() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let a = common::mkdir(&state, &user, &user.root, "A").await;
    let b = common::mkdir(&state, &user, &user.root, "B").await;
    common::mkdir(&state, &user, &a, "shared").await;
    common::mkdir(&state, &user, &b, "shared").await;
}

#[tokio::test]
async fn test_rename_frees_old_name() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let a = common::mkdir(&state, &user, &user.root, "old").await;
    assert!(state.directories().rename_directory(&user.id, &a, "new").await);

    let meta = state
        .directories()
        .get_directory_metadata(&user.id, &a, None)
        .await
        .unwrap();
    assert_eq!(meta.object.name, "new");

    common::mkdir(&state, &user, &user.root, "old").await;

    // and the new name is now taken
    let b = common::mkdir(&state, &user, &user.root, "other").await;
    assert!(!state.directories().rename_directory(&user.id, &b, "new").await);
}

#[tokio::test]
async fn test_root_cannot_be_deleted() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;
    let a = common::mkdir(&state, &user, &user.root, "A").await;

    assert!(state
        .directories()
        .delete_directory(&user.id, &user.root)
        .await
        .is_none());

    assert!(state
        .directories()
        .get_directory_metadata(&user.id, &user.root, None)
        .await
        .is_some());
    assert_eq!(common::child_directories(&state, &user, &user.root).await, vec![a]);
}

#[tokio::test]
async fn test_delete_returns_every_revision_in_subtree() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let d = common::mkdir(&state, &user, &user.root, "D").await;
    let e = common::mkdir(&state, &user, &d, "E").await;
    let keep = common::mkdir(&state, &user, &user.root, "keep").await;

    let one = common::upload(&state, &user, &d, "one.pdf", &[&user]).await;
    let (one_v2, _) = common::add_revision(&state, &user, &one.file, &[&user]).await;
    let two = common::upload(&state, &user, &e, "two.pdf", &[&user]).await;
    let kept = common::upload(&state, &user, &keep, "kept.pdf", &[&user]).await;

    let mut deleted = state
        .directories()
        .delete_directory(&user.id, &d)
        .await
        .unwrap();
    deleted.sort();
    let mut expected = vec![one.revision, one_v2, two.revision];
    expected.sort();
    assert_eq!(deleted, expected);

    for gone in [&d, &e] {
        assert!(state
            .directories()
            .get_directory_metadata(&user.id, gone, None)
            .await
            .is_none());
    }
    assert!(state
        .files()
        .get_file_metadata(&user.id, &one.file, None)
        .await
        .is_none());
    assert!(state
        .files()
        .get_file_metadata(&user.id, &kept.file, None)
        .await
        .is_some());
    assert_eq!(
        common::child_directories(&state, &user, &user.root).await,
        vec![keep]
    );
}

#[tokio::test]
async fn test_acl_is_a_snapshot() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let dirs = state.directories();

    assert!(dirs.set_permission(&alice.id, &alice.root, &bob.id, Permission::READ).await);
    let before = common::mkdir(&state, &alice, &alice.root, "before").await;

    assert!(dirs.set_permission(&alice.id, &alice.root, &bob.id, Permission::empty()).await);
    let after = common::mkdir(&state, &alice, &alice.root, "after").await;

    let granted = dirs.get_permissions(&alice.id, &bob.id, &[before.clone()]).await;
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].object_id, before);
    assert_eq!(granted[0].permission, Permission::READ);

    assert!(dirs.get_permissions(&alice.id, &bob.id, &[after.clone()]).await.is_empty());

    // bob still reads the earlier child, never the later one or the root
    assert!(dirs.get_directory_metadata(&bob.id, &before, None).await.is_some());
    assert!(dirs.get_directory_metadata(&bob.id, &after, None).await.is_none());
    assert!(dirs.get_directory_metadata(&bob.id, &alice.root, None).await.is_none());
}

#[tokio::test]
async fn test_child_acl_equals_parent_acl() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let dirs = state.directories();

    assert!(dirs.set_permission(&alice.id, &alice.root, &bob.id, Permission::READ_WRITE).await);
    let child = common::mkdir(&state, &alice, &alice.root, "child").await;

    let parent = dirs.get_directory_metadata(&alice.id, &alice.root, None).await.unwrap();
    let child = dirs.get_directory_metadata(&alice.id, &child, None).await.unwrap();
    assert_eq!(parent.object.permissions, child.object.permissions);
}

#[tokio::test]
async fn test_write_is_required_for_mutations() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let dirs = state.directories();

    assert!(dirs.set_permission(&alice.id, &alice.root, &bob.id, Permission::READ).await);
    let a = common::mkdir(&state, &alice, &alice.root, "A").await;
    let b = common::mkdir(&state, &alice, &alice.root, "B").await;

    let attempt = ObjectId::new(IdKind::Directory);
    assert!(!dirs.insert_directory(&bob.id, &alice.root, "bob's", &attempt).await);
    assert!(!dirs.rename_directory(&bob.id, &a, "renamed").await);
    assert!(!dirs.move_directory(&bob.id, &a, &b).await);
    assert!(dirs.delete_directory(&bob.id, &a).await.is_none());

    // bob can move into his own tree only with write on both ends
    assert!(!dirs.move_directory(&bob.id, &a, &bob.root).await);

    assert_eq!(
        common::child_directories(&state, &alice, &alice.root).await,
        vec![a, b]
    );
}

#[tokio::test]
async fn test_writer_creates_in_owners_tree() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let dirs = state.directories();

    assert!(dirs.set_permission(&alice.id, &alice.root, &bob.id, Permission::READ_WRITE).await);
    let made_by_bob = common::mkdir(&state, &bob, &alice.root, "from-bob").await;

    let meta = dirs.get_directory_metadata(&bob.id, &made_by_bob, None).await.unwrap();
    assert_eq!(meta.owner, alice.id);
    // bob lacks read-permissions, so he only sees his own entry
    assert_eq!(meta.object.permissions.len(), 1);
    assert_eq!(meta.object.permissions[0].user, bob.id);
}

#[tokio::test]
async fn test_unreadable_children_are_hidden() {
    let state = common::setup_state().await;
    let alice = common::register(&state, "alice@example.com").await;
    let bob = common::register(&state, "bob@example.com").await;
    let dirs = state.directories();

    let shared = common::mkdir(&state, &alice, &alice.root, "shared").await;
    let private = common::mkdir(&state, &alice, &shared, "private").await;
    assert!(dirs.set_permission(&alice.id, &shared, &bob.id, Permission::READ).await);
    let visible = common::mkdir(&state, &alice, &shared, "visible").await;

    let listing = dirs.get_directory_metadata(&bob.id, &shared, None).await.unwrap();
    let ids: Vec<ObjectId> = listing.directories.iter().map(|d| d.object.id.clone()).collect();
    assert_eq!(ids, vec![visible]);
    assert!(!ids.contains(&private));

    let owner_view = dirs.get_directory_metadata(&alice.id, &shared, None).await.unwrap();
    assert_eq!(owner_view.directories.len(), 2);
}

#[tokio::test]
async fn test_child_counts() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;

    let a = common::mkdir(&state, &user, &user.root, "A").await;
    common::mkdir(&state, &user, &a, "x").await;
    common::mkdir(&state, &user, &a, "y").await;
    common::upload(&state, &user, &a, "z.pdf", &[&user]).await;

    let root = state
        .directories()
        .get_directory_metadata(&user.id, &user.root, None)
        .await
        .unwrap();
    assert_eq!(root.directories.len(), 1);
    assert_eq!(root.directories[0].child_count, 3);
}

#[tokio::test]
async fn test_wrong_id_kinds_are_rejected() {
    let state = common::setup_state().await;
    let user = common::register(&state, "u@example.com").await;
    let dirs = state.directories();

    let file_kind = ObjectId::new(IdKind::File);
    assert!(!dirs.insert_directory(&user.id, &user.root, "bad", &file_kind).await);
    let fresh = ObjectId::new(IdKind::Directory);
    assert!(!dirs.insert_directory(&user.root, &user.root, "bad", &fresh).await);
    assert!(dirs.get_directory_metadata(&user.id, &file_kind, None).await.is_none());
    assert!(dirs.delete_directory(&user.id, &user.id).await.is_none());
    assert!(dirs.get_permissions(&user.id, &user.id, &[file_kind]).await.is_empty());

    let root = dirs.get_directory_metadata(&user.id, &user.root, None).await.unwrap();
    assert!(root.directories.is_empty());
}
