//! Integration tests for the guard state directory
//!
//! These drive the library side (state directory + service) and the `guard`
//! binary against a temporary directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use common::prelude::{IdKind, ObjectId, SecretKey};
use guard_daemon::{AppConfig, AppState};

fn guard(path: &Path, args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_guard"))
        .arg("--path")
        .arg(path)
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .unwrap();
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

/// Value after `- {label}: ` in command output.
fn field(output: &str, label: &str) -> String {
    let prefix = format!("- {}: ", label);
    output
        .lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_service_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().to_path_buf();
    let state = AppState::init(Some(path.clone()), Some(AppConfig::default())).unwrap();

    let user = ObjectId::new(IdKind::User);
    let root = ObjectId::new(IdKind::Directory);
    let key = SecretKey::generate().unwrap();
    {
        let service = state.open_service().await.unwrap();
        assert!(
            service
                .users()
                .insert_user(
                    &user,
                    &root,
                    "alice@example.com",
                    "hash",
                    "salt",
                    &key.public().to_hex(),
                    "",
                )
                .await
        );
        state.save_key(&user, &key).unwrap();
        service.database().close().await;
    }

    let state = AppState::load(Some(path)).unwrap();
    let service = state.open_service().await.unwrap();
    let info = service
        .users()
        .get_user_information(&user, &user)
        .await
        .unwrap();
    assert_eq!(info.root_directory_id, root);
    assert_eq!(info.public_key, key.public().to_hex());
    assert_eq!(
        state.load_key(&user).unwrap().public().to_hex(),
        info.public_key
    );
}

#[test]
fn test_cli_flow() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("guard");

    let (ok, out) = guard(&path, &["init", "--log-level", "debug"]);
    assert!(ok, "init failed: {}", out);
    assert!(path.join("guard.sqlite").exists());

    let (ok, _) = guard(&path, &["init"]);
    assert!(!ok, "second init must fail");

    let (ok, out) = guard(
        &path,
        &[
            "user",
            "add",
            "--email",
            "alice@example.com",
            "--password-hash",
            "hash",
            "--salt",
            "salt",
        ],
    );
    assert!(ok, "user add failed: {}", out);
    let user = field(&out, "User");
    let root = field(&out, "Root directory");
    assert!(Path::new(&field(&out, "Key")).exists());

    let (ok, _) = guard(
        &path,
        &[
            "user",
            "add",
            "--email",
            "alice@example.com",
            "--password-hash",
            "hash",
            "--salt",
            "salt",
        ],
    );
    assert!(!ok, "duplicate email must be refused");

    let (ok, out) = guard(&path, &["user", "show", "--user", &user]);
    assert!(ok);
    assert_eq!(field(&out, "Email"), "alice@example.com");
    assert_eq!(field(&out, "Root directory"), root);
    assert_eq!(field(&out, "Private key"), "stored locally");

    let (ok, out) = guard(&path, &["ls", "--user", &user]);
    assert!(ok);
    assert!(out.contains("No items found"));

    let (ok, out) = guard(
        &path,
        &["mkdir", "--user", &user, "--parent", &root, "--name", "letters"],
    );
    assert!(ok, "mkdir failed: {}", out);
    let letters = out.split_whitespace().next().unwrap().to_string();

    let (ok, _) = guard(
        &path,
        &["mkdir", "--user", &user, "--parent", &root, "--name", "letters"],
    );
    assert!(!ok, "duplicate name must be refused");

    let (ok, out) = guard(&path, &["ls", "--user", &user, "--dir", &root]);
    assert!(ok);
    assert!(out.contains(&letters));
    assert!(out.contains("letters  [0 items]"));

    let (ok, out) = guard(&path, &["ls", "--user", &user, "--dir", &letters]);
    assert!(ok);
    assert!(out.contains(&format!("path: /{}/{}", root, letters)));
}

#[test]
fn test_cli_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let user = ObjectId::new(IdKind::User).to_string();
    let (ok, _) = guard(temp_dir.path(), &["user", "show", "--user", &user]);
    assert!(!ok);
}
