use super::PathProtection;
use crate::app_error::AppError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn assert_rejected(protection: &PathProtection, path: &str) {
    match protection.validate(Path::new(path)) {
        Err(AppError::UnsafePath { .. }) => {}
        other => panic!("expected '{path}' to be rejected, got {other:?}"),
    }
}

#[test]
fn accepts_plain_relative_paths() {
    let dir = tempdir().unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();

    assert_eq!(
        protection.validate(Path::new("src/a.ts")).unwrap(),
        PathBuf::from("src/a.ts")
    );
    assert_eq!(
        protection.validate(Path::new("./src/./b.ts")).unwrap(),
        PathBuf::from("src/b.ts")
    );
}

#[test]
fn rejects_traversal_and_absolute_paths() {
    let dir = tempdir().unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();

    assert_rejected(&protection, "../outside.txt");
    assert_rejected(&protection, "src/../../outside.txt");
    assert_rejected(&protection, "src/../a.ts");
    assert_rejected(&protection, "/etc/passwd");
    assert_rejected(&protection, "");
    assert_rejected(&protection, ".");
}

#[test]
fn rejects_protected_directories() {
    let dir = tempdir().unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();

    assert_rejected(&protection, ".git/config");
    assert_rejected(&protection, "agent-config/rounds/task.json");
    assert_rejected(&protection, "./agent-config/logs/x.txt");
}

#[test]
fn rejects_gitignored_paths() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".gitignore"), "node_modules/\n*.env\n/dist\n").unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();

    assert_rejected(&protection, "node_modules/pkg/index.js");
    assert_rejected(&protection, "prod.env");
    assert_rejected(&protection, "dist/bundle.js");
    assert!(protection.validate(Path::new("src/dist.ts")).is_ok());
}

#[test]
fn missing_gitignore_is_fine() {
    let dir = tempdir().unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();
    assert!(protection.validate(Path::new("README.md")).is_ok());
}
