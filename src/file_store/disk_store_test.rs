use super::{DiskStore, FileStore};
use crate::app_error::AppError;
use std::fs;
use tempfile::tempdir;

#[test]
fn read_missing_file_is_absent() {
    let dir = tempdir().unwrap();
    let content = DiskStore.read(&dir.path().join("nope.txt")).unwrap();
    assert!(content.is_none());
}

#[test]
fn write_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a/b/c.txt");

    DiskStore.write(&path, "hello").unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    assert!(DiskStore.exists(&path));
    assert_eq!(DiskStore.read(&path).unwrap().as_deref(), Some("hello"));
}

#[test]
fn exists_is_false_for_directories() {
    let dir = tempdir().unwrap();
    assert!(!DiskStore.exists(dir.path()));
}

#[test]
fn copy_into_new_directory() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src.txt");
    fs::write(&src, "payload").unwrap();
    let dst = dir.path().join("round-1/nested/src.txt");

    DiskStore.copy(&src, &dst).unwrap();

    assert_eq!(fs::read_to_string(dst).unwrap(), "payload");
}

#[test]
fn copy_missing_source_is_a_write_error() {
    let dir = tempdir().unwrap();
    let result = DiskStore.copy(&dir.path().join("missing"), &dir.path().join("dst"));
    assert!(matches!(result, Err(AppError::FileWrite { .. })));
}

#[test]
fn read_non_utf8_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bin.dat");
    fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
    assert!(matches!(DiskStore.read(&path), Err(AppError::Io(_))));
}

#[test]
fn ensure_dir_is_idempotent() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("x/y");
    DiskStore.ensure_dir(&target).unwrap();
    DiskStore.ensure_dir(&target).unwrap();
    assert!(target.is_dir());
}
