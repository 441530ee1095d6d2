use super::{apply_all, partition_safe, write_manifest, ApplyWarning, FileChange, Manifest};
use crate::app_error::AppError;
use crate::file_store::memory_store::MemoryStore;
use crate::file_store::{FileStore, PathProtection};
use crate::response_parser::{Edit, EditKind};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn edit(path: &str, kind: EditKind, content: &str) -> Edit {
    Edit {
        file_path: PathBuf::from(path),
        kind,
        content: content.to_string(),
    }
}

fn diff(search: &str, replace: &str) -> String {
    format!("<<<<<<< SEARCH\n{search}\n=======\n{replace}\n>>>>>>> REPLACE")
}

#[test]
fn later_edits_apply_to_earlier_results() {
    let store = MemoryStore::with_files(&[("a.ts", "one\ntwo\n")]);
    let edits = vec![
        edit("a.ts", EditKind::SearchReplaceDiff, &diff("one", "uno")),
        edit("a.ts", EditKind::SearchReplaceDiff, &diff("uno\ntwo", "uno\ndos")),
    ];

    let manifest = apply_all(&edits, |p| store.read(p));

    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].content, "uno\ndos\n");
    assert!(manifest.files[0].changed);
    assert!(manifest.warnings.is_empty());
}

#[test]
fn files_keep_first_seen_order() {
    let store = MemoryStore::default();
    let edits = vec![
        edit("z.ts", EditKind::FullRewrite, "z"),
        edit("a.ts", EditKind::FullRewrite, "a"),
        edit("z.ts", EditKind::FullRewrite, "zz"),
    ];

    let manifest = apply_all(&edits, |p| store.read(p));

    let paths: Vec<&Path> = manifest.files.iter().map(|f| f.path.as_path()).collect();
    assert_eq!(paths, vec![Path::new("z.ts"), Path::new("a.ts")]);
    assert_eq!(manifest.files[0].content, "zz");
    assert!(!manifest.files[0].existed);
}

#[test]
fn rewrite_then_diff_on_new_file() {
    let store = MemoryStore::default();
    let edits = vec![
        edit("new.ts", EditKind::FullRewrite, "let a = 1;\nlet b = 2;\n"),
        edit("new.ts", EditKind::SearchReplaceDiff, &diff("let b = 2;", "let b = 3;")),
    ];

    let manifest = apply_all(&edits, |p| store.read(p));
    assert_eq!(manifest.files[0].content, "let a = 1;\nlet b = 3;\n");
}

#[test]
fn unresolved_block_touches_file_without_changing_it() {
    let store = MemoryStore::with_files(&[("a.ts", "line1\nline2\nline3")]);
    let edits = vec![edit("a.ts", EditKind::SearchReplaceDiff, &diff("absent", "x"))];

    let manifest = apply_all(&edits, |p| store.read(p));

    assert_eq!(
        manifest.files,
        vec![FileChange {
            path: PathBuf::from("a.ts"),
            content: "line1\nline2\nline3".to_string(),
            existed: true,
            changed: false,
        }]
    );
    assert_eq!(
        manifest.warnings,
        vec![ApplyWarning::UnresolvedSearchBlock {
            path: PathBuf::from("a.ts"),
            search: "absent".to_string(),
        }]
    );
}

#[test]
fn diff_without_blocks_is_reported() {
    let store = MemoryStore::with_files(&[("a.ts", "x")]);
    let edits = vec![edit("a.ts", EditKind::SearchReplaceDiff, "just prose")];

    let manifest = apply_all(&edits, |p| store.read(p));

    assert_eq!(
        manifest.warnings,
        vec![ApplyWarning::NoBlocks {
            path: PathBuf::from("a.ts")
        }]
    );
    assert!(!manifest.files[0].changed);
}

#[test]
fn unresolved_diff_on_absent_file_is_not_a_change() {
    let store = MemoryStore::default();
    let edits = vec![edit("ghost.ts", EditKind::SearchReplaceDiff, &diff("a", "b"))];

    let manifest = apply_all(&edits, |p| store.read(p));

    assert!(!manifest.files[0].existed);
    assert!(!manifest.files[0].changed);
}

#[test]
fn read_failure_skips_only_that_file() {
    let edits = vec![
        edit("bad.ts", EditKind::FullRewrite, "x"),
        edit("good.ts", EditKind::FullRewrite, "y"),
    ];

    let manifest = apply_all(&edits, |p| {
        if p == Path::new("bad.ts") {
            Err(AppError::Config("unreadable".to_string()))
        } else {
            Ok(None)
        }
    });

    assert_eq!(manifest.files.len(), 1);
    assert_eq!(manifest.files[0].path, PathBuf::from("good.ts"));
    assert!(matches!(
        manifest.warnings.as_slice(),
        [ApplyWarning::ReadFailed { .. }]
    ));
}

#[test]
fn partition_rejects_unsafe_paths_and_cleans_the_rest() {
    let dir = tempdir().unwrap();
    let protection = PathProtection::new_for_base_dir(dir.path()).unwrap();
    let edits = vec![
        edit("./src/a.ts", EditKind::FullRewrite, "a"),
        edit("../escape.ts", EditKind::FullRewrite, "b"),
        edit("/abs.ts", EditKind::FullRewrite, "c"),
    ];

    let (safe, warnings) = partition_safe(&edits, &protection);

    assert_eq!(safe.len(), 1);
    assert_eq!(safe[0].file_path, PathBuf::from("src/a.ts"));
    assert_eq!(warnings.len(), 2);
    assert!(warnings
        .iter()
        .all(|w| matches!(w, ApplyWarning::RejectedPath { .. })));
}

#[test]
fn write_manifest_isolates_failures() {
    let store = MemoryStore::default();
    store.fail_writes_to("root/b.ts");
    let manifest = Manifest {
        files: vec![
            FileChange {
                path: PathBuf::from("a.ts"),
                content: "a".to_string(),
                existed: false,
                changed: true,
            },
            FileChange {
                path: PathBuf::from("b.ts"),
                content: "b".to_string(),
                existed: true,
                changed: true,
            },
            FileChange {
                path: PathBuf::from("c.ts"),
                content: "c".to_string(),
                existed: true,
                changed: false,
            },
        ],
        warnings: Vec::new(),
    };

    let report = write_manifest(&manifest, Path::new("root"), &store);

    assert_eq!(report.written, vec![PathBuf::from("a.ts")]);
    assert_eq!(report.unchanged, vec![PathBuf::from("c.ts")]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, PathBuf::from("b.ts"));
    assert_eq!(store.get("root/a.ts").as_deref(), Some("a"));
    assert!(store.get("root/c.ts").is_none());
}

#[test]
fn warnings_display_the_path_and_cause() {
    let unresolved = ApplyWarning::UnresolvedSearchBlock {
        path: PathBuf::from("a.ts"),
        search: "fn main() {\n}".to_string(),
    };
    assert_eq!(
        unresolved.to_string(),
        "a.ts: search text not found (starting with \"fn main() {\"); block skipped"
    );

    let rejected = ApplyWarning::RejectedPath {
        path: PathBuf::from("../x"),
        reason: "Path traversal ('..') is not allowed.".to_string(),
    };
    assert_eq!(
        rejected.to_string(),
        "../x: refused (Path traversal ('..') is not allowed.)"
    );
}

#[test]
fn unresolved_diff_leaves_crlf_file_unchanged() {
    let original = "line1\r\nline2\r\nline3\r\n";
    let store = MemoryStore::with_files(&[("a.ts", original)]);
    let edits = vec![edit("a.ts", EditKind::SearchReplaceDiff, &diff("nope", "x"))];

    let manifest = apply_all(&edits, |p| store.read(p));
    let report = write_manifest(&manifest, Path::new(""), &store);

    assert_eq!(manifest.files[0].content, original);
    assert!(!manifest.files[0].changed);
    assert!(report.written.is_empty());
    assert_eq!(report.unchanged, vec![PathBuf::from("a.ts")]);
    assert_eq!(store.get("a.ts").as_deref(), Some(original));
}

#[test]
fn resolved_diff_keeps_crlf_outside_the_match() {
    let store = MemoryStore::with_files(&[("a.ts", "line1\r\nline2\r\nline3\r\n")]);
    let edits = vec![edit("a.ts", EditKind::SearchReplaceDiff, &diff("line2", "CHANGED"))];

    let manifest = apply_all(&edits, |p| store.read(p));

    assert_eq!(manifest.files[0].content, "line1\r\nCHANGED\r\nline3\r\n");
    assert!(manifest.files[0].changed);
}
