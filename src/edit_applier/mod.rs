//! Folds a change set's edits into one new content per file and writes the
//! resulting manifest back through a [`FileStore`].

#[cfg(test)]
mod mod_test;

use crate::app_error::AppError;
use crate::file_store::{FileStore, PathProtection};
use crate::patch_engine;
use crate::response_parser::{Edit, EditKind};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct FileChange {
    pub path: PathBuf,
    pub content: String,
    pub existed: bool,
    /// False when every edit for the file was a no-op; such files stay in
    /// the manifest but are not rewritten.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) enum ApplyWarning {
    UnresolvedSearchBlock { path: PathBuf, search: String },
    NoBlocks { path: PathBuf },
    RejectedPath { path: PathBuf, reason: String },
    ReadFailed { path: PathBuf, message: String },
}

impl fmt::Display for ApplyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyWarning::UnresolvedSearchBlock { path, search } => {
                let first_line = search.lines().next().unwrap_or_default();
                write!(
                    f,
                    "{}: search text not found (starting with {first_line:?}); block skipped",
                    path.display()
                )
            }
            ApplyWarning::NoBlocks { path } => {
                write!(f, "{}: edit contained no usable blocks", path.display())
            }
            ApplyWarning::RejectedPath { path, reason } => {
                write!(f, "{}: refused ({reason})", path.display())
            }
            ApplyWarning::ReadFailed { path, message } => {
                write!(f, "{}: could not be read ({message})", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Manifest {
    pub files: Vec<FileChange>,
    pub warnings: Vec<ApplyWarning>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub(crate) struct WriteReport {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub failures: Vec<WriteFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WriteFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Splits edits into those with acceptable paths (cleaned) and warnings for
/// the rest.
pub(crate) fn partition_safe(
    edits: &[Edit],
    protection: &PathProtection,
) -> (Vec<Edit>, Vec<ApplyWarning>) {
    let mut safe = Vec::with_capacity(edits.len());
    let mut warnings = Vec::new();

    for edit in edits {
        match protection.validate(&edit.file_path) {
            Ok(cleaned) => safe.push(Edit {
                file_path: cleaned,
                ..edit.clone()
            }),
            Err(AppError::UnsafePath { path, reason }) => {
                warnings.push(ApplyWarning::RejectedPath { path, reason })
            }
            Err(e) => warnings.push(ApplyWarning::RejectedPath {
                path: edit.file_path.clone(),
                reason: e.to_string(),
            }),
        }
    }
    (safe, warnings)
}

/// Groups `edits` by path (first-seen order), reads each file once through
/// `read_file`, and folds the file's edits over it in order.
///
/// Performs no I/O itself. A file whose read fails is left out and reported.
pub(crate) fn apply_all<F>(edits: &[Edit], mut read_file: F) -> Manifest
where
    F: FnMut(&Path) -> Result<Option<String>, AppError>,
{
    let mut manifest = Manifest::default();

    for (path, file_edits) in group_by_path(edits) {
        let original = match read_file(&path) {
            Ok(original) => original,
            Err(e) => {
                manifest.warnings.push(ApplyWarning::ReadFailed {
                    path,
                    message: e.to_string(),
                });
                continue;
            }
        };

        let mut content = original.clone();
        let mut resolved = 0;
        for edit in file_edits {
            let outcome = patch_engine::apply(content.as_deref(), edit);
            let no_blocks = outcome.resolved == 0 && outcome.unresolved.is_empty();
            if edit.kind != EditKind::FullRewrite && no_blocks {
                manifest.warnings.push(ApplyWarning::NoBlocks { path: path.clone() });
            }
            for block in outcome.unresolved {
                manifest.warnings.push(ApplyWarning::UnresolvedSearchBlock {
                    path: path.clone(),
                    search: block.search,
                });
            }
            resolved += outcome.resolved;
            content = Some(outcome.content);
        }

        let content = content.unwrap_or_default();
        let changed = match &original {
            Some(before) => *before != content,
            None => resolved > 0,
        };
        manifest.files.push(FileChange {
            path,
            content,
            existed: original.is_some(),
            changed,
        });
    }

    manifest
}

fn group_by_path(edits: &[Edit]) -> Vec<(PathBuf, Vec<&Edit>)> {
    let mut groups: Vec<(PathBuf, Vec<&Edit>)> = Vec::new();
    let mut index: HashMap<&Path, usize> = HashMap::new();

    for edit in edits {
        match index.get(edit.file_path.as_path()).copied() {
            Some(i) => groups[i].1.push(edit),
            None => {
                index.insert(edit.file_path.as_path(), groups.len());
                groups.push((edit.file_path.clone(), vec![edit]));
            }
        }
    }
    groups
}

/// Writes every changed file under `root`. Failures are collected per file
/// and never stop the rest of the batch.
pub(crate) fn write_manifest(
    manifest: &Manifest,
    root: &Path,
    store: &dyn FileStore,
) -> WriteReport {
    let mut report = WriteReport::default();

    for file in &manifest.files {
        if !file.changed {
            report.unchanged.push(file.path.clone());
            continue;
        }
        match store.write(&root.join(&file.path), &file.content) {
            Ok(()) => report.written.push(file.path.clone()),
            Err(e) => report.failures.push(WriteFailure {
                path: file.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    report
}
