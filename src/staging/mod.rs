//! Materializes round directories: the initial project walk, the structure
//! listing, and copies of the staged files.


use crate::app_error::AppError;
use crate::config::AGENT_CONFIG_DIR;
use crate::file_store::FileStore;
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const STRUCTURE_FILE: &str = "project_structure.txt";
pub(crate) const INSTRUCTIONS_FILE: &str = "instructions.md";
/// Project copies live here, apart from the generated files beside it.
pub(crate) const FILES_DIR: &str = "files";
const ROUND_DIR_PREFIX: &str = "round-";

pub(crate) struct WalkOptions<'a> {
    pub ignore_globs: &'a [String],
    pub max_file_bytes: u64,
}

/// Project-relative paths of every stageable file under `root`, sorted.
pub(crate) fn collect_files(root: &Path, options: &WalkOptions) -> Result<Vec<PathBuf>, AppError> {
    let mut overrides = OverrideBuilder::new(root);
    for glob in options.ignore_globs {
        overrides
            .add(&format!("!{glob}"))
            .map_err(|e| AppError::Config(format!("Invalid ignore pattern '{glob}': {e}")))?;
    }
    let overrides = overrides
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build ignore patterns: {e}")))?;

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .require_git(false)
        .overrides(overrides)
        .filter_entry(|entry| entry.file_name() != AGENT_CONFIG_DIR)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result.map_err(|e| AppError::Staging(format!("Error walking directory: {e}")))?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let too_large = entry
            .metadata()
            .map(|m| m.len() > options.max_file_bytes)
            .unwrap_or(true);
        if too_large {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Indented tree listing of `paths`, directories suffixed with `/`.
pub(crate) fn render_structure(paths: &[PathBuf]) -> String {
    let mut out = String::new();
    let mut open_dirs: Vec<String> = Vec::new();

    for path in paths {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let Some((file, dirs)) = parts.split_last() else {
            continue;
        };

        let shared = open_dirs
            .iter()
            .zip(dirs)
            .take_while(|(open, dir)| open == dir)
            .count();
        open_dirs.truncate(shared);

        for dir in &dirs[shared..] {
            out.push_str(&format!("{}{dir}/\n", "  ".repeat(open_dirs.len())));
            open_dirs.push(dir.clone());
        }
        out.push_str(&format!("{}{file}\n", "  ".repeat(open_dirs.len())));
    }
    out
}

pub(crate) fn round_directory(staging_root: &Path, index: u32) -> PathBuf {
    staging_root.join(format!("{ROUND_DIR_PREFIX}{index}"))
}

/// Removes earlier round directories and the task file so a new task starts clean.
pub(crate) fn reset(staging_root: &Path, task_file: &str) -> Result<(), AppError> {
    let entries = match fs::read_dir(staging_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(AppError::Io(e)),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let path = entry.path();
        if name.starts_with(ROUND_DIR_PREFIX) && path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if name == task_file && path.is_file() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

pub(crate) struct RoundContents<'a> {
    pub files: &'a [PathBuf],
    pub structure: Option<&'a str>,
    pub instructions: &'a str,
}

/// Copies `contents.files` from `workspace_root` into `round_dir/files` and
/// writes the structure listing and instructions next to that directory.
///
/// Returns the files actually staged; a file that vanished since it was
/// selected is skipped.
pub(crate) fn stage_round(
    store: &dyn FileStore,
    workspace_root: &Path,
    round_dir: &Path,
    contents: &RoundContents,
) -> Result<Vec<PathBuf>, AppError> {
    let files_dir = round_dir.join(FILES_DIR);
    store.ensure_dir(&files_dir)?;

    let mut staged = Vec::with_capacity(contents.files.len());
    for file in contents.files {
        let source = workspace_root.join(file);
        if !store.exists(&source) {
            continue;
        }
        store.copy(&source, &files_dir.join(file))?;
        staged.push(file.clone());
    }

    if let Some(structure) = contents.structure {
        store.write(&round_dir.join(STRUCTURE_FILE), structure)?;
    }
    store.write(&round_dir.join(INSTRUCTIONS_FILE), contents.instructions)?;

    Ok(staged)
}
