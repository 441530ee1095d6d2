use super::FileStore;
use crate::app_error::AppError;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory [`FileStore`] for tests. Paths listed in `failing_writes` refuse
/// to be written.
#[derive(Default)]
pub(crate) struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, String>>,
    dirs: Mutex<BTreeSet<PathBuf>>,
    failing_writes: Mutex<HashSet<PathBuf>>,
}

impl MemoryStore {
    pub(crate) fn with_files(files: &[(&str, &str)]) -> Self {
        let store = Self::default();
        for (path, content) in files {
            store.insert(path, content);
        }
        store
    }

    pub(crate) fn insert(&self, path: impl AsRef<Path>, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content.to_string());
    }

    pub(crate) fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub(crate) fn fail_writes_to(&self, path: impl AsRef<Path>) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf());
    }

    pub(crate) fn has_dir(&self, path: impl AsRef<Path>) -> bool {
        self.dirs.lock().unwrap().contains(path.as_ref())
    }

    pub(crate) fn paths_under(&self, dir: impl AsRef<Path>) -> Vec<PathBuf> {
        self.files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|p| p.strip_prefix(dir.as_ref()).ok())
            .map(Path::to_path_buf)
            .collect()
    }
}

impl FileStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Option<String>, AppError> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), AppError> {
        if self.failing_writes.lock().unwrap().contains(path) {
            return Err(AppError::FileWrite {
                path: path.to_path_buf(),
                message: "simulated failure".to_string(),
            });
        }
        self.insert(path, content);
        Ok(())
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<(), AppError> {
        let content = self.get(src).ok_or_else(|| AppError::FileWrite {
            path: dst.to_path_buf(),
            message: format!("Source {} does not exist", src.display()),
        })?;
        self.write(dst, &content)
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), AppError> {
        self.dirs.lock().unwrap().insert(path.to_path_buf());
        Ok(())
    }
}
