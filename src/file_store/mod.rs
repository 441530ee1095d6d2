//! The file read/write collaborator used by the round coordinator.

mod protection;

#[cfg(test)]
pub(crate) mod memory_store;
#[cfg(test)]
mod disk_store_test;
#[cfg(test)]
mod protection_test;

pub(crate) use protection::PathProtection;

use crate::app_error::AppError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub(crate) trait FileStore {
    /// Whether a regular file exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Reads a UTF-8 file; `Ok(None)` when it does not exist.
    fn read(&self, path: &Path) -> Result<Option<String>, AppError>;

    fn write(&self, path: &Path, content: &str) -> Result<(), AppError>;

    fn copy(&self, src: &Path, dst: &Path) -> Result<(), AppError>;

    fn ensure_dir(&self, path: &Path) -> Result<(), AppError>;
}

pub(crate) struct DiskStore;

impl FileStore for DiskStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Option<String>, AppError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), AppError> {
        create_parent_dir(path)?;
        fs::write(path, content).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            message: format!("Failed to write file: {e}"),
        })
    }

    fn copy(&self, src: &Path, dst: &Path) -> Result<(), AppError> {
        create_parent_dir(dst)?;
        fs::copy(src, dst).map_err(|e| AppError::FileWrite {
            path: dst.to_path_buf(),
            message: format!("Failed to copy from {}: {e}", src.display()),
        })?;
        Ok(())
    }

    fn ensure_dir(&self, path: &Path) -> Result<(), AppError> {
        fs::create_dir_all(path).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            message: format!("Failed to create directory: {e}"),
        })
    }
}

fn create_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent).map_err(|e| AppError::FileWrite {
                path: path.to_path_buf(),
                message: format!("Failed to create parent directory: {e}"),
            })
        }
        _ => Ok(()),
    }
}
