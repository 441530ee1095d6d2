use crate::app_error::AppError;
use crate::config::AGENT_CONFIG_DIR;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf};

/// Directories a model response may never read from or write into.
const PROTECTED_DIRS: [&str; 2] = [".git", AGENT_CONFIG_DIR];

/// Validates project-relative paths coming from a model response.
pub(crate) struct PathProtection {
    gitignore_matcher: Gitignore,
}

impl PathProtection {
    pub(crate) fn new_for_base_dir(base_dir: &Path) -> Result<Self, AppError> {
        let mut builder = GitignoreBuilder::new(base_dir);
        let gitignore = base_dir.join(".gitignore");
        if gitignore.is_file() {
            if let Some(e) = builder.add(&gitignore) {
                return Err(AppError::Config(format!(
                    "Failed to read .gitignore: {e}"
                )));
            }
        }
        let gitignore_matcher = builder
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build .gitignore matcher: {e}")))?;

        Ok(Self { gitignore_matcher })
    }

    /// Returns the cleaned relative path, or the reason it is refused.
    pub(crate) fn validate(&self, path: &Path) -> Result<PathBuf, AppError> {
        let cleaned = path.clean();
        self.validate_paths(path, &cleaned)?;
        Ok(cleaned)
    }

    // The original path is checked for traversal/absolute attempts; the
    // cleaned one for policy.
    fn validate_paths(&self, original: &Path, cleaned: &Path) -> Result<(), AppError> {
        let reject = |reason: &str| AppError::UnsafePath {
            path: original.to_path_buf(),
            reason: reason.to_string(),
        };

        if original.as_os_str().is_empty() || cleaned == Path::new(".") {
            return Err(reject("Empty path."));
        }

        for component in original.components() {
            match component {
                Component::RootDir | Component::Prefix(_) => {
                    return Err(reject("Absolute paths are not allowed."));
                }
                Component::ParentDir => {
                    return Err(reject("Path traversal ('..') is not allowed."));
                }
                _ => {}
            }
        }

        if let Some(Component::Normal(first)) = cleaned.components().next() {
            if let Some(name) = first.to_str() {
                if PROTECTED_DIRS.contains(&name) {
                    return Err(reject(&format!(
                        "Access to directory '{name}/' is not allowed."
                    )));
                }
            }
        }

        if let ignore::Match::Ignore(_) = self
            .gitignore_matcher
            .matched_path_or_any_parents(cleaned, false)
        {
            return Err(reject("Path matches a rule in .gitignore."));
        }

        Ok(())
    }
}
