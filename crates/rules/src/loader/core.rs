//! Core [`RuleFileLoader`] struct: reads and decodes one rule file at a time.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::group::RuleGroups;

use super::error::{LoadError, Result};

/// Loads rule files, resolving relative paths against a base directory.
#[derive(Debug, Clone)]
pub struct RuleFileLoader {
    base_dir: PathBuf,
}

impl RuleFileLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory relative paths are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Turn `path` into an absolute path. Relative paths are joined to the base
    /// directory first. Symlinks are left alone.
    pub fn resolve(&self, path: &Path) -> Result<PathBuf> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };
        std::path::absolute(&joined).map_err(|source| LoadError::Io {
            path: joined,
            source,
        })
    }

    /// Read and decode one file.
    ///
    /// Every returned group has `original_file` set to the resolved path.
    /// Rule expressions are not validated here.
    pub fn load_file(&self, path: &Path) -> Result<RuleGroups> {
        let path = self.resolve(path)?;

        let contents = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;

        let mut groups = RuleGroups::from_yaml(&contents).map_err(|source| LoadError::Parse {
            path: path.clone(),
            source,
        })?;

        for group in &mut groups.groups {
            group.original_file = path.clone();
        }

        debug!(path = %path.display(), groups = groups.len(), "decoded rule file");
        Ok(groups)
    }
}
