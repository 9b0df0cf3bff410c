//! Error types and load result structures for the rule file loader.

use std::path::{Path, PathBuf};

use crate::group::DecodeError;

/// Why a single rule file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read (missing, permissions, ...).
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content did not decode into rule groups.
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

impl LoadError {
    /// File the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            LoadError::Io { path, .. } | LoadError::Parse { path, .. } => path,
        }
    }
}

/// Result alias for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Outcome of loading a single rule file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadResult {
    /// Resolved path of the file.
    pub path: PathBuf,
    /// Status of the load attempt.
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    /// File decoded; `groups` is the number of rule groups it held.
    Loaded { groups: usize },
    /// Read or decode error occurred.
    Failed { error: String },
}
