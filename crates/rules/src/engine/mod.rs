//! Rule evaluation engine collaborator.
//!
//! The Manager only needs two things from an engine: replace its rule set from
//! a list of files, and report what it currently holds. [`LocalEngine`] is an
//! in-process implementation that parses and validates the upstream schema
//! but does not evaluate anything.

mod local;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::rulefmt::{FormatError, Rule};

pub use self::local::LocalEngine;

/// A rule group as held by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedGroup {
    pub name: String,
    /// File the engine loaded the group from.
    pub file: PathBuf,
    /// Effective evaluation interval (group override or engine default).
    pub interval: Duration,
    /// Group `interval` as written in the file, if any.
    pub interval_override: Option<String>,
    pub rules: Vec<Rule>,
}

impl LoadedGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &Path {
        &self.file
    }
}

/// Engine capability consumed by the Manager.
///
/// `reload` must be atomic from the caller's point of view: on error the engine
/// keeps whatever it held before the call.
pub trait RuleEngine: Send + Sync {
    /// Replace the loaded rule set with the groups found in `files`.
    fn reload(&self, evaluation_interval: Duration, files: &[PathBuf]) -> Result<(), EngineError>;

    /// Groups currently loaded.
    fn current_groups(&self) -> Vec<LoadedGroup>;
}

/// Errors reported by an engine reload.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{}: {source}", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A group or rule failed structural validation.
    #[error("{}: {source}", .file.display())]
    Invalid {
        file: PathBuf,
        #[source]
        source: FormatError,
    },

    /// Engine-specific rejection.
    #[error("{0}")]
    Rejected(String),
}
