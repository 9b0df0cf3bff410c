//! [`LocalEngine`]: in-process engine holding parsed upstream rule groups.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;

use ruleshard_core::{format_duration, parse_duration};
use tracing::{debug, info};

use crate::rulefmt::RuleFile;

use super::{EngineError, LoadedGroup, RuleEngine};

#[derive(Debug, Default)]
struct EngineState {
    evaluation_interval: Duration,
    groups: Vec<LoadedGroup>,
    reloads: u64,
}

/// Engine that parses and validates upstream rule files and keeps the result in memory.
///
/// A reload builds the complete new group set first and swaps it in under the
/// write lock, so readers see either the old or the new set, never a mix.
#[derive(Debug)]
pub struct LocalEngine {
    name: String,
    state: RwLock<EngineState>,
}

impl LocalEngine {
    /// Create an empty engine. `name` only appears in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(EngineState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default interval passed to the most recent successful reload.
    pub fn evaluation_interval(&self) -> Duration {
        self.state
            .read()
            .expect("engine state lock poisoned")
            .evaluation_interval
    }

    /// Number of successful reloads so far.
    pub fn reload_count(&self) -> u64 {
        self.state.read().expect("engine state lock poisoned").reloads
    }

    fn parse_file(file: &Path, default_interval: Duration) -> Result<Vec<LoadedGroup>, EngineError> {
        let contents = fs::read_to_string(file).map_err(|source| EngineError::Io {
            file: file.to_path_buf(),
            source,
        })?;

        let parsed: RuleFile = if contents.trim().is_empty() {
            RuleFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| EngineError::Parse {
                file: file.to_path_buf(),
                source,
            })?
        };

        parsed.validate().map_err(|source| EngineError::Invalid {
            file: file.to_path_buf(),
            source,
        })?;

        Ok(parsed
            .groups
            .into_iter()
            .map(|spec| LoadedGroup {
                interval: spec
                    .interval
                    .as_deref()
                    .and_then(parse_duration)
                    .unwrap_or(default_interval),
                interval_override: spec.interval,
                name: spec.name,
                file: file.to_path_buf(),
                rules: spec.rules,
            })
            .collect())
    }
}

impl RuleEngine for LocalEngine {
    fn reload(&self, evaluation_interval: Duration, files: &[PathBuf]) -> Result<(), EngineError> {
        let mut groups = Vec::new();
        for file in files {
            let loaded = Self::parse_file(file, evaluation_interval)?;
            debug!(engine = %self.name, file = %file.display(), groups = loaded.len(), "parsed rule file");
            groups.extend(loaded);
        }

        let mut state = self.state.write().expect("engine state lock poisoned");
        let group_count = groups.len();
        state.groups = groups;
        state.evaluation_interval = evaluation_interval;
        state.reloads += 1;

        info!(
            engine = %self.name,
            files = files.len(),
            groups = group_count,
            interval = %format_duration(evaluation_interval),
            "engine reloaded"
        );
        Ok(())
    }

    fn current_groups(&self) -> Vec<LoadedGroup> {
        self.state
            .read()
            .expect("engine state lock poisoned")
            .groups
            .clone()
    }
}
