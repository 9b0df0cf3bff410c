//! Error types for [`RuleManager::update`](super::RuleManager::update).

use std::path::PathBuf;

use crate::engine::EngineError;
use crate::loader::LoadError;
use crate::strategy::PartialResponseStrategy;

use super::core::UpdateSummary;

/// One failure collected during an update.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// A rule file could not be read or decoded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Writing the per-strategy projection of a file failed.
    #[error("write {strategy} projection {}: {source}", .path.display())]
    Projection {
        strategy: PartialResponseStrategy,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Encoding the per-strategy projection of a file failed.
    #[error("encode {strategy} projection {}: {source}", .path.display())]
    Encode {
        strategy: PartialResponseStrategy,
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The engine bound to `strategy` rejected its reload.
    #[error("reload {strategy} engine: {source}")]
    EngineReload {
        strategy: PartialResponseStrategy,
        #[source]
        source: EngineError,
    },
}

/// Every failure from one update, plus what did succeed.
#[derive(Debug, thiserror::Error)]
#[error("{}", render(.errors))]
pub struct UpdateError {
    pub errors: Vec<ManagerError>,
    pub summary: UpdateSummary,
}

impl UpdateError {
    pub fn errors(&self) -> &[ManagerError] {
        &self.errors
    }

    pub fn summary(&self) -> &UpdateSummary {
        &self.summary
    }
}

fn render(errors: &[ManagerError]) -> String {
    match errors {
        [only] => only.to_string(),
        _ => {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            format!("{} errors: {}", errors.len(), joined)
        }
    }
}
