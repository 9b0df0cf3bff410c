//! Per-strategy projections of rule files.
//!
//! Engines reload whole files and only know the upstream schema, so for every
//! strategy each relevant file is rewritten into the work directory with just
//! that strategy's groups and without the extension field. The projected file
//! name is derived from the original path, so the mapping back never changes
//! between updates.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::rulefmt::{GroupSpec, RuleFile};
use crate::strategy::PartialResponseStrategy;

use super::error::ManagerError;

/// Directory holding the projections for one strategy.
pub(super) fn strategy_dir(work_dir: &Path, strategy: PartialResponseStrategy) -> PathBuf {
    work_dir.join(strategy.as_str().to_ascii_lowercase())
}

/// Stable projection path for `original` under `strategy`.
pub(super) fn projection_path(work_dir: &Path, strategy: PartialResponseStrategy, original: &Path) -> PathBuf {
    let digest = Sha256::digest(original.as_os_str().as_encoded_bytes());
    let prefix: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
    let file_name = original
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "rules.yaml".to_string());
    strategy_dir(work_dir, strategy).join(format!("{}-{}", prefix, file_name))
}

/// Write one projection per original file.
///
/// Returns the `(projected, original)` pairs that were written, in the order
/// of `files` (sorted by original path), plus one error per file that could
/// not be encoded or written. A failed file never stops the others.
pub(super) fn write_all(
    work_dir: &Path,
    strategy: PartialResponseStrategy,
    files: &BTreeMap<PathBuf, Vec<GroupSpec>>,
) -> (Vec<(PathBuf, PathBuf)>, Vec<ManagerError>) {
    let dir = strategy_dir(work_dir, strategy);
    if let Err(source) = fs::create_dir_all(&dir) {
        return (
            Vec::new(),
            vec![ManagerError::Projection {
                strategy,
                path: dir,
                source,
            }],
        );
    }

    let mut written = Vec::with_capacity(files.len());
    let mut errors = Vec::new();
    for (original, groups) in files {
        let path = projection_path(work_dir, strategy, original);
        match write_one(strategy, &path, groups) {
            Ok(()) => {
                debug!(
                    strategy = %strategy,
                    original = %original.display(),
                    projection = %path.display(),
                    groups = groups.len(),
                    "wrote projection"
                );
                written.push((path, original.clone()));
            }
            Err(e) => {
                warn!(strategy = %strategy, original = %original.display(), error = %e, "failed to write projection");
                errors.push(e);
            }
        }
    }
    (written, errors)
}

fn write_one(strategy: PartialResponseStrategy, path: &Path, groups: &[GroupSpec]) -> Result<(), ManagerError> {
    let yaml = serde_yaml::to_string(&RuleFile {
        groups: groups.to_vec(),
    })
    .map_err(|source| ManagerError::Encode {
        strategy,
        path: path.to_path_buf(),
        source,
    })?;

    write_atomic(path, &yaml).map_err(|source| ManagerError::Projection {
        strategy,
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a dot-prefixed temp file first, then rename over the target.
fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)
}

/// Remove projections for `strategy` that are no longer referenced.
pub(super) fn prune(work_dir: &Path, strategy: PartialResponseStrategy, keep: &HashSet<PathBuf>) {
    let dir = strategy_dir(work_dir, strategy);
    let entries = match fs::read_dir(&dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to read projection directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || keep.contains(&path) {
            continue;
        }
        match fs::remove_file(&path) {
            Ok(()) => debug!(strategy = %strategy, path = %path.display(), "removed stale projection"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove stale projection"),
        }
    }
}
