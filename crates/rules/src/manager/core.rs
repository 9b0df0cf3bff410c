//! [`RuleManager`]: load, partition by strategy, reload engines, aggregate.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{info, warn};

use crate::engine::RuleEngine;
use crate::group::RuleGroup;
use crate::loader::{LoadResult, LoadStatus, RuleFileLoader};
use crate::rulefmt::GroupSpec;
use crate::strategy::PartialResponseStrategy;

use super::error::{ManagerError, UpdateError};
use super::projection;

/// Projected path -> original path, per strategy.
type ProjectionIndex = HashMap<PartialResponseStrategy, HashMap<PathBuf, PathBuf>>;

/// Routes rule groups to one engine per partial response strategy.
///
/// `update` is meant to be driven by a single caller. `rule_groups` may run
/// concurrently with it and can then observe one engine already reloaded and
/// another not yet.
pub struct RuleManager {
    loader: RuleFileLoader,
    work_dir: PathBuf,
    engines: BTreeMap<PartialResponseStrategy, Arc<dyn RuleEngine>>,
    projections: RwLock<ProjectionIndex>,
}

/// What one update did, per file and per strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSummary {
    /// One entry per distinct input file, in input order.
    pub files: Vec<LoadResult>,
    /// One entry per bound engine.
    pub strategies: Vec<StrategySummary>,
    /// Groups whose strategy has no bound engine.
    pub unrouted_groups: usize,
}

impl UpdateSummary {
    /// Files that failed to load.
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|r| matches!(r.status, LoadStatus::Failed { .. }))
            .count()
    }
}

/// Outcome for one strategy's engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySummary {
    pub strategy: PartialResponseStrategy,
    /// Files handed to the engine.
    pub files: usize,
    /// Groups contained in those files for this strategy.
    pub groups: usize,
    /// Whether the engine accepted the reload.
    pub reloaded: bool,
}

impl RuleManager {
    /// Create a manager resolving relative paths against `base_dir`.
    ///
    /// Projections go to `<base_dir>/.rule-shards` unless overridden with
    /// [`with_work_dir`](Self::with_work_dir).
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            work_dir: base_dir.join(".rule-shards"),
            loader: RuleFileLoader::new(base_dir),
            engines: BTreeMap::new(),
            projections: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        self.loader.base_dir()
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Bind `engine` to `strategy`, returning the handle it replaces.
    pub fn bind_engine(
        &mut self,
        strategy: PartialResponseStrategy,
        engine: Arc<dyn RuleEngine>,
    ) -> Option<Arc<dyn RuleEngine>> {
        // Groups from the replaced engine must not be mapped through a stale index.
        self.projections
            .write()
            .expect("projection index lock poisoned")
            .remove(&strategy);
        self.engines.insert(strategy, engine)
    }

    /// Strategies that currently have an engine.
    pub fn bound_strategies(&self) -> Vec<PartialResponseStrategy> {
        self.engines.keys().copied().collect()
    }

    /// Load `files`, route their groups by strategy and reload every bound engine.
    ///
    /// Never stops early: every file is attempted and every bound engine is
    /// reloaded exactly once, with an empty file list if nothing routes to it.
    /// All failures are returned together.
    pub fn update<P: AsRef<Path>>(
        &self,
        evaluation_interval: Duration,
        files: &[P],
    ) -> Result<UpdateSummary, UpdateError> {
        let mut errors: Vec<ManagerError> = Vec::new();
        let mut summary = UpdateSummary::default();
        let mut partitions: BTreeMap<PartialResponseStrategy, BTreeMap<PathBuf, Vec<GroupSpec>>> =
            BTreeMap::new();
        let mut seen = HashSet::new();

        for path in files {
            let path = path.as_ref();
            let resolved = match self.loader.resolve(path) {
                Ok(p) => p,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to resolve rule file path");
                    summary.files.push(LoadResult {
                        path: path.to_path_buf(),
                        status: LoadStatus::Failed { error: e.to_string() },
                    });
                    errors.push(e.into());
                    continue;
                }
            };
            if !seen.insert(resolved.clone()) {
                continue;
            }

            match self.loader.load_file(&resolved) {
                Ok(groups) => {
                    info!(path = %resolved.display(), groups = groups.len(), "loaded rule file");
                    summary.files.push(LoadResult {
                        path: resolved.clone(),
                        status: LoadStatus::Loaded { groups: groups.len() },
                    });
                    for group in groups {
                        partitions
                            .entry(group.strategy())
                            .or_default()
                            .entry(group.original_file)
                            .or_default()
                            .push(group.spec);
                    }
                }
                Err(e) => {
                    warn!(path = %resolved.display(), error = %e, "failed to load rule file");
                    summary.files.push(LoadResult {
                        path: resolved,
                        status: LoadStatus::Failed { error: e.to_string() },
                    });
                    errors.push(e.into());
                }
            }
        }

        for (&strategy, engine) in &self.engines {
            let files = partitions.remove(&strategy).unwrap_or_default();
            // Files whose projection fails are reported; the engine still gets the rest.
            let (written, write_errors) = projection::write_all(&self.work_dir, strategy, &files);
            errors.extend(write_errors);

            let groups: usize = written.iter().map(|(_, original)| files[original].len()).sum();
            let handed = written.len();
            let reloaded = match self.reload_engine(strategy, engine.as_ref(), evaluation_interval, written) {
                Ok(()) => true,
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "engine reload failed");
                    errors.push(e);
                    false
                }
            };
            summary.strategies.push(StrategySummary {
                strategy,
                files: handed,
                groups,
                reloaded,
            });
        }

        for (strategy, files) in &partitions {
            let groups: usize = files.values().map(Vec::len).sum();
            warn!(strategy = %strategy, groups, "no engine bound for strategy, skipping groups");
            summary.unrouted_groups += groups;
        }

        if errors.is_empty() {
            Ok(summary)
        } else {
            Err(UpdateError { errors, summary })
        }
    }

    fn reload_engine(
        &self,
        strategy: PartialResponseStrategy,
        engine: &dyn RuleEngine,
        evaluation_interval: Duration,
        written: Vec<(PathBuf, PathBuf)>,
    ) -> Result<(), ManagerError> {
        // Make the new names resolvable before the engine can report them.
        {
            let mut index = self.projections.write().expect("projection index lock poisoned");
            index
                .entry(strategy)
                .or_default()
                .extend(written.iter().cloned());
        }

        let paths: Vec<PathBuf> = written.iter().map(|(p, _)| p.clone()).collect();
        engine
            .reload(evaluation_interval, &paths)
            .map_err(|source| ManagerError::EngineReload { strategy, source })?;

        // The engine now holds exactly `written`; drop everything else.
        self.projections
            .write()
            .expect("projection index lock poisoned")
            .insert(strategy, written.into_iter().collect());
        let count = paths.len();
        projection::prune(&self.work_dir, strategy, &paths.into_iter().collect());

        info!(strategy = %strategy, files = count, "reloaded engine");
        Ok(())
    }

    /// Groups currently held by every bound engine, tagged with their strategy.
    ///
    /// Order is engine by engine, then whatever each engine reports. Sort if
    /// a stable order matters.
    pub fn rule_groups(&self) -> Vec<RuleGroup> {
        let index = self.projections.read().expect("projection index lock poisoned");
        let mut out = Vec::new();

        for (&strategy, engine) in &self.engines {
            let originals = index.get(&strategy);
            for loaded in engine.current_groups() {
                let original_file = originals
                    .and_then(|m| m.get(&loaded.file))
                    .cloned()
                    .unwrap_or(loaded.file);
                out.push(RuleGroup {
                    spec: GroupSpec {
                        name: loaded.name,
                        interval: loaded.interval_override,
                        rules: loaded.rules,
                    },
                    original_file,
                    partial_response_strategy: Some(strategy),
                });
            }
        }
        out
    }
}
