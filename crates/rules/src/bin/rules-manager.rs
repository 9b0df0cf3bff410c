//! rules-manager — loads rule files and keeps one engine per partial response strategy in sync.
//!
//! Reloads on a fixed interval and, when watching is enabled, shortly after
//! any rule file changes. With `--once` it performs a single update, prints
//! the loaded groups as JSON, and exits non-zero if anything failed.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use ruleshard_core::config::{load_dotenv, Config};
use ruleshard_core::{format_duration, parse_duration};
use ruleshard_rules::discovery::discover;
use ruleshard_rules::{LocalEngine, PartialResponseStrategy, RuleGroup, RuleManager, UpdateError};

// ── CLI ─────────────────────────────────────────────────────────────

/// Route rule groups to per-strategy engines.
#[derive(Parser, Debug)]
#[command(name = "rules-manager", version, about)]
struct Cli {
    /// Rule files or directories. Defaults to RULES_FILES.
    paths: Vec<PathBuf>,

    /// Directory relative rule paths are resolved against.
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Directory for per-strategy projection files.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Default evaluation interval handed to the engines (e.g. 30s, 1m).
    #[arg(long, value_parser = duration_arg)]
    eval_interval: Option<Duration>,

    /// Periodic reload interval.
    #[arg(long, value_parser = duration_arg)]
    reload_interval: Option<Duration>,

    /// Reload on filesystem changes (`--watch=false` to disable).
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    watch: Option<bool>,

    /// Run a single update, print the result as JSON and exit.
    #[arg(long)]
    once: bool,
}

/// Intervals are periods, so zero is rejected along with unparseable input.
fn duration_arg(s: &str) -> Result<Duration, String> {
    match parse_duration(s) {
        Some(d) if d.is_zero() => Err(format!("duration '{}' must be greater than zero", s)),
        Some(d) => Ok(d),
        None => Err(format!("invalid duration '{}'", s)),
    }
}

impl Cli {
    /// Apply command-line overrides on top of the environment config.
    fn apply(self, config: &mut Config) -> bool {
        let rules = &mut config.rules;
        if !self.paths.is_empty() {
            rules.files = self.paths;
        }
        if let Some(dir) = self.base_dir {
            rules.base_dir = dir;
        }
        if let Some(dir) = self.work_dir {
            rules.work_dir = Some(dir);
        }
        if let Some(d) = self.eval_interval {
            rules.evaluation_interval = d;
        }
        if let Some(d) = self.reload_interval {
            rules.reload_interval = d;
        }
        if let Some(watch) = self.watch {
            rules.watch = watch;
        }
        self.once
    }
}

// ── Reloader ────────────────────────────────────────────────────────

/// Owns the manager and the inputs it is fed from.
struct Reloader {
    manager: RuleManager,
    inputs: Vec<PathBuf>,
    evaluation_interval: Duration,
}

impl Reloader {
    fn new(config: &Config) -> Self {
        let rules = &config.rules;
        let mut manager = RuleManager::new(rules.base_dir.clone()).with_work_dir(rules.work_dir());
        for strategy in PartialResponseStrategy::ALL {
            let engine = LocalEngine::new(strategy.as_str().to_ascii_lowercase());
            manager.bind_engine(strategy, Arc::new(engine));
        }

        // Absolute, so discovery and watcher events line up with the loader's paths.
        let inputs = rules
            .files
            .iter()
            .map(|p| {
                let joined = if p.is_absolute() { p.clone() } else { rules.base_dir.join(p) };
                std::path::absolute(&joined).unwrap_or(joined)
            })
            .collect();

        Self {
            manager,
            inputs,
            evaluation_interval: rules.evaluation_interval,
        }
    }

    /// Discover files and run one update, logging the outcome.
    fn reload(&self) -> Result<(), UpdateError> {
        let files = discover(&self.inputs);
        debug!(files = files.len(), "discovered rule files");

        let result = self.manager.update(self.evaluation_interval, &files);
        match &result {
            Ok(summary) => info!(
                files = summary.files.len(),
                unrouted = summary.unrouted_groups,
                "rule update complete"
            ),
            Err(e) => {
                for err in e.errors() {
                    warn!(error = %err, "rule update error");
                }
                error!(
                    failures = e.errors().len(),
                    failed_files = e.summary().failed_files(),
                    "rule update finished with errors, serving last good state where affected"
                );
            }
        }

        for group in self.sorted_groups() {
            info!(
                group = %group.name(),
                file = %group.original_file().display(),
                strategy = %group.strategy(),
                rules = group.rules().len(),
                "active rule group"
            );
        }
        result.map(|_| ())
    }

    fn sorted_groups(&self) -> Vec<RuleGroup> {
        let mut groups = self.manager.rule_groups();
        groups.sort_by(|a, b| {
            a.original_file()
                .cmp(b.original_file())
                .then_with(|| a.name().cmp(b.name()))
        });
        groups
    }

    fn groups_json(&self) -> serde_json::Value {
        let groups: Vec<_> = self
            .sorted_groups()
            .iter()
            .map(|g| {
                serde_json::json!({
                    "name": g.name(),
                    "file": g.original_file(),
                    "partial_response_strategy": g.strategy().as_str(),
                    "rules": g.rules().len(),
                })
            })
            .collect();
        serde_json::Value::Array(groups)
    }
}

/// Run blocking work off the async runtime. A panic in `work` becomes an error.
async fn run_blocking<T, F>(work: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!(error = %e, "rule update task panicked");
        anyhow::Error::new(e).context("rule update task failed")
    })
}

/// The outer error is a crashed update task; the inner one is a completed
/// update that reported failures.
async fn reload_in_background(reloader: &Arc<Reloader>) -> anyhow::Result<Result<(), UpdateError>> {
    let r = Arc::clone(reloader);
    run_blocking(move || r.reload()).await
}

// ── Watcher ─────────────────────────────────────────────────────────

/// Rule file events worth a reload: YAML, not a dotfile, not one of our projections.
fn is_rule_change(path: &Path, work_dir: &Path) -> bool {
    let dotfile = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    let yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    yaml && !dotfile && !path.starts_with(work_dir)
}

fn start_watcher(inputs: &[PathBuf], work_dir: PathBuf, tx: mpsc::UnboundedSender<()>) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
        Ok(event) => {
            let relevant = event.paths.iter().any(|p| is_rule_change(p, &work_dir));
            if relevant {
                let _ = tx.send(());
            }
        }
        Err(e) => warn!(error = %e, "filesystem watcher error"),
    })?;

    for input in inputs {
        // Editors often replace files, so plain files are watched through their directory.
        let (target, mode) = if input.is_dir() {
            (input.as_path(), RecursiveMode::Recursive)
        } else {
            match input.parent() {
                Some(parent) if parent.is_dir() => (parent, RecursiveMode::NonRecursive),
                _ => {
                    warn!(path = %input.display(), "cannot watch rule path");
                    continue;
                }
            }
        };
        watcher.watch(target, mode)?;
        info!(path = %target.display(), "watching for rule changes");
    }
    Ok(watcher)
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let mut config = Config::from_env();
    let once = Cli::parse().apply(&mut config);
    config.log_summary();

    let reloader = Arc::new(Reloader::new(&config));

    if once {
        let result = reload_in_background(&reloader).await?;
        let out = serde_json::json!({
            "config": config.redacted_summary(),
            "groups": reloader.groups_json(),
            "errors": result.as_ref().err().map(|e| e.errors().iter().map(ToString::to_string).collect::<Vec<_>>()),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        result?;
        return Ok(());
    }

    let _ = reload_in_background(&reloader).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _watcher = if config.rules.watch {
        let work_dir = config.rules.work_dir();
        let work_dir = std::path::absolute(&work_dir).unwrap_or(work_dir);
        match start_watcher(&reloader.inputs, work_dir, tx) {
            Ok(w) => Some(w),
            Err(e) => {
                warn!(error = %e, "failed to start watcher, relying on periodic reloads");
                None
            }
        }
    } else {
        None
    };

    let mut ticker = tokio::time::interval(config.rules.reload_interval);
    ticker.tick().await;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
        reload_interval = %format_duration(config.rules.reload_interval),
        "rules-manager running"
    );
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = reload_in_background(&reloader).await;
            }
            Some(()) = rx.recv() => {
                // Let bursts of events settle before reloading.
                tokio::time::sleep(Duration::from_millis(500)).await;
                while rx.try_recv().is_ok() {}
                info!("rule files changed, reloading");
                let _ = reload_in_background(&reloader).await;
                ticker.reset();
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("rules-manager exited cleanly");
    Ok(())
}
