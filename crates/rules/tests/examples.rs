//! Integration tests that load every sample rule file in
//! `data/rules/examples/` through the manager with in-process engines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ruleshard_rules::discovery::discover;
use ruleshard_rules::loader::RuleFileLoader;
use ruleshard_rules::{LocalEngine, PartialResponseStrategy, RuleEngine, RuleManager};

/// Resolve the examples directory relative to the workspace root.
/// Integration tests run from the crate directory, so we go up two levels.
fn examples_dir() -> PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest.join("../../data/rules/examples")
}

fn manager(work: &tempfile::TempDir) -> (RuleManager, Arc<LocalEngine>, Arc<LocalEngine>) {
    let abort = Arc::new(LocalEngine::new("abort"));
    let warn = Arc::new(LocalEngine::new("warn"));
    let mut m = RuleManager::new(examples_dir()).with_work_dir(work.path());
    m.bind_engine(PartialResponseStrategy::Abort, abort.clone());
    m.bind_engine(PartialResponseStrategy::Warn, warn.clone());
    (m, abort, warn)
}

#[test]
fn discovery_finds_all_examples() {
    let files = discover(&[examples_dir()]);
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec!["node-alerts.yaml", "aggregations.yml", "store-availability.yaml"]
    );
}

#[test]
fn every_example_loads_and_routes() {
    let work = tempfile::TempDir::new().unwrap();
    let (m, abort, warn) = manager(&work);

    let summary = m
        .update(Duration::from_secs(60), &discover(&[examples_dir()]))
        .unwrap_or_else(|e| panic!("examples failed to load: {e}"));
    assert_eq!(summary.failed_files(), 0);
    assert_eq!(summary.unrouted_groups, 0);

    let mut groups: Vec<_> = m
        .rule_groups()
        .into_iter()
        .map(|g| (g.name().to_string(), g.strategy()))
        .collect();
    groups.sort();
    assert_eq!(
        groups,
        vec![
            ("job-aggregations".to_string(), PartialResponseStrategy::Warn),
            ("node-alerts".to_string(), PartialResponseStrategy::Abort),
            ("store-availability-best-effort".to_string(), PartialResponseStrategy::Warn),
            ("store-availability-strict".to_string(), PartialResponseStrategy::Abort),
        ]
    );

    assert_eq!(abort.current_groups().len(), 2);
    let best_effort = warn
        .current_groups()
        .into_iter()
        .find(|g| g.name == "store-availability-best-effort")
        .unwrap();
    assert_eq!(best_effort.interval, Duration::from_secs(30));
}

#[test]
fn original_files_point_at_examples() {
    let work = tempfile::TempDir::new().unwrap();
    let (m, _, _) = manager(&work);
    m.update(Duration::from_secs(60), &["store-availability.yaml"])
        .unwrap();

    let loader = RuleFileLoader::new(examples_dir());
    let expected = loader.resolve("store-availability.yaml".as_ref()).unwrap();
    let groups = m.rule_groups();
    assert_eq!(groups.len(), 2);
    assert!(groups.iter().all(|g| g.original_file() == expected));
}

#[test]
fn examples_round_trip_through_encode() {
    let loader = RuleFileLoader::new(examples_dir());
    let groups = loader.load_file("store-availability.yaml".as_ref()).unwrap();
    let yaml = groups.to_yaml().unwrap();
    assert!(yaml.contains("partial_response_strategy: ABORT"), "{yaml}");
    assert!(yaml.contains("partial_response_strategy: WARN"), "{yaml}");

    let plain = loader.load_file("node-alerts.yaml".as_ref()).unwrap();
    assert!(!plain.to_yaml().unwrap().contains("partial_response_strategy"));
}
