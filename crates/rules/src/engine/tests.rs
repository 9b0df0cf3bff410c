//! Tests for the in-process engine.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use super::*;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn reload_loads_groups_in_file_order() {
    let dir = TempDir::new().unwrap();
    let a = write(
        &dir,
        "a.yaml",
        "groups:\n- name: a1\n  rules:\n  - alert: x\n    expr: up\n- name: a2\n  interval: 30s\n  rules: []\n",
    );
    let b = write(&dir, "b.yaml", "groups:\n- name: b1\n  rules: []\n");

    let engine = LocalEngine::new("test");
    engine.reload(Duration::from_secs(10), &[a.clone(), b.clone()]).unwrap();

    let groups = engine.current_groups();
    let names: Vec<_> = groups.iter().map(|g| g.name()).collect();
    assert_eq!(names, vec!["a1", "a2", "b1"]);
    assert_eq!(groups[0].file(), a.as_path());
    assert_eq!(groups[2].file(), b.as_path());
    assert_eq!(groups[0].interval, Duration::from_secs(10));
    assert_eq!(groups[1].interval, Duration::from_secs(30));
    assert_eq!(groups[1].interval_override.as_deref(), Some("30s"));
    assert_eq!(engine.evaluation_interval(), Duration::from_secs(10));
    assert_eq!(engine.reload_count(), 1);
}

#[test]
fn empty_reload_clears_groups() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.yaml", "groups:\n- name: a1\n  rules: []\n");

    let engine = LocalEngine::new("test");
    engine.reload(Duration::from_secs(10), &[a]).unwrap();
    assert_eq!(engine.current_groups().len(), 1);

    engine.reload(Duration::from_secs(10), &[]).unwrap();
    assert!(engine.current_groups().is_empty());
    assert_eq!(engine.reload_count(), 2);
}

#[test]
fn failed_reload_keeps_previous_groups() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.yaml", "groups:\n- name: keep\n  rules: []\n");
    let bad = write(
        &dir,
        "bad.yaml",
        "groups:\n- name: broken\n  rules:\n  - alert: x\n    expr: \"\"\n",
    );

    let engine = LocalEngine::new("test");
    engine.reload(Duration::from_secs(10), &[good.clone()]).unwrap();

    let err = engine
        .reload(Duration::from_secs(20), &[good, bad])
        .unwrap_err();
    assert!(matches!(err, EngineError::Invalid { .. }));
    assert!(err.to_string().contains("bad.yaml: group \"broken\""), "{err}");

    let names: Vec<_> = engine.current_groups().into_iter().map(|g| g.name).collect();
    assert_eq!(names, vec!["keep"]);
    assert_eq!(engine.evaluation_interval(), Duration::from_secs(10));
    assert_eq!(engine.reload_count(), 1);
}

#[test]
fn extension_field_is_rejected_by_upstream_schema() {
    let dir = TempDir::new().unwrap();
    let f = write(
        &dir,
        "ext.yaml",
        "groups:\n- name: a\n  partial_response_strategy: WARN\n  rules: []\n",
    );
    let err = LocalEngine::new("test")
        .reload(Duration::from_secs(1), &[f])
        .unwrap_err();
    assert!(matches!(err, EngineError::Parse { .. }));
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = LocalEngine::new("test")
        .reload(Duration::from_secs(1), &[dir.path().join("gone.yaml")])
        .unwrap_err();
    assert!(matches!(err, EngineError::Io { .. }));
}
