//! Tests for the rule file loader.

use std::fs;
use std::io::ErrorKind;

use tempfile::TempDir;

use super::*;
use crate::group::DecodeError;
use crate::strategy::PartialResponseStrategy;

const MIXED_YAML: &str = r#"
groups:
- name: "something5"
  partial_response_strategy: "warn"
  rules:
  - alert: "some"
    expr: "up"
- name: "something7"
  rules:
  - record: "job:up:sum"
    expr: "sum(up) by (job)"
"#;

fn temp_loader() -> (TempDir, RuleFileLoader) {
    let dir = TempDir::new().expect("create tempdir");
    let loader = RuleFileLoader::new(dir.path());
    (dir, loader)
}

#[test]
fn load_sets_original_file_on_every_group() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("combined.yaml");
    fs::write(&path, MIXED_YAML).unwrap();

    let groups = loader.load_file(&path).unwrap();
    assert_eq!(groups.len(), 2);
    for g in groups.iter() {
        assert_eq!(g.original_file(), path.as_path());
    }
    assert_eq!(groups.groups[0].strategy(), PartialResponseStrategy::Warn);
    assert_eq!(groups.groups[1].partial_response_strategy, None);
}

#[test]
fn relative_paths_resolve_against_base_dir() {
    let (dir, loader) = temp_loader();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/rules.yml"), MIXED_YAML).unwrap();

    let groups = loader.load_file("nested/rules.yml".as_ref()).unwrap();
    let expected = dir.path().join("nested/rules.yml");
    assert!(groups.iter().all(|g| g.original_file() == expected));
    assert!(groups.groups[0].original_file().is_absolute());
}

#[test]
fn missing_file_is_io_error_naming_the_file() {
    let (dir, loader) = temp_loader();
    let err = loader
        .load_file(&dir.path().join("non_existing.yaml"))
        .unwrap_err();

    match &err {
        LoadError::Io { source, .. } => assert_eq!(source.kind(), ErrorKind::NotFound),
        other => panic!("expected io error, got {other}"),
    }
    assert!(err.to_string().contains("non_existing.yaml: "), "{err}");
    assert_eq!(err.path(), dir.path().join("non_existing.yaml"));
}

#[test]
fn invalid_strategy_is_parse_error_prefixed_by_path() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("wrong.yaml");
    fs::write(
        &path,
        r#"
groups:
- name: "something4"
  partial_response_strategy: "afafsdgsdgs" # Err 1
  rules:
  - alert: "some"
    expr: "up"
"#,
    )
    .unwrap();

    let err = loader.load_file(&path).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse {
            source: DecodeError::Strategy { .. },
            ..
        }
    ));
    assert!(
        err.to_string()
            .contains("wrong.yaml: failed to unmarshal 'partial_response_strategy'"),
        "{err}"
    );
}

#[test]
fn malformed_yaml_is_parse_error() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "groups: [\n  - name: a\n").unwrap();

    let err = loader.load_file(&path).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Parse {
            source: DecodeError::Document(_),
            ..
        }
    ));
}

#[test]
fn rule_expressions_are_not_validated() {
    let (dir, loader) = temp_loader();
    let path = dir.path().join("lenient.yaml");
    fs::write(&path, "groups:\n- name: a\n  rules:\n  - alert: x\n    expr: \"\"\n").unwrap();

    let groups = loader.load_file(&path).unwrap();
    assert_eq!(groups.groups[0].rules()[0].expr, "");
}
