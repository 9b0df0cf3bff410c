//! Upstream rule-file schema as understood by the evaluation engine.
//!
//! These types know nothing about partial response strategies. The
//! [`crate::group`] module layers the extension field on top of [`GroupSpec`].

use std::collections::HashSet;

use indexmap::IndexMap;
use ruleshard_core::parse_duration;
use serde::{Deserialize, Serialize};

/// A rule file in the upstream schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleFile {
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

impl RuleFile {
    /// Validate every group and reject duplicate group names within the file.
    pub fn validate(&self) -> Result<(), FormatError> {
        let mut seen = HashSet::new();
        for group in &self.groups {
            group.validate()?;
            if !seen.insert(group.name.as_str()) {
                return Err(FormatError::new(&group.name, "duplicate group name in file"));
            }
        }
        Ok(())
    }
}

/// One rule group in the upstream schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub name: String,
    /// Per-group evaluation interval override (e.g. `30s`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl GroupSpec {
    /// Structural checks on the group and its rules. Expressions are not parsed.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.name.trim().is_empty() {
            return Err(FormatError::new(&self.name, "group name must not be empty"));
        }
        if let Some(interval) = &self.interval {
            if parse_duration(interval).is_none() {
                return Err(FormatError::new(
                    &self.name,
                    format!("invalid interval {:?}", interval),
                ));
            }
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|reason| FormatError::new(&self.name, format!("rule {}: {}", idx, reason)))?;
        }
        Ok(())
    }
}

/// A recording or alerting rule. Passed through to the engine verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    #[serde(default)]
    pub expr: String,
    #[serde(default, rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub labels: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub annotations: IndexMap<String, String>,
}

impl Rule {
    /// Shorthand for an alerting rule with no labels.
    pub fn alert(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            alert: Some(name.into()),
            expr: expr.into(),
            ..Default::default()
        }
    }

    /// Shorthand for a recording rule.
    pub fn record(name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            record: Some(name.into()),
            expr: expr.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), String> {
        match (&self.record, &self.alert) {
            (Some(_), Some(_)) => return Err("only one of 'record' and 'alert' may be set".into()),
            (None, None) => return Err("one of 'record' or 'alert' must be set".into()),
            (Some(record), None) => {
                if record.trim().is_empty() {
                    return Err("'record' must not be empty".into());
                }
                if self.for_duration.is_some() {
                    return Err("'for' is only valid for alerting rules".into());
                }
            }
            (None, Some(alert)) => {
                if alert.trim().is_empty() {
                    return Err("'alert' must not be empty".into());
                }
            }
        }
        if self.expr.trim().is_empty() {
            return Err("field 'expr' must be set".into());
        }
        if let Some(d) = &self.for_duration {
            if parse_duration(d).is_none() {
                return Err(format!("invalid 'for' duration {:?}", d));
            }
        }
        Ok(())
    }
}

/// Structural problem in an upstream rule group.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("group {group:?}: {reason}")]
pub struct FormatError {
    pub group: String,
    pub reason: String,
}

impl FormatError {
    fn new(group: &str, reason: impl Into<String>) -> Self {
        Self {
            group: group.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, rules: Vec<Rule>) -> GroupSpec {
        GroupSpec {
            name: name.to_string(),
            interval: None,
            rules,
        }
    }

    #[test]
    fn valid_file_passes() {
        let file = RuleFile {
            groups: vec![
                group("a", vec![Rule::alert("HighLoad", "load > 1")]),
                group("b", vec![Rule::record("job:up:sum", "sum(up) by (job)")]),
            ],
        };
        assert!(file.validate().is_ok());
    }

    #[test]
    fn duplicate_group_names_rejected() {
        let file = RuleFile {
            groups: vec![group("a", vec![]), group("a", vec![])],
        };
        let err = file.validate().unwrap_err();
        assert_eq!(err.group, "a");
        assert!(err.reason.contains("duplicate"));
    }

    #[test]
    fn rule_needs_exactly_one_kind() {
        let mut both = Rule::alert("x", "up");
        both.record = Some("y".into());
        assert!(group("g", vec![both]).validate().is_err());
        let neither = Rule {
            expr: "up".into(),
            ..Default::default()
        };
        let err = group("g", vec![neither]).validate().unwrap_err();
        assert!(err.reason.starts_with("rule 0:"), "{}", err.reason);
    }

    #[test]
    fn empty_expr_and_bad_durations_rejected() {
        assert!(group("g", vec![Rule::alert("x", " ")]).validate().is_err());

        let mut bad_for = Rule::alert("x", "up");
        bad_for.for_duration = Some("soon".into());
        assert!(group("g", vec![bad_for]).validate().is_err());

        let mut record_for = Rule::record("x", "up");
        record_for.for_duration = Some("5m".into());
        assert!(group("g", vec![record_for]).validate().is_err());

        let mut g = group("g", vec![]);
        g.interval = Some("1x".into());
        assert!(g.validate().is_err());
    }

    #[test]
    fn unknown_keys_rejected_on_decode() {
        let yaml = "groups:\n- name: a\n  partial_response_strategy: WARN\n  rules: []\n";
        assert!(serde_yaml::from_str::<RuleFile>(yaml).is_err());
    }

    #[test]
    fn rule_encodes_in_upstream_order() {
        let mut rule = Rule::alert("some", "up");
        rule.for_duration = Some("5m".into());
        rule.labels.insert("severity".into(), "page".into());
        let yaml = serde_yaml::to_string(&rule).unwrap();
        assert_eq!(yaml, "alert: some\nexpr: up\nfor: 5m\nlabels:\n  severity: page\n");
    }
}
