//! Rule groups decorated with their source file and partial response strategy.
//!
//! Decoding is two-pass: the upstream fields go through [`GroupSpec`] untouched,
//! then `partial_response_strategy` is pulled out and resolved on its own. On
//! encode the extension field is only written when it was explicitly set, so
//! files that never used it serialize back unchanged.

use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;

use crate::rulefmt::{GroupSpec, Rule};
use crate::strategy::{PartialResponseStrategy, ValidationError, STRATEGY_FIELD};

/// A rule group plus the file it came from and its strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    /// Upstream part: `name`, `interval`, `rules`.
    pub spec: GroupSpec,
    /// Absolute path of the source file. Set by the loader, never by the file itself.
    pub original_file: PathBuf,
    /// `None` when the field was absent. Routes like ABORT but is not written back out.
    pub partial_response_strategy: Option<PartialResponseStrategy>,
}

impl RuleGroup {
    pub fn new(spec: GroupSpec) -> Self {
        Self {
            spec,
            original_file: PathBuf::new(),
            partial_response_strategy: None,
        }
    }

    /// Mark the strategy as explicitly set.
    pub fn with_strategy(mut self, strategy: PartialResponseStrategy) -> Self {
        self.partial_response_strategy = Some(strategy);
        self
    }

    pub fn with_original_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.original_file = path.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn rules(&self) -> &[Rule] {
        &self.spec.rules
    }

    pub fn original_file(&self) -> &Path {
        &self.original_file
    }

    /// Strategy used for routing: unset behaves as ABORT.
    pub fn strategy(&self) -> PartialResponseStrategy {
        self.partial_response_strategy.unwrap_or_default()
    }

    /// Decode one group from a YAML node.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Mapping(mut map) = value else {
            return Err(DecodeError::NotAMapping);
        };

        let raw_strategy = map.remove(STRATEGY_FIELD);
        let name_hint = map.get("name").and_then(Value::as_str).map(str::to_string);

        let spec: GroupSpec = serde_yaml::from_value(Value::Mapping(map))
            .map_err(|source| DecodeError::Schema {
                group: name_hint,
                source,
            })?;

        let partial_response_strategy = raw_strategy
            .as_ref()
            .map(resolve_value)
            .transpose()
            .map_err(|source| DecodeError::Strategy {
                group: Some(spec.name.clone()),
                source,
            })?;

        Ok(Self {
            spec,
            original_file: PathBuf::new(),
            partial_response_strategy,
        })
    }
}

/// Resolve the raw YAML value of the extension field. A null counts as empty.
fn resolve_value(value: &Value) -> Result<PartialResponseStrategy, ValidationError> {
    match value {
        Value::Null => Ok(PartialResponseStrategy::Abort),
        Value::String(s) => PartialResponseStrategy::resolve(s),
        Value::Bool(b) => Err(ValidationError::new(b.to_string())),
        Value::Number(n) => Err(ValidationError::new(n.to_string())),
        other => Err(ValidationError::new(
            serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| format!("{:?}", other)),
        )),
    }
}

impl Serialize for RuleGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.spec.name)?;
        if let Some(interval) = &self.spec.interval {
            map.serialize_entry("interval", interval)?;
        }
        map.serialize_entry("rules", &self.spec.rules)?;
        if let Some(strategy) = &self.partial_response_strategy {
            map.serialize_entry(STRATEGY_FIELD, strategy)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RuleGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// All groups of one rule file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleGroups {
    pub groups: Vec<RuleGroup>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRuleGroups {
    #[serde(default)]
    groups: Vec<Value>,
}

impl RuleGroups {
    pub fn new(groups: Vec<RuleGroup>) -> Self {
        Self { groups }
    }

    /// Decode a whole rule file. An empty document yields no groups.
    pub fn from_yaml(contents: &str) -> Result<Self, DecodeError> {
        let doc: Value = serde_yaml::from_str(contents).map_err(DecodeError::Document)?;
        if doc.is_null() {
            return Ok(Self::default());
        }
        let raw: RawRuleGroups = serde_yaml::from_value(doc).map_err(DecodeError::Document)?;
        let groups = raw
            .groups
            .into_iter()
            .map(RuleGroup::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleGroup> {
        self.groups.iter()
    }
}

impl IntoIterator for RuleGroups {
    type Item = RuleGroup;
    type IntoIter = std::vec::IntoIter<RuleGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'de> Deserialize<'de> for RuleGroups {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRuleGroups::deserialize(deserializer)?;
        let groups = raw
            .groups
            .into_iter()
            .map(RuleGroup::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(serde::de::Error::custom)?;
        Ok(Self { groups })
    }
}

/// Why a rule document could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid YAML, or the top level is not `groups: [...]`.
    #[error("{0}")]
    Document(#[source] serde_yaml::Error),

    #[error("rule group must be a mapping")]
    NotAMapping,

    /// Upstream fields (`name`, `interval`, `rules`) did not match the schema.
    #[error("{}{source}", group_prefix(.group))]
    Schema {
        group: Option<String>,
        #[source]
        source: serde_yaml::Error,
    },

    /// The extension field held an unknown token.
    #[error("failed to unmarshal 'partial_response_strategy'{}: {source}", group_suffix(.group))]
    Strategy {
        group: Option<String>,
        #[source]
        source: ValidationError,
    },
}

fn group_prefix(group: &Option<String>) -> String {
    group
        .as_ref()
        .map(|g| format!("group {:?}: ", g))
        .unwrap_or_default()
}

fn group_suffix(group: &Option<String>) -> String {
    group
        .as_ref()
        .map(|g| format!(" in group {:?}", g))
        .unwrap_or_default()
}
