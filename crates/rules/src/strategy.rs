//! Partial response strategy: how evaluation behaves when only some data shards answer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of the rule-group field carrying the strategy.
pub const STRATEGY_FIELD: &str = "partial_response_strategy";

/// Policy applied when only part of the backing stores respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum PartialResponseStrategy {
    /// Fail the evaluation instead of returning incomplete data.
    #[default]
    Abort,
    /// Proceed with the partial data and surface a warning.
    Warn,
}

impl PartialResponseStrategy {
    /// Every known strategy, in routing order.
    pub const ALL: [PartialResponseStrategy; 2] = [Self::Abort, Self::Warn];

    /// Canonical uppercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "ABORT",
            Self::Warn => "WARN",
        }
    }

    /// Resolve a textual token. Empty resolves to [`Abort`](Self::Abort);
    /// matching ignores ASCII case.
    pub fn resolve(token: &str) -> Result<Self, ValidationError> {
        if token.is_empty() {
            return Ok(Self::Abort);
        }
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| ValidationError::new(token))
    }
}

impl fmt::Display for PartialResponseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartialResponseStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl Serialize for PartialResponseStrategy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PartialResponseStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::resolve(&token).map_err(serde::de::Error::custom)
    }
}

/// A strategy token outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value {token:?} for field '{field}', expected one of ABORT, WARN")]
pub struct ValidationError {
    pub field: &'static str,
    pub token: String,
}

impl ValidationError {
    pub(crate) fn new(token: impl Into<String>) -> Self {
        Self {
            field: STRATEGY_FIELD,
            token: token.into(),
        }
    }
}
