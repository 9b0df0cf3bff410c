//! Strategy-aware rule manager.
//!
//! Loads rule files, splits their groups by partial response strategy, and
//! reloads one engine per strategy with only the groups meant for it. The
//! engines stay the source of truth for what is loaded; [`RuleManager::rule_groups`]
//! reads back from all of them.

mod core;
mod error;
mod projection;


pub use self::core::{RuleManager, StrategySummary, UpdateSummary};
pub use self::error::{ManagerError, UpdateError};
