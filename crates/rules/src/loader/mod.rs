//! Rule file loader.
//!
//! Reads one rule file, decodes it into [`RuleGroups`](crate::group::RuleGroups)
//! and stamps every group with the resolved absolute path of its file.
//! Failures are reported per file so a caller can keep going with the rest.

mod core;
mod error;

#[cfg(test)]
mod tests;

pub use self::core::RuleFileLoader;
pub use self::error::{LoadError, LoadResult, LoadStatus, Result};
