//! Partial-response-aware rule group routing.
//!
//! This crate provides:
//! - Rule group model with the `partial_response_strategy` extension field
//! - Per-file loader that tolerates individual file failures
//! - Engine collaborator trait plus an in-process engine
//! - Manager that splits groups by strategy and reloads one engine per strategy
//! - Rule file discovery for directory arguments

pub mod discovery;
pub mod engine;
pub mod group;
pub mod loader;
pub mod manager;
pub mod rulefmt;
pub mod strategy;

pub use engine::{EngineError, LoadedGroup, LocalEngine, RuleEngine};
pub use group::{DecodeError, RuleGroup, RuleGroups};
pub use loader::{LoadError, RuleFileLoader};
pub use manager::{ManagerError, RuleManager, UpdateError, UpdateSummary};
pub use strategy::{PartialResponseStrategy, ValidationError};
