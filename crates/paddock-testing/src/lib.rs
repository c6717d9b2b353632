//! Testing infrastructure for paddock unit and integration tests.
//!
//! This crate provides:
//! - `builders`: Fluent construction of laps and reconciled bundles
//! - `scripted`: A `ProviderAdapter` with canned per-key outcomes
//! - `fixtures`: Raw rich/live payload files for directory sources
//! - `TestWorld`: Isolated data directory plus CLI execution

pub mod builders;
pub mod fixtures;
pub mod scripted;
pub mod world;

pub use builders::{BundleBuilder, LapBuilder};
pub use fixtures::PayloadDir;
pub use scripted::ScriptedAdapter;
pub use world::{CliResult, TestWorld};
