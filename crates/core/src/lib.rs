//! `autoanalyze-core` — shared building blocks of the statistics maintenance
//! subsystem.
//!
//! This crate contains **pure** primitives (no sessions, no SQL execution).

pub mod error;
pub mod id;
pub mod version;

pub use error::StatsError;
pub use id::TableId;
pub use version::StatsVersion;
