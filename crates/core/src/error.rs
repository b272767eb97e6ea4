//! Error model for the statistics primitives.

use thiserror::Error;

/// Error raised while building or parsing statistics primitives.
///
/// Execution failures (sessions, statements) are not represented here; they
/// belong to the execution layer and never leave an analysis job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatsError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A statistics version outside the supported range.
    #[error("invalid stats version: {0}")]
    InvalidVersion(String),
}

impl StatsError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_version(msg: impl Into<String>) -> Self {
        Self::InvalidVersion(msg.into())
    }
}
