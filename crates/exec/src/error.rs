//! Execution errors.

/// Error raised by sessions and the session pool.
///
/// These never escape an analysis job; the executor logs them and reports a
/// plain failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("session pool exhausted")]
    PoolExhausted,
    #[error("statement failed: {0}")]
    Statement(String),
    #[error("analysis history lookup failed: {0}")]
    History(String),
}

impl ExecError {
    pub fn statement(msg: impl Into<String>) -> Self {
        Self::Statement(msg.into())
    }

    pub fn history(msg: impl Into<String>) -> Self {
        Self::History(msg.into())
    }
}
