//! Executor configuration.

use std::time::Duration;

use tracing::warn;

/// Environment variable overriding [`ExecConfig::slow_statement_threshold`], in milliseconds.
pub const SLOW_STATEMENT_ENV: &str = "AUTO_ANALYZE_SLOW_STATEMENT_MS";
/// Environment variable overriding [`ExecConfig::name`].
pub const NAME_ENV: &str = "AUTO_ANALYZE_EXECUTOR_NAME";

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Name for logging
    pub name: String,
    /// Statements running longer than this are logged as slow
    pub slow_statement_threshold: Duration,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            name: "auto-analyze".to_string(),
            slow_statement_threshold: Duration::from_secs(60),
        }
    }
}

impl ExecConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_slow_statement_threshold(mut self, threshold: Duration) -> Self {
        self.slow_statement_threshold = threshold;
        self
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(name) = lookup(NAME_ENV).filter(|n| !n.trim().is_empty()) {
            config.name = name.trim().to_string();
        }

        if let Some(raw) = lookup(SLOW_STATEMENT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.slow_statement_threshold = Duration::from_millis(ms),
                Err(e) => warn!(
                    key = SLOW_STATEMENT_ENV,
                    value = %raw,
                    error = %e,
                    "ignoring invalid slow statement threshold"
                ),
            }
        }

        config
    }
}
