//! Statistics format version.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// Semantic format version of collected statistics.
///
/// Version 1 keeps per-index statistics independent: every index has to be
/// analyzed explicitly. From version 2 on, analyzing any index of a table
/// (or partition) also refreshes all of its columns and indexes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct StatsVersion(u8);

impl StatsVersion {
    pub const V1: Self = Self(1);
    pub const V2: Self = Self(2);

    pub fn new(raw: u8) -> Result<Self, StatsError> {
        if raw == 0 {
            return Err(StatsError::invalid_version("version must be at least 1"));
        }
        Ok(Self(raw))
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Whether every index needs its own analyze statement.
    pub const fn is_v1(self) -> bool {
        self.0 == 1
    }
}

impl Default for StatsVersion {
    fn default() -> Self {
        Self::V2
    }
}

impl fmt::Display for StatsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u8> for StatsVersion {
    type Error = StatsError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StatsVersion> for u8 {
    fn from(value: StatsVersion) -> Self {
        value.0
    }
}

impl FromStr for StatsVersion {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u8>()
            .map_err(|e| StatsError::invalid_version(format!("{s:?}: {e}")))?;
        Self::new(raw)
    }
}
