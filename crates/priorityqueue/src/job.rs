//! The analysis job capability and the types shared by every job variant.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use autoanalyze_core::TableId;
use autoanalyze_exec::{Session, StatsHandle, Tracker};

/// Callback invoked with the job once its outcome is known.
///
/// Hooks belong to the owning queue and are shared with the job. They run
/// after the job's session has been released.
pub type JobHook = Arc<dyn Fn(&dyn AnalysisJob) + Send + Sync>;

/// Staleness and size signals used to prioritize a job.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicators {
    /// Fraction of rows modified since the last analysis
    pub change_percentage: f64,
    /// Estimated row count
    pub table_size: f64,
    /// Time elapsed since the last analysis
    pub last_analysis_duration: Duration,
}

/// What a job refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyzeType {
    /// The whole static partition.
    #[serde(rename = "analyzeStaticPartition")]
    StaticPartition,
    /// Only the newly added indexes of a static partition.
    #[serde(rename = "analyzeStaticPartitionIndex")]
    StaticPartitionIndex,
}

impl AnalyzeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzeType::StaticPartition => "analyzeStaticPartition",
            AnalyzeType::StaticPartitionIndex => "analyzeStaticPartitionIndex",
        }
    }
}

impl fmt::Display for AnalyzeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of [`AnalysisJob::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed,
}

impl JobOutcome {
    pub fn from_bool(success: bool) -> Self {
        if success {
            JobOutcome::Succeeded
        } else {
            JobOutcome::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded)
    }
}

/// Result of [`AnalysisJob::is_valid_to_analyze`].
///
/// `Invalid` means the job was rejected before anything ran, which the queue
/// may want to book differently from [`JobOutcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(reason.into())
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }

    /// Human-readable rejection reason; empty when valid.
    pub fn reason(&self) -> &str {
        match self {
            Validity::Valid => "",
            Validity::Invalid(reason) => reason,
        }
    }

    pub fn into_pair(self) -> (bool, String) {
        match self {
            Validity::Valid => (true, String::new()),
            Validity::Invalid(reason) => (false, reason),
        }
    }
}

/// A unit of statistics refresh work held by the priority queue.
///
/// Implemented by every job variant (whole table, dynamic partition, static
/// partition). The queue sets weight and indicators before enqueueing and
/// wires the hooks before calling [`analyze`](Self::analyze) at most once.
pub trait AnalysisJob: fmt::Display + Send + Sync {
    /// Id of the table or partition actually analyzed.
    fn table_id(&self) -> TableId;

    /// Run the analysis, firing exactly one of the registered hooks.
    ///
    /// Never fails with an error: every problem collapses to
    /// [`JobOutcome::Failed`].
    fn analyze(&self, stats_handle: &dyn StatsHandle, tracker: &dyn Tracker) -> JobOutcome;

    fn register_success_hook(&mut self, hook: JobHook);

    fn register_failure_hook(&mut self, hook: JobHook);

    fn indicators(&self) -> Indicators;

    fn set_indicators(&mut self, indicators: Indicators);

    /// Whether the job only exists to analyze newly added indexes.
    fn has_newly_added_index(&self) -> bool;

    /// Check whether the job may run now.
    ///
    /// A rejection may already notify the failure hook.
    fn is_valid_to_analyze(&self, session: &dyn Session) -> Validity;

    fn set_weight(&mut self, weight: f64);

    fn weight(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_pairs() {
        assert_eq!(Validity::Valid.into_pair(), (true, String::new()));
        assert_eq!(
            Validity::invalid("busy").into_pair(),
            (false, "busy".to_string())
        );
        assert_eq!(Validity::Valid.reason(), "");
    }

    #[test]
    fn outcome_from_bool() {
        assert!(JobOutcome::from_bool(true).is_success());
        assert_eq!(JobOutcome::from_bool(false), JobOutcome::Failed);
    }

    #[test]
    fn analyze_type_names_are_stable() {
        assert_eq!(AnalyzeType::StaticPartition.to_string(), "analyzeStaticPartition");
        assert_eq!(
            AnalyzeType::StaticPartitionIndex.to_string(),
            "analyzeStaticPartitionIndex"
        );
    }
}
