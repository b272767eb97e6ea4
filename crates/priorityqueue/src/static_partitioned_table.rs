//! Job analyzing a single static partition of a partitioned table.
//!
//! With static partition pruning there is no table-level statistics shortcut,
//! so each partition is analyzed on its own and the job is identified by the
//! partition rather than by the logical table.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tracing::{debug, error, warn};

use autoanalyze_core::{StatsVersion, TableId};
use autoanalyze_exec::{AnalyzeSql, Session, StatsHandle, Tracker, auto_analyze, call_with_session};

use crate::job::{AnalysisJob, AnalyzeType, Indicators, JobHook, JobOutcome, Validity};
use crate::validity;

const ANALYZE_STATIC_PARTITION_SQL: &str = "analyze table %n.%n partition %n";
const ANALYZE_STATIC_PARTITION_INDEX_SQL: &str = "analyze table %n.%n partition %n index %n";

/// Analysis job for one static partition, or only its newly added indexes.
pub struct StaticPartitionedTableAnalysisJob {
    success_hook: Option<JobHook>,
    failure_hook: Option<JobHook>,
    pub table_schema: String,
    pub global_table_name: String,
    pub static_partition_name: String,
    /// Only set for newly added indexes.
    pub indexes: Vec<String>,
    pub indicators: Indicators,
    pub global_table_id: TableId,
    pub static_partition_id: TableId,
    /// Analyze version of the session that runs the job, not the version the
    /// table's current statistics were built with. Decides whether every
    /// newly added index gets its own statement.
    pub table_stats_ver: StatsVersion,
    pub weight: f64,
}

impl StaticPartitionedTableAnalysisJob {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: impl Into<String>,
        global_table_name: impl Into<String>,
        global_table_id: TableId,
        partition_name: impl Into<String>,
        partition_id: TableId,
        indexes: Vec<String>,
        table_stats_ver: StatsVersion,
        change_percentage: f64,
        table_size: f64,
        last_analysis_duration: Duration,
    ) -> Self {
        Self {
            success_hook: None,
            failure_hook: None,
            table_schema: schema.into(),
            global_table_name: global_table_name.into(),
            static_partition_name: partition_name.into(),
            indexes,
            indicators: Indicators {
                change_percentage,
                table_size,
                last_analysis_duration,
            },
            global_table_id,
            static_partition_id: partition_id,
            table_stats_ver,
            weight: 0.0,
        }
    }

    /// Recomputed on every call from the index list.
    pub fn analyze_type(&self) -> AnalyzeType {
        if self.has_newly_added_index() {
            AnalyzeType::StaticPartitionIndex
        } else {
            AnalyzeType::StaticPartition
        }
    }

    /// SQL analyzing the whole static partition.
    pub fn gen_sql_for_analyze_static_partition(&self) -> AnalyzeSql {
        AnalyzeSql::new(
            ANALYZE_STATIC_PARTITION_SQL,
            [
                self.table_schema.as_str(),
                self.global_table_name.as_str(),
                self.static_partition_name.as_str(),
            ],
        )
    }

    /// SQL analyzing one index of the static partition.
    pub fn gen_sql_for_analyze_static_partition_index(&self, index: &str) -> AnalyzeSql {
        AnalyzeSql::new(
            ANALYZE_STATIC_PARTITION_INDEX_SQL,
            [
                self.table_schema.as_str(),
                self.global_table_name.as_str(),
                self.static_partition_name.as_str(),
                index,
            ],
        )
    }

    fn analyze_static_partition(
        &self,
        session: &mut dyn Session,
        stats_handle: &dyn StatsHandle,
        tracker: &dyn Tracker,
    ) -> JobOutcome {
        let sql = self.gen_sql_for_analyze_static_partition();
        JobOutcome::from_bool(auto_analyze(
            session,
            stats_handle,
            tracker,
            self.table_stats_ver,
            &sql,
        ))
    }

    fn analyze_static_partition_indexes(
        &self,
        session: &mut dyn Session,
        stats_handle: &dyn StatsHandle,
        tracker: &dyn Tracker,
    ) -> JobOutcome {
        let Some(first_index) = self.indexes.first() else {
            return JobOutcome::Succeeded;
        };

        if self.table_stats_ver.is_v1() {
            // Stops at the first failing index.
            let all_analyzed = self.indexes.iter().all(|index| {
                let sql = self.gen_sql_for_analyze_static_partition_index(index);
                auto_analyze(&mut *session, stats_handle, tracker, self.table_stats_ver, &sql)
            });
            return JobOutcome::from_bool(all_analyzed);
        }

        // Analyzing one index refreshes every column and index of the
        // partition, so the remaining indexes would only repeat the work.
        let sql = self.gen_sql_for_analyze_static_partition_index(first_index);
        JobOutcome::from_bool(auto_analyze(
            session,
            stats_handle,
            tracker,
            self.table_stats_ver,
            &sql,
        ))
    }

    fn notify(&self, outcome: JobOutcome) {
        let hook = match outcome {
            JobOutcome::Succeeded => &self.success_hook,
            JobOutcome::Failed => &self.failure_hook,
        };
        if let Some(hook) = hook {
            hook(self as &dyn AnalysisJob);
        }
    }
}

impl AnalysisJob for StaticPartitionedTableAnalysisJob {
    /// The partition id: only the static partition is analyzed.
    fn table_id(&self) -> TableId {
        self.static_partition_id
    }

    fn analyze(&self, stats_handle: &dyn StatsHandle, tracker: &dyn Tracker) -> JobOutcome {
        let analyze_type = self.analyze_type();
        debug!(
            table_id = %self.table_id(),
            partition = %self.static_partition_name,
            analyze_type = %analyze_type,
            "running auto analyze job"
        );

        let run = || {
            call_with_session(stats_handle.session_pool(), |session| match analyze_type {
                AnalyzeType::StaticPartition => {
                    self.analyze_static_partition(session, stats_handle, tracker)
                }
                AnalyzeType::StaticPartitionIndex => {
                    self.analyze_static_partition_indexes(session, stats_handle, tracker)
                }
            })
        };

        // A panicking session still counts as a failed run and fires the hook.
        let outcome = match panic::catch_unwind(AssertUnwindSafe(run)) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(
                    table_id = %self.table_id(),
                    partition = %self.static_partition_name,
                    error = %e,
                    "failed to get session for auto analyze"
                );
                JobOutcome::Failed
            }
            Err(payload) => {
                error!(
                    table_id = %self.table_id(),
                    partition = %self.static_partition_name,
                    panic = panic_message(&*payload),
                    "auto analyze job panicked"
                );
                JobOutcome::Failed
            }
        };

        self.notify(outcome);
        outcome
    }

    fn register_success_hook(&mut self, hook: JobHook) {
        self.success_hook = Some(hook);
    }

    fn register_failure_hook(&mut self, hook: JobHook) {
        self.failure_hook = Some(hook);
    }

    fn indicators(&self) -> Indicators {
        self.indicators
    }

    fn set_indicators(&mut self, indicators: Indicators) {
        self.indicators = indicators;
    }

    fn has_newly_added_index(&self) -> bool {
        !self.indexes.is_empty()
    }

    /// Only the static partition itself is checked.
    fn is_valid_to_analyze(&self, session: &dyn Session) -> Validity {
        if self.static_partition_name.is_empty() {
            return Validity::Valid;
        }

        let partitions = [self.static_partition_name.as_str()];
        let validity = validity::is_valid_to_analyze(
            session,
            &self.table_schema,
            &self.global_table_name,
            &partitions,
        );
        if !validity.is_valid() {
            self.notify(JobOutcome::Failed);
        }
        validity
    }

    fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

impl fmt::Display for StaticPartitionedTableAnalysisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "StaticPartitionedTableAnalysisJob:")?;
        writeln!(f, "\tAnalyzeType: {}", self.analyze_type())?;
        writeln!(f, "\tIndexes: {}", self.indexes.join(", "))?;
        writeln!(f, "\tSchema: {}", self.table_schema)?;
        writeln!(f, "\tGlobalTable: {}", self.global_table_name)?;
        writeln!(f, "\tGlobalTableID: {}", self.global_table_id)?;
        writeln!(f, "\tStaticPartition: {}", self.static_partition_name)?;
        writeln!(f, "\tStaticPartitionID: {}", self.static_partition_id)?;
        writeln!(f, "\tTableStatsVer: {}", self.table_stats_ver)?;
        writeln!(f, "\tChangePercentage: {:.6}", self.indicators.change_percentage)?;
        writeln!(f, "\tTableSize: {:.2}", self.indicators.table_size)?;
        writeln!(
            f,
            "\tLastAnalysisDuration: {:?}",
            self.indicators.last_analysis_duration
        )?;
        writeln!(f, "\tWeight: {:.6}", self.weight)
    }
}

impl fmt::Debug for StaticPartitionedTableAnalysisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticPartitionedTableAnalysisJob")
            .field("table_schema", &self.table_schema)
            .field("global_table_name", &self.global_table_name)
            .field("global_table_id", &self.global_table_id)
            .field("static_partition_name", &self.static_partition_name)
            .field("static_partition_id", &self.static_partition_id)
            .field("indexes", &self.indexes)
            .field("table_stats_ver", &self.table_stats_ver)
            .field("indicators", &self.indicators)
            .field("weight", &self.weight)
            .field("success_hook", &self.success_hook.is_some())
            .field("failure_hook", &self.failure_hook.is_some())
            .finish()
    }
}
