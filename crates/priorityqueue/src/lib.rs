//! Analysis jobs ranked and drained by the auto-analyze priority queue.
//!
//! ## Design
//!
//! - Every job variant implements [`AnalysisJob`] so the queue treats them uniformly
//! - A job's id is the id of the smallest unit it refreshes
//! - Jobs report their outcome once through success/failure hooks wired by the queue
//! - Jobs are discarded after `analyze`; retries are new jobs
//!
//! ## Components
//!
//! - `job`: the [`AnalysisJob`] capability, [`Indicators`], hooks and outcomes
//! - `validity`: whether a table or partition may be analyzed right now
//! - `static_partitioned_table`: job refreshing one static partition (or its new indexes)

pub mod job;
pub mod static_partitioned_table;
pub mod validity;

pub use job::{AnalysisJob, AnalyzeType, Indicators, JobHook, JobOutcome, Validity};
pub use static_partitioned_table::StaticPartitionedTableAnalysisJob;
pub use validity::is_valid_to_analyze;
