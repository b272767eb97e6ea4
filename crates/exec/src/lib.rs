//! Execution plumbing for auto-analyze jobs: pooled sessions, process
//! tracking and the statement executor.
//!
//! ## Components
//!
//! - `Session` / `SessionPool`: the SQL engine surface a job runs against
//! - `call_with_session`: scoped session borrow with guaranteed release
//! - `StatsHandle`: entry point of the statistics subsystem (pool + config)
//! - `Tracker`: system process tracking around each statement
//! - `auto_analyze`: runs one analyze statement and collapses the outcome to a bool
//! - `memory`: in-memory implementations for tests/dev

pub mod config;
pub mod error;
pub mod exec;
pub mod memory;
pub mod session;
pub mod sql;
pub mod tracker;

pub use config::ExecConfig;
pub use error::ExecError;
pub use exec::auto_analyze;
pub use memory::{
    ExecutedStatement, InMemorySessionPool, InMemoryStatsHandle, RecordingSession, RecordingTracker,
    TrackerEvent,
};
pub use session::{Session, SessionPool, StatsHandle, call_with_session};
pub use sql::AnalyzeSql;
pub use tracker::{NoopTracker, Tracker};
