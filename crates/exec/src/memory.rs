//! In-memory sessions, pool and tracker for tests/dev.
//!
//! Statements are never run; they are recorded, and fail when they mention an
//! identifier registered through
//! [`InMemorySessionPool::fail_statements_mentioning`]. Identifiers registered
//! through [`InMemorySessionPool::panic_statements_mentioning`] make the
//! session panic instead, standing in for an engine fault.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use autoanalyze_core::StatsVersion;

use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::session::{Session, SessionPool, StatsHandle};
use crate::sql::AnalyzeSql;
use crate::tracker::Tracker;

/// A statement seen by an in-memory session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub session_id: u64,
    pub version: StatsVersion,
    pub sql: AnalyzeSql,
    pub succeeded: bool,
}

#[derive(Debug, Default)]
struct Shared {
    executed: Mutex<Vec<ExecutedStatement>>,
    failing: Mutex<HashSet<String>>,
    panicking: Mutex<HashSet<String>>,
    last_failed: Mutex<Option<Duration>>,
    average: Mutex<Option<Duration>>,
    history_error: Mutex<Option<String>>,
    history_lookups: AtomicUsize,
    borrowed: AtomicUsize,
    returned: AtomicUsize,
    exhausted: AtomicBool,
    next_session_id: AtomicU64,
}

/// In-memory session pool.
///
/// Clones share state, so a test can keep one clone for assertions while the
/// code under test borrows sessions from another.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionPool {
    shared: Arc<Shared>,
}

impl InMemorySessionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements mentioning `ident` as any parameter will fail.
    pub fn fail_statements_mentioning(&self, ident: impl Into<String>) {
        self.shared.failing.lock().unwrap().insert(ident.into());
    }

    /// Executing a statement mentioning `ident` panics.
    pub fn panic_statements_mentioning(&self, ident: impl Into<String>) {
        self.shared.panicking.lock().unwrap().insert(ident.into());
    }

    /// Make `get` fail with [`ExecError::PoolExhausted`].
    pub fn set_exhausted(&self, exhausted: bool) {
        self.shared.exhausted.store(exhausted, Ordering::SeqCst);
    }

    /// Analysis history answered by every session.
    pub fn set_history(&self, last_failed: Option<Duration>, average: Option<Duration>) {
        *self.shared.last_failed.lock().unwrap() = last_failed;
        *self.shared.average.lock().unwrap() = average;
    }

    /// Make history lookups fail with the given message.
    pub fn set_history_error(&self, msg: impl Into<String>) {
        *self.shared.history_error.lock().unwrap() = Some(msg.into());
    }

    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.shared.executed.lock().unwrap().clone()
    }

    pub fn history_lookups(&self) -> usize {
        self.shared.history_lookups.load(Ordering::SeqCst)
    }

    /// Sessions handed out so far.
    pub fn borrowed(&self) -> usize {
        self.shared.borrowed.load(Ordering::SeqCst)
    }

    /// Sessions currently borrowed and not yet returned.
    pub fn outstanding(&self) -> usize {
        self.borrowed()
            .saturating_sub(self.shared.returned.load(Ordering::SeqCst))
    }

    /// A session bound to this pool, without going through `get`.
    pub fn session(&self) -> RecordingSession {
        RecordingSession {
            id: self.shared.next_session_id.fetch_add(1, Ordering::SeqCst) + 1,
            shared: Arc::clone(&self.shared),
        }
    }
}

impl SessionPool for InMemorySessionPool {
    fn get(&self) -> Result<Box<dyn Session>, ExecError> {
        if self.shared.exhausted.load(Ordering::SeqCst) {
            return Err(ExecError::PoolExhausted);
        }
        self.shared.borrowed.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.session()))
    }

    fn put(&self, _session: Box<dyn Session>) {
        self.shared.returned.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session created by [`InMemorySessionPool`].
#[derive(Debug)]
pub struct RecordingSession {
    id: u64,
    shared: Arc<Shared>,
}

impl RecordingSession {
    fn history(&self, value: &Mutex<Option<Duration>>) -> Result<Option<Duration>, ExecError> {
        self.shared.history_lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.shared.history_error.lock().unwrap().clone() {
            return Err(ExecError::history(msg));
        }
        Ok(*value.lock().unwrap())
    }
}

impl Session for RecordingSession {
    fn id(&self) -> u64 {
        self.id
    }

    fn execute(&mut self, sql: &AnalyzeSql, version: StatsVersion) -> Result<(), ExecError> {
        let fault = {
            let panicking = self.shared.panicking.lock().unwrap();
            sql.params.iter().find(|p| panicking.contains(*p)).cloned()
        };
        if let Some(ident) = fault {
            panic!("injected engine fault for {ident}");
        }

        let failing = {
            let failing = self.shared.failing.lock().unwrap();
            sql.params.iter().find(|p| failing.contains(*p)).cloned()
        };

        self.shared.executed.lock().unwrap().push(ExecutedStatement {
            session_id: self.id,
            version,
            sql: sql.clone(),
            succeeded: failing.is_none(),
        });

        match failing {
            Some(ident) => Err(ExecError::statement(format!("injected failure for {ident}"))),
            None => Ok(()),
        }
    }

    fn last_failed_analysis_duration(
        &self,
        _schema: &str,
        _table: &str,
        _partitions: &[&str],
    ) -> Result<Option<Duration>, ExecError> {
        self.history(&self.shared.last_failed)
    }

    fn average_analysis_duration(
        &self,
        _schema: &str,
        _table: &str,
        _partitions: &[&str],
    ) -> Result<Option<Duration>, ExecError> {
        self.history(&self.shared.average)
    }
}

/// Stats handle over an [`InMemorySessionPool`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatsHandle {
    pool: InMemorySessionPool,
    config: ExecConfig,
}

impl InMemoryStatsHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecConfig) -> Self {
        Self {
            pool: InMemorySessionPool::new(),
            config,
        }
    }

    pub fn pool(&self) -> &InMemorySessionPool {
        &self.pool
    }
}

impl StatsHandle for InMemoryStatsHandle {
    fn session_pool(&self) -> &dyn SessionPool {
        &self.pool
    }

    fn exec_config(&self) -> &ExecConfig {
        &self.config
    }
}

/// Event recorded by [`RecordingTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEvent {
    Track { session_id: u64, info: String },
    Untrack { session_id: u64 },
}

/// Tracker that records every call.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    events: Mutex<Vec<TrackerEvent>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Tracker for RecordingTracker {
    fn track(&self, session_id: u64, info: &str) {
        self.events.lock().unwrap().push(TrackerEvent::Track {
            session_id,
            info: info.to_string(),
        });
    }

    fn untrack(&self, session_id: u64) {
        self.events
            .lock()
            .unwrap()
            .push(TrackerEvent::Untrack { session_id });
    }
}
