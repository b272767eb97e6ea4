//! Sessions, the session pool and the scoped-borrow primitive.

use std::time::Duration;

use autoanalyze_core::StatsVersion;

use crate::config::ExecConfig;
use crate::error::ExecError;
use crate::sql::AnalyzeSql;

/// One pooled session of the SQL engine.
pub trait Session: Send {
    /// Process id of the session, used for process tracking.
    fn id(&self) -> u64;

    /// Execute one analyze statement with the given statistics version.
    fn execute(&mut self, sql: &AnalyzeSql, version: StatsVersion) -> Result<(), ExecError>;

    /// How long ago the most recent failed analysis of the scope ended.
    ///
    /// `Ok(None)` when no failure is on record. A zero duration means the
    /// last attempt just failed.
    fn last_failed_analysis_duration(
        &self,
        schema: &str,
        table: &str,
        partitions: &[&str],
    ) -> Result<Option<Duration>, ExecError>;

    /// Average duration of successful analyses of the scope, if any.
    fn average_analysis_duration(
        &self,
        schema: &str,
        table: &str,
        partitions: &[&str],
    ) -> Result<Option<Duration>, ExecError>;
}

/// Pool of reusable sessions.
pub trait SessionPool: Send + Sync {
    fn get(&self) -> Result<Box<dyn Session>, ExecError>;

    fn put(&self, session: Box<dyn Session>);
}

/// Entry point of the statistics subsystem handed to every job.
pub trait StatsHandle: Send + Sync {
    fn session_pool(&self) -> &dyn SessionPool;

    fn exec_config(&self) -> &ExecConfig;
}

/// Returns the borrowed session to its pool when dropped, so release also
/// happens while unwinding.
struct PooledSession<'a> {
    pool: &'a dyn SessionPool,
    session: Option<Box<dyn Session>>,
}

impl Drop for PooledSession<'_> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.put(session);
        }
    }
}

/// Borrow a session from `pool` for the duration of `f`.
///
/// The session is returned to the pool on every exit path. Only acquisition
/// failures are reported as errors; whatever `f` produces is passed through.
pub fn call_with_session<T, F>(pool: &dyn SessionPool, f: F) -> Result<T, ExecError>
where
    F: FnOnce(&mut dyn Session) -> T,
{
    let mut guard = PooledSession {
        pool,
        session: None,
    };
    let session = guard.session.insert(pool.get()?);
    Ok(f(&mut **session))
}
