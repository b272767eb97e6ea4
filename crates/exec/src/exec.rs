//! The statement executor.

use std::time::Instant;

use tracing::{info, warn};

use autoanalyze_core::StatsVersion;

use crate::session::{Session, StatsHandle};
use crate::sql::AnalyzeSql;
use crate::tracker::Tracker;

/// Keeps a session registered with the tracker until dropped, so the entry
/// is also removed while unwinding.
struct Tracked<'a> {
    tracker: &'a dyn Tracker,
    session_id: u64,
}

impl<'a> Tracked<'a> {
    fn new(tracker: &'a dyn Tracker, session_id: u64, info: &str) -> Self {
        tracker.track(session_id, info);
        Self {
            tracker,
            session_id,
        }
    }
}

impl Drop for Tracked<'_> {
    fn drop(&mut self) {
        self.tracker.untrack(self.session_id);
    }
}

/// Run one analyze statement on `session`.
///
/// The statement is registered with `tracker` while it runs. Any failure is
/// logged and reported as `false`; bounding the runtime of the statement is
/// up to the session.
pub fn auto_analyze(
    session: &mut dyn Session,
    handle: &dyn StatsHandle,
    tracker: &dyn Tracker,
    version: StatsVersion,
    sql: &AnalyzeSql,
) -> bool {
    let config = handle.exec_config();
    let session_id = session.id();
    let rendered = sql.to_string();

    if sql.placeholder_count() != sql.params.len() {
        warn!(
            executor = %config.name,
            sql = %rendered,
            expected = sql.placeholder_count(),
            actual = sql.params.len(),
            "refusing analyze statement with mismatched parameters"
        );
        return false;
    }

    let started = Instant::now();
    let result = {
        let _tracked = Tracked::new(tracker, session_id, &rendered);
        session.execute(sql, version)
    };
    let elapsed = started.elapsed();
    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    match result {
        Ok(()) if elapsed >= config.slow_statement_threshold => {
            warn!(
                executor = %config.name,
                session_id,
                sql = %rendered,
                stats_version = %version,
                elapsed_ms,
                "auto analyze finished slowly"
            );
            true
        }
        Ok(()) => {
            info!(
                executor = %config.name,
                session_id,
                sql = %rendered,
                stats_version = %version,
                elapsed_ms,
                "auto analyze finished"
            );
            true
        }
        Err(e) => {
            warn!(
                executor = %config.name,
                session_id,
                sql = %rendered,
                stats_version = %version,
                elapsed_ms,
                error = %e,
                "auto analyze failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};
    use std::time::Duration;

    use super::*;
    use crate::config::ExecConfig;
    use crate::memory::{InMemoryStatsHandle, RecordingTracker, TrackerEvent};
    use crate::session::call_with_session;

    fn partition_sql(partition: &str) -> AnalyzeSql {
        AnalyzeSql::new("analyze table %n.%n partition %n", ["s", "t", partition])
    }

    #[test]
    fn successful_statement_is_tracked_and_recorded() {
        autoanalyze_observability::init_for_tests();
        let handle = InMemoryStatsHandle::new();
        let tracker = RecordingTracker::new();

        let ok = call_with_session(handle.session_pool(), |s| {
            auto_analyze(s, &handle, &tracker, StatsVersion::V2, &partition_sql("p0"))
        })
        .unwrap();

        assert!(ok);
        let executed = handle.pool().executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].sql, partition_sql("p0"));
        assert_eq!(executed[0].version, StatsVersion::V2);
        assert!(executed[0].succeeded);
        assert_eq!(
            tracker.events(),
            vec![
                TrackerEvent::Track {
                    session_id: 1,
                    info: "analyze table `s`.`t` partition `p0`".to_string(),
                },
                TrackerEvent::Untrack { session_id: 1 },
            ]
        );
    }

    #[test]
    fn failing_statement_collapses_to_false() {
        let handle = InMemoryStatsHandle::new();
        handle.pool().fail_statements_mentioning("p1");
        let tracker = RecordingTracker::new();

        let ok = call_with_session(handle.session_pool(), |s| {
            auto_analyze(s, &handle, &tracker, StatsVersion::V1, &partition_sql("p1"))
        })
        .unwrap();

        assert!(!ok);
        let executed = handle.pool().executed();
        assert_eq!(executed.len(), 1);
        assert!(!executed[0].succeeded);
        assert_eq!(tracker.events().len(), 2);
    }

    #[test]
    fn panicking_statement_is_still_untracked() {
        let handle = InMemoryStatsHandle::new();
        handle.pool().panic_statements_mentioning("p2");
        let tracker = RecordingTracker::new();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            call_with_session(handle.session_pool(), |s| {
                auto_analyze(s, &handle, &tracker, StatsVersion::V2, &partition_sql("p2"))
            })
        }));

        assert!(result.is_err());
        assert!(handle.pool().executed().is_empty());
        assert_eq!(
            tracker.events(),
            vec![
                TrackerEvent::Track {
                    session_id: 1,
                    info: "analyze table `s`.`t` partition `p2`".to_string(),
                },
                TrackerEvent::Untrack { session_id: 1 },
            ]
        );
        assert_eq!(handle.pool().outstanding(), 0);
    }

    #[test]
    fn slow_statement_still_succeeds() {
        let handle = InMemoryStatsHandle::with_config(
            ExecConfig::default().with_slow_statement_threshold(Duration::ZERO),
        );

        let ok = call_with_session(handle.session_pool(), |s| {
            auto_analyze(s, &handle, &crate::NoopTracker, StatsVersion::V2, &partition_sql("p0"))
        })
        .unwrap();

        assert!(ok);
    }

    #[test]
    fn mismatched_parameters_are_not_executed() {
        let handle = InMemoryStatsHandle::new();
        let sql = AnalyzeSql::new("analyze table %n.%n partition %n", ["s", "t"]);

        let ok = call_with_session(handle.session_pool(), |s| {
            auto_analyze(s, &handle, &crate::NoopTracker, StatsVersion::V2, &sql)
        })
        .unwrap();

        assert!(!ok);
        assert!(handle.pool().executed().is_empty());
    }
}
