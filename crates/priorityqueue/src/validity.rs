//! Whether a table or some of its partitions may be analyzed right now.
//!
//! Analyses that keep failing are throttled: after a failure, the scope is
//! skipped until at least twice the average successful analysis duration has
//! passed.

use std::time::Duration;

use tracing::debug;

use autoanalyze_exec::Session;

use crate::job::Validity;

pub const LAST_ANALYSIS_JUST_FAILED: &str = "last analysis just failed";
pub const FAILED_TOO_RECENTLY: &str =
    "last failed analysis duration is less than 2 times the average analysis duration";

/// Check the analysis history of `schema.table` (restricted to `partitions`
/// when non-empty).
pub fn is_valid_to_analyze(
    session: &dyn Session,
    schema: &str,
    table: &str,
    partitions: &[&str],
) -> Validity {
    let last_failed = match session.last_failed_analysis_duration(schema, table, partitions) {
        Ok(d) => d,
        Err(e) => {
            return reject(
                schema,
                table,
                partitions,
                format!("failed to get last failed analysis duration: {e}"),
            );
        }
    };
    let Some(last_failed) = last_failed else {
        return Validity::Valid;
    };
    if last_failed == Duration::ZERO {
        return reject(schema, table, partitions, LAST_ANALYSIS_JUST_FAILED.to_string());
    }

    let average = match session.average_analysis_duration(schema, table, partitions) {
        Ok(d) => d,
        Err(e) => {
            return reject(
                schema,
                table,
                partitions,
                format!("failed to get average analysis duration: {e}"),
            );
        }
    };
    let Some(average) = average else {
        return Validity::Valid;
    };

    if last_failed < average.saturating_mul(2) {
        return reject(schema, table, partitions, FAILED_TOO_RECENTLY.to_string());
    }

    Validity::Valid
}

fn reject(schema: &str, table: &str, partitions: &[&str], reason: String) -> Validity {
    debug!(
        schema,
        table,
        partitions = ?partitions,
        reason = %reason,
        "skipping auto analyze"
    );
    Validity::Invalid(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoanalyze_exec::InMemorySessionPool;

    fn check(pool: &InMemorySessionPool) -> Validity {
        is_valid_to_analyze(&pool.session(), "s", "t", &["p0"])
    }

    #[test]
    fn no_failure_on_record_is_valid() {
        let pool = InMemorySessionPool::new();
        pool.set_history(None, Some(Duration::from_secs(10)));

        assert_eq!(check(&pool), Validity::Valid);
        assert_eq!(pool.history_lookups(), 1);
    }

    #[test]
    fn just_failed_is_rejected() {
        let pool = InMemorySessionPool::new();
        pool.set_history(Some(Duration::ZERO), Some(Duration::from_secs(10)));

        assert_eq!(check(&pool), Validity::invalid(LAST_ANALYSIS_JUST_FAILED));
    }

    #[test]
    fn recent_failure_is_rejected() {
        let pool = InMemorySessionPool::new();
        pool.set_history(Some(Duration::from_secs(19)), Some(Duration::from_secs(10)));

        assert_eq!(check(&pool), Validity::invalid(FAILED_TOO_RECENTLY));
    }

    #[test]
    fn old_failure_is_valid() {
        let pool = InMemorySessionPool::new();
        pool.set_history(Some(Duration::from_secs(20)), Some(Duration::from_secs(10)));

        assert_eq!(check(&pool), Validity::Valid);
    }

    #[test]
    fn failure_without_successful_average_is_valid() {
        let pool = InMemorySessionPool::new();
        pool.set_history(Some(Duration::from_secs(1)), None);

        assert_eq!(check(&pool), Validity::Valid);
        assert_eq!(pool.history_lookups(), 2);
    }

    #[test]
    fn lookup_error_is_rejected() {
        let pool = InMemorySessionPool::new();
        pool.set_history_error("analyze_jobs unavailable");

        let validity = check(&pool);
        assert!(!validity.is_valid());
        assert_eq!(
            validity.reason(),
            "failed to get last failed analysis duration: analysis history lookup failed: analyze_jobs unavailable"
        );
    }
}
