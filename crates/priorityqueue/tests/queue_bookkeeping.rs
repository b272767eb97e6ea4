//! Black-box checks of the contract an owning queue relies on: weight-ordered
//! dispatch, hook bookkeeping and concurrent execution of distinct jobs.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use autoanalyze_core::{StatsVersion, TableId};
use autoanalyze_exec::{InMemoryStatsHandle, RecordingTracker, TrackerEvent};
use autoanalyze_priorityqueue::{
    AnalysisJob, Indicators, JobHook, JobOutcome, StaticPartitionedTableAnalysisJob,
};

#[derive(Debug, Default)]
struct Ledger {
    succeeded: Mutex<Vec<TableId>>,
    failed: Mutex<Vec<(TableId, Indicators)>>,
}

fn success_hook(ledger: &Arc<Ledger>) -> JobHook {
    let ledger = Arc::clone(ledger);
    Arc::new(move |job: &dyn AnalysisJob| {
        ledger.succeeded.lock().unwrap().push(job.table_id());
    })
}

fn failure_hook(ledger: &Arc<Ledger>) -> JobHook {
    let ledger = Arc::clone(ledger);
    Arc::new(move |job: &dyn AnalysisJob| {
        ledger
            .failed
            .lock()
            .unwrap()
            .push((job.table_id(), job.indicators()));
    })
}

fn partition_job(partition: &str, id: i64, indexes: &[&str]) -> StaticPartitionedTableAnalysisJob {
    StaticPartitionedTableAnalysisJob::new(
        "sales",
        "orders",
        TableId::new(1),
        partition,
        TableId::new(id),
        indexes.iter().map(|i| i.to_string()).collect(),
        StatsVersion::V1,
        0.3,
        10_000.0,
        Duration::from_secs(600),
    )
}

fn enqueue(
    ledger: &Arc<Ledger>,
    mut job: StaticPartitionedTableAnalysisJob,
    weight: f64,
) -> Box<dyn AnalysisJob> {
    job.set_weight(weight);
    job.register_success_hook(success_hook(ledger));
    job.register_failure_hook(failure_hook(ledger));
    Box::new(job)
}

#[test]
fn queue_books_outcomes_by_partition() {
    autoanalyze_observability::init_for_tests();
    let handle = InMemoryStatsHandle::new();
    handle.pool().fail_statements_mentioning("idx_customer");
    let tracker = RecordingTracker::new();
    let ledger = Arc::new(Ledger::default());

    let mut queue = vec![
        enqueue(&ledger, partition_job("p2024", 11, &[]), 0.4),
        enqueue(&ledger, partition_job("p2025", 12, &["idx_customer", "idx_day"]), 0.9),
        enqueue(&ledger, partition_job("p2023", 10, &[]), 0.1),
    ];
    queue.sort_by(|a, b| b.weight().total_cmp(&a.weight()));

    let outcomes: Vec<_> = queue
        .iter()
        .map(|job| (job.table_id(), job.analyze(&handle, &tracker)))
        .collect();

    assert_eq!(
        outcomes,
        vec![
            (TableId::new(12), JobOutcome::Failed),
            (TableId::new(11), JobOutcome::Succeeded),
            (TableId::new(10), JobOutcome::Succeeded),
        ]
    );
    assert_eq!(
        *ledger.succeeded.lock().unwrap(),
        vec![TableId::new(11), TableId::new(10)]
    );
    let failed = ledger.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, TableId::new(12));
    assert_eq!(failed[0].1.table_size, 10_000.0);

    // idx_day is never attempted after idx_customer fails.
    assert!(!handle.pool().executed().iter().any(|e| e.sql.mentions("idx_day")));
    // Every statement is tracked and untracked.
    let events = tracker.events();
    assert_eq!(events.len(), 2 * handle.pool().executed().len());
    assert!(matches!(events.last(), Some(TrackerEvent::Untrack { .. })));
    assert_eq!(handle.pool().outstanding(), 0);
}

#[test]
fn rejected_job_is_booked_as_failed_without_running() {
    let handle = InMemoryStatsHandle::new();
    handle
        .pool()
        .set_history(Some(Duration::from_secs(1)), Some(Duration::from_secs(60)));
    let ledger = Arc::new(Ledger::default());
    let job = enqueue(&ledger, partition_job("p2024", 11, &[]), 1.0);

    let session = handle.pool().session();
    let (valid, reason) = job.is_valid_to_analyze(&session).into_pair();

    assert!(!valid);
    assert!(reason.contains("2 times the average"));
    assert_eq!(ledger.failed.lock().unwrap().len(), 1);
    assert!(ledger.succeeded.lock().unwrap().is_empty());
    assert!(handle.pool().executed().is_empty());
}

#[test]
fn distinct_jobs_run_concurrently() {
    let handle = Arc::new(InMemoryStatsHandle::new());
    let tracker = Arc::new(RecordingTracker::new());
    let ledger = Arc::new(Ledger::default());

    let jobs: Vec<Box<dyn AnalysisJob>> = (0..8)
        .map(|i| {
            enqueue(
                &ledger,
                partition_job(&format!("p{i}"), 100 + i, &["idx_a", "idx_b"]),
                i as f64,
            )
        })
        .collect();

    thread::scope(|scope| {
        for job in &jobs {
            let handle = Arc::clone(&handle);
            let tracker = Arc::clone(&tracker);
            scope.spawn(move || job.analyze(&*handle, &*tracker));
        }
    });

    let mut succeeded = ledger.succeeded.lock().unwrap().clone();
    succeeded.sort();
    assert_eq!(succeeded, (100..108).map(TableId::new).collect::<Vec<_>>());
    assert!(ledger.failed.lock().unwrap().is_empty());
    // Version 1: both indexes of every partition.
    assert_eq!(handle.pool().executed().len(), 16);
    assert_eq!(handle.pool().borrowed(), 8);
    assert_eq!(handle.pool().outstanding(), 0);
}
