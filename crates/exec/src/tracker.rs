//! System process tracking.

/// Registers running analyze statements so they show up in the process list
/// (and can be killed there) while they run.
pub trait Tracker: Send + Sync {
    fn track(&self, session_id: u64, info: &str);

    fn untrack(&self, session_id: u64);
}

/// Tracker that records nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn track(&self, _session_id: u64, _info: &str) {}

    fn untrack(&self, _session_id: u64) {}
}
