//! Shared helpers for the behavioral specs.

use std::path::Path;
use std::time::Duration;
use wp_core::FakeClock;
use wp_storage::CommitLog;

/// Open the standard test log with a fake clock parked at t = 100s
pub fn open_log(root: &Path) -> (CommitLog<FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    clock.advance(Duration::from_secs(100));
    let log = CommitLog::open_with_clock(root, "mutations", clock.clone()).unwrap();
    (log, clock)
}
