//! Replay specs
//!
//! Every queued payload for an owner is delivered exactly once, in
//! order, and the owner's data is gone afterwards.

use crate::prelude::*;
use std::time::Duration;
use wp_core::{CommitKind, FakeConsumer};

#[test]
fn replay_delivers_everything_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let (log, clock) = open_log(dir.path());

    log.enqueue_commit("alice", "pos", b"p1".to_vec());
    clock.advance(Duration::from_secs(1));
    log.enqueue_commit("alice", "pos", b"p2".to_vec());
    log.enqueue_error("alice", "pos", b"e1".to_vec());
    log.enqueue_commit("alice", "home", b"h1".to_vec());
    log.flush();

    let consumer = FakeConsumer::new();
    assert_eq!(log.replay("alice", &consumer), 4);

    let calls = consumer.calls();
    let seen: Vec<(&str, CommitKind, &[u8])> = calls
        .iter()
        .map(|c| (c.key.as_str(), c.kind, c.payload.as_slice()))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("home", CommitKind::Normal, b"h1".as_slice()),
            ("pos", CommitKind::Normal, b"p1"),
            ("pos", CommitKind::Normal, b"p2"),
            ("pos", CommitKind::Error, b"e1"),
        ]
    );

    // Nothing left to deliver, in memory or on disk
    assert_eq!(log.commit_count("alice", "pos"), 0);
    assert_eq!(log.error_count("alice", "pos"), 0);
    assert_eq!(log.commit_count("alice", "home"), 0);
    assert_eq!(log.replay("alice", &FakeConsumer::new()), 0);
}

#[test]
fn replay_covers_commits_flushed_by_an_earlier_run() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (log, _clock) = open_log(dir.path());
        log.enqueue_commit("alice", "pos", b"crashed".to_vec());
        log.flush();
        // Process dies before replaying; no reload on the next run
    }

    let (log, clock) = open_log(dir.path());
    clock.advance(Duration::from_secs(10));
    log.enqueue_commit("alice", "pos", b"fresh".to_vec());

    let consumer = FakeConsumer::new();
    assert_eq!(log.replay("alice", &consumer), 2);
    let calls = consumer.calls();
    let payloads: Vec<&[u8]> = calls.iter().map(|c| c.payload.as_slice()).collect();
    assert_eq!(payloads, vec![b"crashed".as_slice(), b"fresh"]);
}

#[test]
fn replay_leaves_other_owners_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _clock) = open_log(dir.path());
    log.enqueue_commit("alice", "pos", b"a".to_vec());
    log.enqueue_commit("bob", "pos", b"b".to_vec());
    log.flush();

    log.replay("alice", &FakeConsumer::new());

    assert_eq!(log.commit_count("bob", "pos"), 1);
    assert!(log.path().join("bob").is_dir());
}
