//! Durability specs
//!
//! Counts track enqueues, flushed state survives a restart, and deletes
//! are permanent.

use crate::prelude::*;
use std::thread;
use std::time::Duration;
use wp_storage::CommitLog;

#[test]
fn commit_count_tracks_enqueues_until_cleared() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _clock) = open_log(dir.path());

    for i in 0..5 {
        log.enqueue_commit("alice", "pos", format!("p{i}").into_bytes());
        assert_eq!(log.commit_count("alice", "pos"), i + 1);
    }

    log.delete_owner_key("alice", "pos");
    assert_eq!(log.commit_count("alice", "pos"), 0);

    log.enqueue_commit("alice", "pos", b"again".to_vec());
    assert_eq!(log.commit_count("alice", "pos"), 1);
}

#[test]
fn flush_then_restart_then_reload_reproduces_the_index() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (log, clock) = open_log(dir.path());
        log.enqueue_commit("alice", "pos", b"p1".to_vec());
        log.enqueue_commit("alice", "pos", b"p2".to_vec());
        clock.advance(Duration::from_secs(2));
        log.enqueue_commit("alice", "home", b"h1".to_vec());
        log.enqueue_error("bob", "pos", b"e1".to_vec());
        log.flush();
    }

    let (log, _clock) = open_log(dir.path());
    log.reload().unwrap();

    let alice = log.commits_for("alice");
    assert_eq!(
        alice.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["home", "pos"]
    );
    let pos: Vec<&[u8]> = alice["pos"].iter().map(|c| c.payload.as_slice()).collect();
    assert_eq!(pos, vec![b"p1".as_slice(), b"p2"]);
    assert_eq!(log.error_count("bob", "pos"), 1);
}

#[test]
fn the_alice_pos_scenario() {
    let dir = tempfile::tempdir().unwrap();
    {
        let (log, _clock) = open_log(dir.path());
        log.enqueue_commit("alice", "pos", b"p1".to_vec());
        log.enqueue_commit("alice", "pos", b"p2".to_vec());
        log.flush();
    }

    // Simulated restart
    let (log, _clock) = open_log(dir.path());
    log.reload().unwrap();

    let payloads: Vec<Vec<u8>> = log
        .commits_for_key("alice", "pos")
        .into_iter()
        .map(|c| c.payload)
        .collect();
    assert_eq!(payloads, vec![b"p1".to_vec(), b"p2".to_vec()]);
}

#[test]
fn deleted_owner_stays_deleted_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (log, _clock) = open_log(dir.path());
    log.enqueue_commit("alice", "pos", b"p1".to_vec());
    log.flush();

    log.delete_owner("alice");
    log.reload().unwrap();

    assert_eq!(log.commit_count("alice", "pos"), 0);
    assert!(log.commits_for("alice").is_empty());
}

#[test]
fn concurrent_enqueues_to_different_keys_lose_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let log = CommitLog::open(dir.path(), "mutations").unwrap();

    let per_thread = 100;
    let handles: Vec<_> = ["pos", "home", "work"]
        .into_iter()
        .map(|key| {
            let log = log.clone();
            thread::spawn(move || {
                for i in 0..per_thread {
                    log.enqueue_commit("alice", key, format!("{key}-{i}").into_bytes());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(log.commit_count("alice", "pos"), per_thread);
    assert_eq!(log.commit_count("alice", "home"), per_thread);
    assert_eq!(log.commit_count("alice", "work"), per_thread);
}

#[test]
fn concurrent_flush_and_enqueue_keep_every_commit() {
    let dir = tempfile::tempdir().unwrap();
    let log = CommitLog::open(dir.path(), "mutations").unwrap();

    let writer = {
        let log = log.clone();
        thread::spawn(move || {
            for i in 0..50 {
                log.enqueue_commit("alice", "pos", format!("p{i}").into_bytes());
            }
        })
    };
    for _ in 0..10 {
        log.flush();
    }
    writer.join().unwrap();
    log.flush();

    log.clear_memory();
    log.reload().unwrap();
    assert_eq!(log.commit_count("alice", "pos"), 50);
}
