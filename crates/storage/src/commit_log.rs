// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash-recoverable commit log for pending record mutations
//!
//! The log keeps an in-memory index of queued commits keyed by
//! `(owner, key)` and persists it one raw payload per file under
//! `<cacheRoot>/<logName>/<owner>/<key>/<prefix>-<timestamp>`. Flush
//! copies unpersisted commits to disk, reload rebuilds the index after a
//! restart, and replay hands every queued payload for an owner to a
//! consumer before dropping the owner's persisted data.
//!
//! Delivery is at-least-once: replay removes data only after every
//! callback for the owner has returned, so a crash mid-replay leaves the
//! disk copies to be replayed again on the next run.
//!
//! A single mutex serializes every operation that touches the index;
//! replay callbacks run outside it against a snapshot, so a consumer
//! that re-enters the log (for example to re-enqueue a failed
//! redelivery) cannot deadlock.
//!
//! `CommitLog` is a cheap-to-clone handle; clones share one queue, and
//! the flush scheduler thread holds only a weak reference to it.

use crate::cache::{CacheDir, StoreError};
use crate::flush::FlushTask;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, UNIX_EPOCH};
use wp_core::{file_name, parse_file_name, Clock, Commit, CommitKind, ReplayConsumer, SystemClock};

/// One queued commit plus its persistence marker
#[derive(Debug, Clone)]
struct QueuedCommit {
    commit: Commit,
    /// Filename under `owner/key/` once flushed
    flushed_as: Option<String>,
}

type KeyQueues = BTreeMap<String, Vec<QueuedCommit>>;
type Index = BTreeMap<String, KeyQueues>;

/// State shared by all handles to one log
pub(crate) struct Shared<C: Clock> {
    cache: CacheDir,
    clock: C,
    index: Mutex<Index>,
    pub(crate) flusher: Mutex<Option<FlushTask>>,
}

/// Durable write queue with replay, scoped to one named log directory
pub struct CommitLog<C: Clock = SystemClock> {
    pub(crate) inner: Arc<Shared<C>>,
}

impl<C: Clock> Clone for CommitLog<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl CommitLog<SystemClock> {
    /// Open the log named `name` under `cache_root`
    pub fn open(cache_root: impl AsRef<Path>, name: &str) -> Result<Self, StoreError> {
        Self::open_with_clock(cache_root, name, SystemClock)
    }
}

impl<C: Clock> CommitLog<C> {
    /// Open the log with an explicit clock (injected for tests)
    pub fn open_with_clock(
        cache_root: impl AsRef<Path>,
        name: &str,
        clock: C,
    ) -> Result<Self, StoreError> {
        let cache = CacheDir::open(cache_root.as_ref().join(name))?;
        Ok(Self {
            inner: Arc::new(Shared {
                cache,
                clock,
                index: Mutex::new(Index::new()),
                flusher: Mutex::new(None),
            }),
        })
    }

    /// Path of the log's top-level directory
    pub fn path(&self) -> &Path {
        self.inner.cache.path()
    }

    /// Queue a mutation payload in memory; no disk I/O
    pub fn enqueue_commit(&self, owner: &str, key: &str, payload: Vec<u8>) {
        self.enqueue(owner, key, payload, CommitKind::Normal);
    }

    /// Queue a delivery-failure payload in memory; no disk I/O
    pub fn enqueue_error(&self, owner: &str, key: &str, payload: Vec<u8>) {
        self.enqueue(owner, key, payload, CommitKind::Error);
    }

    fn enqueue(&self, owner: &str, key: &str, payload: Vec<u8>, kind: CommitKind) {
        let commit = Commit::new(owner, key, payload, kind, self.inner.clock.now());
        let mut index = self.inner.lock_index();
        index
            .entry(owner.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .push(QueuedCommit {
                commit,
                flushed_as: None,
            });
    }

    /// Persist every commit not yet on disk
    ///
    /// A failed write is logged and skipped; the pass continues with the
    /// remaining commits, so one bad key cannot hold the queue hostage.
    pub fn flush(&self) {
        self.inner.flush_pass();
    }

    /// Rebuild the in-memory index from disk
    ///
    /// Used at startup to recover commits that were flushed but never
    /// replayed before a restart. Unrecognized and unreadable files are
    /// skipped; only a failure to list the log root itself is an error.
    pub fn reload(&self) -> Result<(), StoreError> {
        let mut index = self.inner.lock_index();
        let mut fresh = Index::new();
        for owner in self.inner.cache.entries()? {
            let keys = self.inner.read_owner(&owner);
            if !keys.is_empty() {
                fresh.insert(owner, keys);
            }
        }
        *index = fresh;
        Ok(())
    }

    /// Drop the in-memory index; disk state is untouched
    pub fn clear_memory(&self) {
        self.inner.lock_index().clear();
    }

    /// Remove an owner's commits from memory and disk together
    pub fn delete_owner(&self, owner: &str) {
        let mut index = self.inner.lock_index();
        index.remove(owner);
        if let Err(e) = self.inner.cache.delete_subtree(owner) {
            tracing::warn!(owner, error = %e, "delete: owner subtree not fully removed");
        }
    }

    /// Remove one `(owner, key)` queue from memory and disk together
    pub fn delete_owner_key(&self, owner: &str, key: &str) {
        let mut index = self.inner.lock_index();
        if let Some(keys) = index.get_mut(owner) {
            keys.remove(key);
            if keys.is_empty() {
                index.remove(owner);
            }
        }
        if let Err(e) = self.inner.cache.delete_subtree(Path::new(owner).join(key)) {
            tracing::warn!(owner, key, error = %e, "delete: key subtree not fully removed");
        }
    }

    /// Remove every commit in the log from memory and disk together
    pub fn delete_all(&self) {
        let mut index = self.inner.lock_index();
        index.clear();
        if let Err(e) = self.inner.cache.delete_all() {
            tracing::warn!(error = %e, "delete: log directory not fully cleared");
        }
    }

    /// Replay every queued commit and error for an owner
    ///
    /// The owner's in-memory queue is merged with anything persisted on
    /// disk that memory does not already know about, then the consumer
    /// is called once per payload, outside the lock, with keys in
    /// ascending order, all normal commits for a key before its error
    /// commits, insertion order within each kind. Afterwards the owner's
    /// replayed data is removed from memory and disk together; commits
    /// enqueued while deliveries were running (including consumer
    /// re-enqueues) survive and will be flushed again. Returns the
    /// number of payloads delivered.
    pub fn replay(&self, owner: &str, consumer: &dyn ReplayConsumer) -> usize {
        let snapshot: Vec<Commit> = {
            let mut index = self.inner.lock_index();
            let mut keys = index.remove(owner).unwrap_or_default();
            // Pick up anything flushed by an earlier run that was never
            // loaded into memory, matching by persisted filename.
            for (key, disk_queue) in self.inner.read_owner(owner) {
                let queue = keys.entry(key).or_default();
                let known: BTreeSet<String> =
                    queue.iter().filter_map(|q| q.flushed_as.clone()).collect();
                for queued in disk_queue {
                    let duplicate = queued
                        .flushed_as
                        .as_ref()
                        .is_some_and(|name| known.contains(name));
                    if !duplicate {
                        queue.push(queued);
                    }
                }
                // Persisted entries came from an earlier run, so on a
                // timestamp tie they sort ahead of this run's commits;
                // the stable sort preserves insertion order otherwise.
                queue.sort_by_key(|q| (q.commit.timestamp_secs(), q.flushed_as.is_none()));
            }
            if keys.is_empty() {
                return 0;
            }
            let mut commits = Vec::new();
            for (_key, queue) in keys {
                let (normals, errors): (Vec<_>, Vec<_>) = queue
                    .into_iter()
                    .partition(|q| q.commit.kind == CommitKind::Normal);
                commits.extend(normals.into_iter().map(|q| q.commit));
                commits.extend(errors.into_iter().map(|q| q.commit));
            }
            commits
        };

        for commit in &snapshot {
            consumer.deliver(&commit.owner, &commit.key, commit.kind, &commit.payload);
        }

        // Drop the disk copies of what was just replayed. Anything the
        // owner accumulated during delivery stays in memory; its
        // persistence markers are reset in case a concurrent flush wrote
        // into the subtree being removed.
        let mut index = self.inner.lock_index();
        if let Err(e) = self.inner.cache.delete_subtree(owner) {
            tracing::warn!(owner, error = %e, "replay: owner subtree not fully removed");
        }
        if let Some(keys) = index.get_mut(owner) {
            for queue in keys.values_mut() {
                for queued in queue.iter_mut() {
                    queued.flushed_as = None;
                }
            }
        }
        snapshot.len()
    }

    /// All queued commits for an owner, grouped by key
    ///
    /// Empty when nothing is queued, never an absent value.
    pub fn commits_for(&self, owner: &str) -> BTreeMap<String, Vec<Commit>> {
        let index = self.inner.lock_index();
        index
            .get(owner)
            .map(|keys| {
                keys.iter()
                    .map(|(key, queue)| {
                        (
                            key.clone(),
                            queue.iter().map(|q| q.commit.clone()).collect(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Queued commits for one `(owner, key)`, in insertion order
    pub fn commits_for_key(&self, owner: &str, key: &str) -> Vec<Commit> {
        let index = self.inner.lock_index();
        index
            .get(owner)
            .and_then(|keys| keys.get(key))
            .map(|queue| queue.iter().map(|q| q.commit.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of queued normal commits for one `(owner, key)`
    pub fn commit_count(&self, owner: &str, key: &str) -> usize {
        self.count(owner, key, CommitKind::Normal)
    }

    /// Number of queued error commits for one `(owner, key)`
    pub fn error_count(&self, owner: &str, key: &str) -> usize {
        self.count(owner, key, CommitKind::Error)
    }

    fn count(&self, owner: &str, key: &str, kind: CommitKind) -> usize {
        let index = self.inner.lock_index();
        index
            .get(owner)
            .and_then(|keys| keys.get(key))
            .map(|queue| queue.iter().filter(|q| q.commit.kind == kind).count())
            .unwrap_or(0)
    }

    /// Owners with queued data, in memory or on disk
    pub fn owners(&self) -> Vec<String> {
        let index = self.inner.lock_index();
        let mut owners: BTreeSet<String> = index.keys().cloned().collect();
        match self.inner.cache.entries() {
            Ok(names) => owners.extend(names),
            Err(e) => tracing::warn!(error = %e, "owners: cannot list log directory"),
        }
        owners.into_iter().collect()
    }
}

impl<C: Clock> Shared<C> {
    fn lock_index(&self) -> MutexGuard<'_, Index> {
        self.index.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// One full flush pass; called from `flush` and the scheduler thread
    pub(crate) fn flush_pass(&self) {
        let mut index = self.lock_index();
        for (owner, keys) in index.iter_mut() {
            for (key, queue) in keys.iter_mut() {
                if queue.iter().all(|q| q.flushed_as.is_some()) {
                    continue;
                }
                let dir = match self.cache.child(owner).and_then(|d| d.child(key)) {
                    Ok(dir) => dir,
                    Err(e) => {
                        tracing::warn!(owner, key, error = %e, "flush: cannot open key directory");
                        continue;
                    }
                };
                // Existing names claim their timestamps; later commits in
                // the same second get a tie-breaker suffix.
                let mut taken: BTreeSet<String> = match dir.entries() {
                    Ok(names) => names.into_iter().collect(),
                    Err(e) => {
                        tracing::warn!(owner, key, error = %e, "flush: cannot list key directory");
                        continue;
                    }
                };
                for queued in queue.iter_mut().filter(|q| q.flushed_as.is_none()) {
                    let name =
                        next_file_name(&taken, queued.commit.kind, queued.commit.timestamp_secs());
                    match dir.write_file(&name, &queued.commit.payload) {
                        Ok(()) => {
                            taken.insert(name.clone());
                            queued.flushed_as = Some(name);
                        }
                        Err(e) => {
                            tracing::warn!(owner, key, error = %e, "flush: write failed, commit kept in memory");
                        }
                    }
                }
            }
        }
    }

    /// Read one owner's subtree from disk; faults shrink to empty maps
    fn read_owner(&self, owner: &str) -> KeyQueues {
        let mut keys = KeyQueues::new();
        let owner_dir = match self.cache.existing_child(owner) {
            Ok(Some(dir)) => dir,
            Ok(None) => return keys,
            Err(e) => {
                tracing::warn!(owner, error = %e, "reload: cannot open owner directory");
                return keys;
            }
        };
        let names = match owner_dir.entries() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(owner, error = %e, "reload: cannot list owner directory");
                return keys;
            }
        };
        for key in names {
            let queue = self.read_key(&owner_dir, owner, &key);
            if !queue.is_empty() {
                keys.insert(key, queue);
            }
        }
        keys
    }

    /// Read one key directory, ordered by `(timestamp, tie-breaker)`
    fn read_key(&self, owner_dir: &CacheDir, owner: &str, key: &str) -> Vec<QueuedCommit> {
        let dir = match owner_dir.existing_child(key) {
            Ok(Some(dir)) => dir,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(owner, key, error = %e, "reload: cannot open key directory");
                return Vec::new();
            }
        };
        let names = match dir.entries() {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(owner, key, error = %e, "reload: cannot list key directory");
                return Vec::new();
            }
        };
        let mut found = Vec::new();
        for name in names {
            match parse_file_name(&name) {
                Some((kind, ts, seq)) => found.push((ts, seq, kind, name)),
                None => tracing::warn!(owner, key, file = %name, "reload: unrecognized file skipped"),
            }
        }
        found.sort_by_key(|&(ts, seq, _, _)| (ts, seq));

        let mut queue = Vec::new();
        for (ts, _seq, kind, name) in found {
            match dir.read_file(&name) {
                Ok(Some(payload)) => queue.push(QueuedCommit {
                    commit: Commit::new(
                        owner,
                        key,
                        payload,
                        kind,
                        UNIX_EPOCH + Duration::from_secs(ts),
                    ),
                    flushed_as: Some(name),
                }),
                // Deleted between listing and read
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(owner, key, file = %name, error = %e, "reload: unreadable file skipped");
                }
            }
        }
        queue
    }
}

impl<C: Clock> Drop for Shared<C> {
    fn drop(&mut self) {
        // The scheduler thread only holds a weak handle, so the last
        // strong one can drop while it is still running; stopping here
        // guarantees no flush callback outlives the log.
        self.stop_flush_task();
    }
}

/// First free filename for `(kind, ts)` given the names already taken
fn next_file_name(taken: &BTreeSet<String>, kind: CommitKind, ts: u64) -> String {
    let mut seq = 0;
    loop {
        let name = file_name(kind, ts, seq);
        if !taken.contains(&name) {
            return name;
        }
        seq += 1;
    }
}

#[cfg(test)]
#[path = "commit_log_tests.rs"]
mod tests;
