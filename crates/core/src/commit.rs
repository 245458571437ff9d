// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Commit data model and on-disk filename codec
//!
//! Persisted layout, kept bit-for-bit compatible with existing recovery
//! tooling:
//!
//! ```text
//! <cacheRoot>/<logName>/<owner>/<key>/<prefix>-<unixTimestamp>
//! ```
//!
//! The prefix is `commit` or `error`; when two commits for the same key
//! share a timestamp, a `-<n>` suffix disambiguates the later ones.

use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of a queued commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// An ordinary pending mutation
    Normal,
    /// A delivery failure, stored for rejection-specific handling
    Error,
}

impl CommitKind {
    /// Filename prefix for this kind
    pub fn prefix(self) -> &'static str {
        match self {
            CommitKind::Normal => "commit",
            CommitKind::Error => "error",
        }
    }
}

/// A durable record of one pending mutation awaiting delivery
///
/// Immutable once created; the payload bytes are opaque to the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub owner: String,
    pub key: String,
    pub payload: Vec<u8>,
    pub kind: CommitKind,
    pub created_at: SystemTime,
}

impl Commit {
    pub fn new(
        owner: impl Into<String>,
        key: impl Into<String>,
        payload: Vec<u8>,
        kind: CommitKind,
        created_at: SystemTime,
    ) -> Self {
        Self {
            owner: owner.into(),
            key: key.into(),
            payload,
            kind,
            created_at,
        }
    }

    /// Whole seconds since the Unix epoch, as used in the filename
    pub fn timestamp_secs(&self) -> u64 {
        self.created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Encode a commit filename from kind, timestamp, and tie-breaker
///
/// `seq` 0 produces the bare `<prefix>-<ts>` form; higher values append
/// the disambiguator.
pub fn file_name(kind: CommitKind, ts_secs: u64, seq: u32) -> String {
    if seq == 0 {
        format!("{}-{}", kind.prefix(), ts_secs)
    } else {
        format!("{}-{}-{}", kind.prefix(), ts_secs, seq)
    }
}

/// Decode a commit filename back into kind, timestamp, and tie-breaker
///
/// Returns `None` for names that are not commit files, so callers can
/// skip foreign files during recovery.
pub fn parse_file_name(name: &str) -> Option<(CommitKind, u64, u32)> {
    let mut parts = name.split('-');
    let kind = match parts.next()? {
        "commit" => CommitKind::Normal,
        "error" => CommitKind::Error,
        _ => return None,
    };
    let ts: u64 = parts.next()?.parse().ok()?;
    let seq: u32 = match parts.next() {
        None => 0,
        Some(s) => s.parse().ok()?,
    };
    if parts.next().is_some() {
        return None;
    }
    Some((kind, ts, seq))
}

#[cfg(test)]
#[path = "commit_tests.rs"]
mod tests;
