// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay consumer contract
//!
//! During replay the commit log hands every queued payload for an owner
//! to a consumer, one synchronous call per payload, outside the log's
//! lock. Delivery is at-least-once: a crash between a delivery and the
//! post-replay delete produces a duplicate on the next run, so consumers
//! must process payloads idempotently.

use crate::commit::CommitKind;

/// Receives queued payloads during replay
pub trait ReplayConsumer: Send + Sync {
    /// Handle one delivered payload
    ///
    /// `kind` tags stored delivery failures (`CommitKind::Error`) so the
    /// consumer can treat them differently from ordinary commits.
    fn deliver(&self, owner: &str, key: &str, kind: CommitKind, payload: &[u8]);
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{CommitKind, ReplayConsumer};
    use std::sync::{Arc, Mutex};

    /// Recorded delivery
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Delivered {
        pub owner: String,
        pub key: String,
        pub kind: CommitKind,
        pub payload: Vec<u8>,
    }

    /// Fake consumer recording deliveries in order, for testing
    #[derive(Clone, Default)]
    pub struct FakeConsumer {
        calls: Arc<Mutex<Vec<Delivered>>>,
    }

    impl FakeConsumer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Get all recorded deliveries
        pub fn calls(&self) -> Vec<Delivered> {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl ReplayConsumer for FakeConsumer {
        fn deliver(&self, owner: &str, key: &str, kind: CommitKind, payload: &[u8]) {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(Delivered {
                    owner: owner.to_string(),
                    key: key.to_string(),
                    kind,
                    payload: payload.to_vec(),
                });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{Delivered, FakeConsumer};
