// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record dispatcher: immediate send or durable queueing
//!
//! One explicit, dependency-injected dispatcher owns one commit log and
//! one transport. Host lifecycle events map onto the queue: foreground
//! replays everything queued and restarts the flush scheduler;
//! background and termination checkpoint the in-memory queue to disk
//! before the process is suspended.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use wp_core::{Clock, CommitKind, Mutation, PayloadError, ReplayConsumer, SystemClock};
use wp_storage::{CommitLog, StoreError};

use crate::transport::{Transport, TransportError};

/// Errors from dispatcher operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
}

/// Where a mutation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the remote service
    Sent,
    /// Queued in the commit log for later replay
    Queued,
}

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Application-private cache directory holding the log
    pub cache_root: PathBuf,
    /// Commit log directory name under the cache root
    pub log_name: String,
    /// Interval for the periodic flush scheduler
    pub flush_interval: Duration,
}

/// Decides between immediate delivery and durable queueing
pub struct RecordDispatcher<C: Clock = SystemClock> {
    log: CommitLog<C>,
    transport: Arc<dyn Transport>,
    config: DispatcherConfig,
    backgrounded: AtomicBool,
}

impl RecordDispatcher<SystemClock> {
    pub fn new(
        config: DispatcherConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DispatchError> {
        Self::with_clock(config, transport, SystemClock)
    }
}

impl<C: Clock + 'static> RecordDispatcher<C> {
    /// Construct with an explicit clock (injected for tests)
    pub fn with_clock(
        config: DispatcherConfig,
        transport: Arc<dyn Transport>,
        clock: C,
    ) -> Result<Self, DispatchError> {
        let log = CommitLog::open_with_clock(&config.cache_root, &config.log_name, clock)?;
        Ok(Self {
            log,
            transport,
            config,
            backgrounded: AtomicBool::new(false),
        })
    }

    /// The commit log owned by this dispatcher
    pub fn log(&self) -> &CommitLog<C> {
        &self.log
    }

    /// Recover flushed-but-unreplayed commits from a previous run
    ///
    /// Call once at startup, before the first lifecycle event.
    pub fn recover(&self) -> Result<(), DispatchError> {
        self.log.reload()?;
        Ok(())
    }

    /// Send one mutation, or queue it when delivery is not possible
    ///
    /// While backgrounded every mutation is queued without a network
    /// attempt. An unreachable service queues the payload as a normal
    /// commit; a rejection queues it as an error commit so the replay
    /// consumer can handle it separately.
    pub fn send(
        &self,
        owner: &str,
        key: &str,
        mutation: &Mutation,
    ) -> Result<Delivery, DispatchError> {
        let payload = mutation.to_payload()?;
        if self.backgrounded.load(Ordering::SeqCst) {
            self.log.enqueue_commit(owner, key, payload);
            return Ok(Delivery::Queued);
        }
        match self.transport.deliver(owner, key, &payload) {
            Ok(()) => Ok(Delivery::Sent),
            Err(TransportError::Unavailable(e)) => {
                tracing::warn!(owner, key, error = %e, "service unreachable, queueing mutation");
                self.log.enqueue_commit(owner, key, payload);
                Ok(Delivery::Queued)
            }
            Err(TransportError::Rejected { status, .. }) => {
                tracing::warn!(owner, key, status, "service rejected mutation, queueing as error");
                self.log.enqueue_error(owner, key, payload);
                Ok(Delivery::Queued)
            }
        }
    }

    /// Foreground transition: replay every owner, then resume flushing
    pub fn on_foreground(&self) {
        self.backgrounded.store(false, Ordering::SeqCst);
        for owner in self.log.owners() {
            let delivered = self.log.replay(&owner, self);
            tracing::info!(owner = %owner, delivered, "replayed queued mutations");
        }
        self.log.start_flush(self.config.flush_interval);
    }

    /// Background transition: checkpoint the queue before suspension
    ///
    /// Stops the flush scheduler, joining any in-flight pass, then
    /// flushes whatever is still only in memory. Safe to call within a
    /// bounded background grace period: no new network sends happen
    /// after it returns.
    pub fn on_background(&self) {
        self.backgrounded.store(true, Ordering::SeqCst);
        self.log.stop_flush();
        self.log.flush();
    }

    /// Termination: the same forced checkpoint as backgrounding
    pub fn on_terminate(&self) {
        self.on_background();
    }

    /// Queued (commit, error) counts for one `(owner, key)`
    pub fn pending(&self, owner: &str, key: &str) -> (usize, usize) {
        (
            self.log.commit_count(owner, key),
            self.log.error_count(owner, key),
        )
    }
}

impl<C: Clock + 'static> ReplayConsumer for RecordDispatcher<C> {
    /// Redelivery during replay: hand the payload back to the transport,
    /// re-enqueueing it with its original kind if delivery fails again
    fn deliver(&self, owner: &str, key: &str, kind: CommitKind, payload: &[u8]) {
        match self.transport.deliver(owner, key, payload) {
            Ok(()) => {}
            Err(e) => {
                tracing::warn!(owner, key, error = %e, "redelivery failed, requeueing");
                match kind {
                    CommitKind::Normal => self.log.enqueue_commit(owner, key, payload.to_vec()),
                    CommitKind::Error => self.log.enqueue_error(owner, key, payload.to_vec()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
