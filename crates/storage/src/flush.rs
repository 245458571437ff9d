// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic flush scheduling
//!
//! One worker thread per log, woken on a fixed interval; each tick runs
//! a full flush pass. The thread holds only a weak reference to the
//! log's shared state, so dropping the last handle stops the scheduler
//! on its next tick. `stop_flush` stops it promptly and joins the
//! thread, so any in-flight flush completes before teardown continues.

use crate::commit_log::{CommitLog, Shared};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use wp_core::Clock;

/// Handle to a running flush thread
pub(crate) struct FlushTask {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl<C: Clock + 'static> CommitLog<C> {
    /// Start the periodic flush thread; a no-op if already running
    pub fn start_flush(&self, interval: Duration) {
        let mut slot = self
            .inner
            .flusher
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return;
        }
        let (stop, ticks) = mpsc::channel::<()>();
        let shared = Arc::downgrade(&self.inner);
        let handle = std::thread::spawn(move || loop {
            match ticks.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => match shared.upgrade() {
                    Some(shared) => shared.flush_pass(),
                    None => break,
                },
                // Stop signal, or the sender side went away
                _ => break,
            }
        });
        *slot = Some(FlushTask { stop, handle });
    }
}

impl<C: Clock> CommitLog<C> {
    /// Stop the periodic flush thread, waiting for any in-flight flush
    ///
    /// A no-op if the scheduler is not running.
    pub fn stop_flush(&self) {
        self.inner.stop_flush_task();
    }
}

impl<C: Clock> Shared<C> {
    pub(crate) fn stop_flush_task(&self) {
        let task = self
            .flusher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            let _ = task.stop.send(());
            // If the flush thread upgraded the last strong reference, the
            // shared state drops on that thread and the loop is already
            // exiting; joining would be a self-join.
            if task.handle.thread().id() != std::thread::current().id() {
                let _ = task.handle.join();
            }
        }
    }
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
