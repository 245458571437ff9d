// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage for the Waypost offline write queue
//!
//! Two layers: [`CacheDir`], a scoped handle over an application-private
//! cache subtree, and [`CommitLog`], the crash-recoverable queue of
//! pending record mutations built on top of it.

mod cache;
mod commit_log;
mod flush;

pub use cache::{CacheDir, StoreError};
pub use commit_log::CommitLog;
