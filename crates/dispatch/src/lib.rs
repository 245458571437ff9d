// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Dispatcher for the Waypost offline client
//!
//! Decides between immediate network delivery and durable queueing, and
//! maps host lifecycle events (foreground, background, termination) onto
//! the commit log.

mod dispatcher;
mod transport;

pub use dispatcher::{Delivery, DispatchError, DispatcherConfig, RecordDispatcher};
pub use transport::{NoOpTransport, Transport, TransportError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeTransport, Outcome, TransportCall};
