// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wp-core: Data model and contracts for the Waypost offline client
//!
//! This crate provides:
//! - The commit data model and on-disk filename codec
//! - Typed record mutation payloads for the geolocation service
//! - The replay consumer contract
//! - A clock abstraction for testable time handling

pub mod clock;
pub mod commit;
pub mod record;
pub mod replay;

pub use clock::{Clock, FakeClock, SystemClock};
pub use commit::{file_name, parse_file_name, Commit, CommitKind};
pub use record::{Mutation, PayloadError, Record};
pub use replay::ReplayConsumer;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use replay::{Delivered, FakeConsumer};
