// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport seam between the dispatcher and the network layer
//!
//! The real HTTP client lives outside this crate; the dispatcher only
//! needs to know whether a payload reached the service, and if not,
//! whether the network was unreachable or the service rejected it.

use std::io;
use thiserror::Error;

/// Why a delivery did not reach the service
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("service unreachable: {0}")]
    Unavailable(#[from] io::Error),
    #[error("service rejected payload: status {status}")]
    Rejected { status: u16, body: Vec<u8> },
}

/// Delivers record mutation payloads to the remote service
pub trait Transport: Send + Sync {
    fn deliver(&self, owner: &str, key: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// Transport that accepts everything; useful for wiring up hosts that
/// handle delivery elsewhere
#[derive(Clone, Default)]
pub struct NoOpTransport;

impl Transport for NoOpTransport {
    fn deliver(&self, _owner: &str, _key: &str, _payload: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{Transport, TransportError};
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Recorded delivery attempt
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TransportCall {
        pub owner: String,
        pub key: String,
        pub payload: Vec<u8>,
    }

    /// Scripted outcome for one delivery attempt
    #[derive(Debug, Clone, Copy)]
    pub enum Outcome {
        Ok,
        Unavailable,
        Rejected(u16),
    }

    /// Fake transport for testing: records every attempt and plays back
    /// scripted outcomes in order, defaulting to success
    #[derive(Clone, Default)]
    pub struct FakeTransport {
        calls: Arc<Mutex<Vec<TransportCall>>>,
        script: Arc<Mutex<VecDeque<Outcome>>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the outcome for the next unscripted delivery attempt
        pub fn push_outcome(&self, outcome: Outcome) {
            self.script
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push_back(outcome);
        }

        /// Get all recorded delivery attempts
        pub fn calls(&self) -> Vec<TransportCall> {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl Transport for FakeTransport {
        fn deliver(&self, owner: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(TransportCall {
                    owner: owner.to_string(),
                    key: key.to_string(),
                    payload: payload.to_vec(),
                });
            let outcome = self
                .script
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop_front()
                .unwrap_or(Outcome::Ok);
            match outcome {
                Outcome::Ok => Ok(()),
                Outcome::Unavailable => Err(TransportError::Unavailable(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "offline",
                ))),
                Outcome::Rejected(status) => Err(TransportError::Rejected {
                    status,
                    body: b"rejected".to_vec(),
                }),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, Outcome, TransportCall};
