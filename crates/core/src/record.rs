// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed payloads for geolocation record mutations
//!
//! These are the bytes the commit log queues: one JSON-encoded mutation
//! per commit. The queue itself never inspects them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from payload encoding and decoding
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A geolocation record in a named layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub layer: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Seconds since the Unix epoch at which the record was created
    pub created: u64,
    /// Free-form properties forwarded to the service untouched
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Create a record with a fresh v4 id
    pub fn new(layer: impl Into<String>, latitude: f64, longitude: f64, created: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            layer: layer.into(),
            latitude,
            longitude,
            created,
            properties: serde_json::Map::new(),
        }
    }
}

/// One pending mutation against the remote record service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    Create(Record),
    Update(Record),
    Delete { id: String, layer: String },
}

impl Mutation {
    /// Encode to the raw bytes the commit log stores
    pub fn to_payload(&self) -> Result<Vec<u8>, PayloadError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode from queued payload bytes
    pub fn from_payload(bytes: &[u8]) -> Result<Self, PayloadError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
