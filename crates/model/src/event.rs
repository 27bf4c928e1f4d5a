// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! The unit of work flowing through agent pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// A single log event as it travels from a source to a destination.
///
/// `raw` is always populated: normalization merges extracted fields into
/// [`Event::meta`] but never replaces the original line, so the payload
/// survives an indexer failure downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// The payload as received from the source, unmodified.
    pub raw: String,

    /// Event timestamp. Absent means "receive time at the source".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<DateTime<Utc>>,

    /// Remote peer the event was received from, when the source knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_addr: Option<SocketAddr>,

    /// Structured fields produced by normalization, keyed by short names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl Event {
    /// Creates an event carrying `raw`, stamped with the current time.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ts: Some(Utc::now()),
            source_addr: None,
            meta: BTreeMap::new(),
        }
    }

    /// Creates an event received from a known remote peer.
    pub fn with_source(raw: impl Into<String>, source_addr: SocketAddr) -> Self {
        Self {
            source_addr: Some(source_addr),
            ..Self::new(raw)
        }
    }

    /// The event timestamp, or `fallback` when the source did not stamp one.
    #[must_use]
    pub fn ts_or(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        self.ts.unwrap_or(fallback)
    }
}
