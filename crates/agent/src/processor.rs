// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Batch processors.
//!
//! `raw` mode forwards batches unchanged. `indexed` mode round-trips each
//! batch through the indexer; on any indexer error the batch is never
//! dropped silently: the failure is recorded and the original events pass
//! through unnormalized when `fallback_to_raw` is set (the default), or
//! the batch is dropped otherwise. Retries are left to the next batch.

use crate::error::{IndexerError, PipelineError};
use crate::stats::PipelineStats;
use observix_model::api::{Doc, NormalizeRequest, NormalizeResponse, RawLines};
use observix_model::event::Event;
use observix_model::spec::ProcessorSpec;
use std::time::Duration;
use tracing::warn;

/// A ready batch processor.
pub(crate) enum Processor {
    /// Forward batches unchanged.
    Raw,
    /// Normalize each batch through the indexer.
    Indexed(IndexerClient),
}

impl Processor {
    /// Builds the processor described by `spec`.
    pub(crate) fn from_spec(spec: &ProcessorSpec) -> Result<Self, PipelineError> {
        match spec {
            ProcessorSpec::Raw => Ok(Self::Raw),
            ProcessorSpec::Indexed {
                indexer_url,
                profile,
                timeout_seconds,
                fallback_to_raw,
            } => Ok(Self::Indexed(IndexerClient::new(
                indexer_url,
                profile,
                Duration::from_secs_f64(timeout_seconds.clamp(0.001, 3_600.0)),
                *fallback_to_raw,
            )?)),
        }
    }

    /// Transforms one batch. The returned batch is what the destination
    /// will emit; an empty return drops the batch.
    pub(crate) async fn process(&self, batch: Vec<Event>, stats: &PipelineStats) -> Vec<Event> {
        match self {
            Processor::Raw => batch,
            Processor::Indexed(client) => {
                let lines: Vec<String> = batch.iter().map(|e| e.raw.clone()).collect();
                match client.normalize(lines).await {
                    Ok(docs) => merge_docs(batch, docs),
                    Err(e) => {
                        warn!(error = %e, "indexer round-trip failed");
                        stats.record_batch_failed(e.to_string());
                        if client.fallback_to_raw {
                            batch
                        } else {
                            Vec::new()
                        }
                    }
                }
            }
        }
    }
}

/// Turns returned documents into outgoing events. Documents pair with the
/// original events by position so timestamps and peers survive
/// normalization; extra documents (a multi-line input) become fresh events.
fn merge_docs(batch: Vec<Event>, docs: Vec<Doc>) -> Vec<Event> {
    let mut out = Vec::with_capacity(docs.len());
    for (index, doc) in docs.into_iter().enumerate() {
        let mut event = match batch.get(index) {
            Some(original) => original.clone(),
            None => Event::new(doc.raw.clone()),
        };
        event.raw = doc.raw;
        event.meta = doc.fields;
        out.push(event);
    }
    out
}

/// HTTP client for the indexer's normalize endpoint.
pub(crate) struct IndexerClient {
    http: reqwest::Client,
    endpoint: String,
    profile: String,
    fallback_to_raw: bool,
}

impl IndexerClient {
    fn new(
        indexer_url: &str,
        profile: &str,
        timeout: Duration,
        fallback_to_raw: bool,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::IndexerClient {
                details: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint: format!("{}/v1/normalize", indexer_url.trim_end_matches('/')),
            profile: profile.to_owned(),
            fallback_to_raw,
        })
    }

    async fn normalize(&self, lines: Vec<String>) -> Result<Vec<Doc>, IndexerError> {
        let request = NormalizeRequest {
            profile: self.profile.clone(),
            raw: RawLines::Many(lines),
        };
        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| IndexerError::Transport {
                details: e.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexerError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }
        let body: NormalizeResponse =
            response.json().await.map_err(|e| IndexerError::Malformed {
                details: e.to_string(),
            })?;
        if body.docs.iter().any(|doc| doc.raw.is_empty()) {
            return Err(IndexerError::EmptyRaw);
        }
        Ok(body.docs)
    }
}
