// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! The control-plane poll client.

use crate::error::{Error, PollError};
use observix_model::catalog::AssignmentView;
use reqwest::StatusCode;
use reqwest::header::IF_NONE_MATCH;
use std::time::Duration;

const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the agent's assignment endpoint.
pub(crate) struct ControlPlaneClient {
    http: reqwest::Client,
    endpoint: String,
    region: String,
}

impl ControlPlaneClient {
    /// Builds a client polling `base_url` for `agent_id` in `region`.
    pub(crate) fn new(base_url: &str, agent_id: &str, region: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(POLL_TIMEOUT)
            .build()
            .map_err(|e| Error::HttpClient {
                details: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint: format!(
                "{}/v1/agents/{agent_id}/assignments",
                base_url.trim_end_matches('/')
            ),
            region: region.to_owned(),
        })
    }

    /// Fetches the current assignment view, passing the last-applied
    /// revision as a conditional header. `Ok(None)` means not modified.
    pub(crate) async fn fetch_assignments(
        &self,
        last_revision: Option<&str>,
    ) -> Result<Option<AssignmentView>, PollError> {
        let mut request = self
            .http
            .get(&self.endpoint)
            .query(&[("region", self.region.as_str())]);
        if let Some(revision) = last_revision {
            request = request.header(IF_NONE_MATCH, revision);
        }

        let response = request.send().await.map_err(|e| PollError::Transport {
            details: e.to_string(),
        })?;
        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(None),
            status if status.is_success() => {
                let view = response.json().await.map_err(|e| PollError::Malformed {
                    details: e.to_string(),
                })?;
                Ok(Some(view))
            }
            status => Err(PollError::UnexpectedStatus {
                status: status.as_u16(),
            }),
        }
    }
}
