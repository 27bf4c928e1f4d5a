// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! HTTP execution of CLI commands.
//!
//! The client is a thin wrapper: it builds the request for a command,
//! sends it, and classifies the outcome. It never touches agent state.

use crate::args::{AgentCommand, AssignmentCommand, Command, PipelineCommand};
use observix_model::spec::PipelineSpec;
use serde_json::{Value, json};
use std::path::Path;
use thiserror::Error;

/// Outcome classification driving the process exit code.
#[derive(Error, Debug)]
pub enum CliError {
    /// A local input problem (unreadable or invalid spec file).
    #[error("{0}")]
    Input(String),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The control plane answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Api {
        /// The HTTP status code received.
        status: u16,
        /// The response body, passed through verbatim.
        body: String,
    },
}

/// The control-plane HTTP client.
pub struct Client {
    http: reqwest::Client,
    base: String,
}

impl Client {
    /// Creates a client for the control plane at `base_url`.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Executes one command, returning the parsed response body when the
    /// server sent one.
    pub async fn execute(&self, command: Command) -> Result<Option<Value>, CliError> {
        match command {
            Command::Pipeline(PipelineCommand::Create {
                name,
                disabled,
                spec_file,
            }) => {
                let spec = load_spec(&spec_file)?;
                let body = json!({ "name": name, "enabled": !disabled, "spec": spec });
                self.send(
                    self.http
                        .post(format!("{}/v1/pipelines", self.base))
                        .json(&body),
                )
                .await
            }
            Command::Pipeline(PipelineCommand::List) => {
                self.send(self.http.get(format!("{}/v1/pipelines", self.base)))
                    .await
            }
            Command::Pipeline(PipelineCommand::Show { id }) => {
                self.send(self.http.get(format!("{}/v1/pipelines/{id}", self.base)))
                    .await
            }
            Command::Pipeline(PipelineCommand::Update {
                id,
                name,
                enabled,
                spec_file,
            }) => {
                let spec = spec_file.as_deref().map(load_spec).transpose()?;
                let body = update_body(name, enabled, spec);
                self.send(
                    self.http
                        .put(format!("{}/v1/pipelines/{id}", self.base))
                        .json(&body),
                )
                .await
            }
            Command::Pipeline(PipelineCommand::Delete { id }) => {
                self.send(self.http.delete(format!("{}/v1/pipelines/{id}", self.base)))
                    .await
            }
            Command::Assignment(AssignmentCommand::Create {
                agent,
                region,
                pipeline,
            }) => {
                let body = json!({
                    "agent_id": agent,
                    "region": region,
                    "pipeline_id": pipeline,
                });
                self.send(
                    self.http
                        .post(format!("{}/v1/assignments", self.base))
                        .json(&body),
                )
                .await
            }
            Command::Assignment(AssignmentCommand::List) => {
                self.send(self.http.get(format!("{}/v1/assignments", self.base)))
                    .await
            }
            Command::Assignment(AssignmentCommand::Delete { id }) => {
                self.send(
                    self.http
                        .delete(format!("{}/v1/assignments/{id}", self.base)),
                )
                .await
            }
            Command::Agent(AgentCommand::List) => {
                self.send(self.http.get(format!("{}/v1/agents", self.base)))
                    .await
            }
        }
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<Value>, CliError> {
        let response = request
            .send()
            .await
            .map_err(|e| CliError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CliError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(CliError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_str(&text).unwrap_or(Value::String(text)),
        ))
    }
}

/// Builds the PUT body for a pipeline update: omitted flags stay out of
/// the body entirely, leaving those fields unchanged on the server.
fn update_body(name: Option<String>, enabled: Option<bool>, spec: Option<PipelineSpec>) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(name) = name {
        let _ = body.insert("name".to_owned(), Value::String(name));
    }
    if let Some(enabled) = enabled {
        let _ = body.insert("enabled".to_owned(), Value::Bool(enabled));
    }
    if let Some(spec) = spec {
        if let Ok(spec) = serde_json::to_value(spec) {
            let _ = body.insert("spec".to_owned(), spec);
        }
    }
    Value::Object(body)
}

fn load_spec(path: &Path) -> Result<PipelineSpec, CliError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("cannot read {}: {e}", path.display())))?;
    serde_yaml::from_str(&contents)
        .map_err(|e| CliError::Input(format!("invalid spec {}: {e}", path.display())))
}
