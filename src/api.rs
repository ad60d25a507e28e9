//! Workflow REST client.
//!
//! [`WorkflowBackend`] is the seam the session and poller talk to;
//! [`HttpBackend`] is the reqwest implementation. Response bodies are decoded
//! in small pure functions so they can be tested without a server.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::doc::{ExecutionStatus, lenient_status};
use crate::overlay::NodeExecutionData;
use crate::triggers::{TriggerDef, TriggerKind, TriggerStatus};

/// Response header carrying the id of an execution started on demand.
pub const EXECUTION_ID_HEADER: &str = "x-execution-id";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// The backend returned a non-success HTTP status.
    #[error("unexpected response status {status}")]
    Status { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Summary of a workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ExecutionStatus,
    /// Per-node records, when the backend embeds them.
    #[serde(default, alias = "nodeExecutions")]
    pub nodes: Vec<NodeExecutionData>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeList {
    Bare(Vec<NodeExecutionData>),
    Wrapped {
        #[serde(alias = "nodeExecutions")]
        nodes: Vec<NodeExecutionData>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LatestExecution {
    Bare(ExecutionSummary),
    Wrapped { execution: Option<ExecutionSummary> },
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// The REST surface the canvas consumes.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// `GET /workflows/{id}/trigger-defs`
    async fn trigger_defs(&self, workflow_id: &str) -> Result<Vec<TriggerDef>, ApiError>;

    /// `GET /triggers/{id}/status`
    async fn trigger_status(&self, trigger_id: &str) -> Result<TriggerStatus, ApiError>;

    /// `POST /triggers/{id}/activate` or `/deactivate`
    async fn set_trigger_active(&self, trigger_id: &str, active: bool) -> Result<(), ApiError>;

    /// `POST` or `DELETE /triggers/{id}/dev-mode`
    async fn set_dev_mode(&self, trigger_id: &str, enabled: bool) -> Result<(), ApiError>;

    /// Node records of one execution.
    async fn execution_nodes(&self, workflow_id: &str, execution_id: &str) -> Result<Vec<NodeExecutionData>, ApiError>;

    /// The most recent execution, or `None` if the workflow never ran.
    async fn latest_execution(&self, workflow_id: &str) -> Result<Option<ExecutionSummary>, ApiError>;

    /// Start a run. Returns the new execution id when the backend reports one.
    async fn trigger_workflow(&self, workflow_id: &str, kind: TriggerKind, body: Value) -> Result<Option<String>, ApiError>;

    /// Re-run a single node of an execution.
    async fn retry_node(&self, workflow_id: &str, execution_id: &str, node_id: &str) -> Result<(), ApiError>;
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

struct Reply {
    status: u16,
    body: String,
    execution_id: Option<String>,
}

impl Reply {
    fn into_success(self) -> Result<Self, ApiError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(ApiError::Status { status: self.status, body: self.body })
        }
    }
}

pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// # Errors
    ///
    /// [`ApiError::ClientBuild`] if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_string() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Reply, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let execution_id = response
            .headers()
            .get(EXECUTION_ID_HEADER)
            .and_then(|v| match v.to_str() {
                Ok("") => None,
                Ok(s) => Some(s.to_owned()),
                Err(e) => {
                    warn!(error = %e, "unreadable execution id header");
                    None
                }
            });
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Ok(Reply { status, body, execution_id })
    }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
    async fn trigger_defs(&self, workflow_id: &str) -> Result<Vec<TriggerDef>, ApiError> {
        let reply = self
            .send(self.http.get(self.url(&format!("/workflows/{workflow_id}/trigger-defs"))))
            .await?
            .into_success()?;
        parse_json(&reply.body)
    }

    async fn trigger_status(&self, trigger_id: &str) -> Result<TriggerStatus, ApiError> {
        let reply = self
            .send(self.http.get(self.url(&format!("/triggers/{trigger_id}/status"))))
            .await?
            .into_success()?;
        parse_json(&reply.body)
    }

    async fn set_trigger_active(&self, trigger_id: &str, active: bool) -> Result<(), ApiError> {
        let action = if active { "activate" } else { "deactivate" };
        self.send(self.http.post(self.url(&format!("/triggers/{trigger_id}/{action}"))))
            .await?
            .into_success()?;
        Ok(())
    }

    async fn set_dev_mode(&self, trigger_id: &str, enabled: bool) -> Result<(), ApiError> {
        let url = self.url(&format!("/triggers/{trigger_id}/dev-mode"));
        let request = if enabled { self.http.post(url) } else { self.http.delete(url) };
        self.send(request).await?.into_success()?;
        Ok(())
    }

    async fn execution_nodes(&self, workflow_id: &str, execution_id: &str) -> Result<Vec<NodeExecutionData>, ApiError> {
        let scoped = self.url(&format!("/workflows/{workflow_id}/executions/{execution_id}/nodes"));
        let mut reply = self.send(self.http.get(scoped)).await?;
        if reply.status == 404 {
            debug!(execution_id, "scoped execution nodes not found, trying global route");
            reply = self
                .send(self.http.get(self.url(&format!("/executions/{execution_id}/nodes"))))
                .await?;
        }
        parse_execution_nodes(&reply.into_success()?.body)
    }

    async fn latest_execution(&self, workflow_id: &str) -> Result<Option<ExecutionSummary>, ApiError> {
        let reply = self
            .send(self.http.get(self.url(&format!("/workflows/{workflow_id}/latest-execution"))))
            .await?;
        if reply.status == 404 {
            return Ok(None);
        }
        parse_latest_execution(&reply.into_success()?.body)
    }

    async fn trigger_workflow(&self, workflow_id: &str, kind: TriggerKind, body: Value) -> Result<Option<String>, ApiError> {
        let url = self.url(&format!("/workflows/{workflow_id}/trigger/{}", kind.as_str()));
        let reply = self.send(self.http.post(url).json(&body)).await?.into_success()?;
        Ok(reply.execution_id)
    }

    async fn retry_node(&self, workflow_id: &str, execution_id: &str, node_id: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("/workflows/{workflow_id}/executions/{execution_id}/nodes/{node_id}/retry"));
        self.send(self.http.post(url)).await?.into_success()?;
        Ok(())
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_json<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Decode an execution-nodes body: a bare array or `{"nodes": [...]}`.
fn parse_execution_nodes(body: &str) -> Result<Vec<NodeExecutionData>, ApiError> {
    Ok(match parse_json::<NodeList>(body)? {
        NodeList::Bare(nodes) | NodeList::Wrapped { nodes } => nodes,
    })
}

/// Decode a latest-execution body. Empty bodies and `null` mean no execution.
fn parse_latest_execution(body: &str) -> Result<Option<ExecutionSummary>, ApiError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    Ok(match parse_json::<LatestExecution>(trimmed)? {
        LatestExecution::Wrapped { execution } => execution,
        LatestExecution::Bare(summary) => Some(summary),
    })
}
