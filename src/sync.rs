//! Execution sync: the network half of the execution overlay.
//!
//! DESIGN
//! ======
//! Every call here is fetch-only. Results are handed back to the caller, which
//! merges them into the engine afterwards, so no engine borrow is ever held
//! across an await point.
//!
//! ERROR HANDLING
//! ==============
//! Backend failures are logged with `warn!` and surface as `None` / `false`.
//! The overlay keeps whatever it already had.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::api::WorkflowBackend;
use crate::overlay::NodeExecutionData;
use crate::triggers::TriggerKind;

pub struct ExecutionSync {
    backend: Arc<dyn WorkflowBackend>,
    workflow_id: String,
}

impl ExecutionSync {
    #[must_use]
    pub fn new(backend: Arc<dyn WorkflowBackend>, workflow_id: impl Into<String>) -> Self {
        Self { backend, workflow_id: workflow_id.into() }
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Per-node records of one execution.
    pub async fn fetch_history(&self, execution_id: &str) -> Option<Vec<NodeExecutionData>> {
        match self.backend.execution_nodes(&self.workflow_id, execution_id).await {
            Ok(records) => {
                debug!(%execution_id, records = records.len(), "execution history fetched");
                Some(records)
            }
            Err(e) => {
                warn!(workflow_id = %self.workflow_id, %execution_id, error = %e, "execution history fetch failed");
                None
            }
        }
    }

    /// Id and node records of the most recent execution. Summaries that
    /// arrive without embedded records are completed with a history fetch.
    pub async fn load_latest(&self) -> Option<(String, Vec<NodeExecutionData>)> {
        let summary = match self.backend.latest_execution(&self.workflow_id).await {
            Ok(Some(summary)) => summary,
            Ok(None) => {
                debug!(workflow_id = %self.workflow_id, "no previous execution");
                return None;
            }
            Err(e) => {
                warn!(workflow_id = %self.workflow_id, error = %e, "latest execution fetch failed");
                return None;
            }
        };
        if !summary.nodes.is_empty() {
            return Some((summary.id, summary.nodes));
        }
        let records = self.fetch_history(&summary.id).await.unwrap_or_default();
        Some((summary.id, records))
    }

    /// Ask the backend to re-run one node. Returns whether it accepted.
    pub async fn retry(&self, execution_id: &str, node_id: &str) -> bool {
        match self.backend.retry_node(&self.workflow_id, execution_id, node_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%execution_id, %node_id, error = %e, "node retry failed");
                false
            }
        }
    }

    /// Start a run through a chat or HTTP trigger. The outer `Option` is
    /// `None` on failure; the inner one is the execution id when the backend
    /// reported it.
    pub async fn trigger(&self, kind: TriggerKind, body: Value) -> Option<Option<String>> {
        match self.backend.trigger_workflow(&self.workflow_id, kind, body).await {
            Ok(execution_id) => Some(execution_id),
            Err(e) => {
                warn!(workflow_id = %self.workflow_id, kind = kind.as_str(), error = %e, "workflow trigger failed");
                None
            }
        }
    }
}
