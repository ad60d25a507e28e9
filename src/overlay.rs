//! Execution overlay: per-node execution state layered onto the graph.
//!
//! DESIGN
//! ======
//! Three sources report node status: live socket events, REST history for a
//! past execution, and manual retries. They all land in one cache keyed by
//! node id, and each source has its own merge function so precedence is
//! decided in one place:
//!
//! - live events always overwrite and mark the entry as live
//! - history only fills nodes that have no live entry
//! - retries never touch the cache (the resulting live events do)
//!
//! The cache belongs to exactly one execution. Only `execution:started` or an
//! explicit switch changes the active execution id, and a change clears it.
//! Node events for any other execution are dropped. Topology is never changed here; `annotate` only writes
//! `status` and `agent_activity` onto existing nodes.

#[cfg(test)]
#[path = "overlay_test.rs"]
mod overlay_test;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::doc::{AgentActivity, ExecutionStatus, GraphModel, NodeId, lenient_status};

// =============================================================================
// PAYLOADS
// =============================================================================

/// Parse a payload that may arrive as a JSON-encoded string. Strings that are
/// not valid JSON are kept as-is.
#[must_use]
pub fn parse_payload(raw: Value) -> Value {
    let Value::String(text) = &raw else {
        return raw;
    };
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "payload kept as raw string");
            raw
        }
    }
}

fn payload<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.filter(|v| !v.is_null()).map(parse_payload))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_from(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => match s.trim().parse::<u64>() {
            Ok(n) => Some(n),
            Err(e) => {
                debug!(value = %s, error = %e, "unparseable duration dropped");
                None
            }
        },
        _ => None,
    }
}

fn lenient_duration<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(duration_from))
}

/// Execution record for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionData {
    #[serde(default)]
    pub id: String,
    pub node_id: NodeId,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ExecutionStatus,
    #[serde(default, deserialize_with = "payload", skip_serializing_if = "Option::is_none")]
    pub input_data: Option<Value>,
    #[serde(default, deserialize_with = "payload", skip_serializing_if = "Option::is_none")]
    pub output_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

// =============================================================================
// SOCKET EVENTS
// =============================================================================

/// A live execution event pushed over the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    ExecutionStarted {
        execution_id: String,
    },
    NodeStarted {
        execution_id: Option<String>,
        node_id: NodeId,
        started_at: Option<String>,
        input_data: Option<Value>,
    },
    NodeCompleted {
        execution_id: Option<String>,
        node_id: NodeId,
        output_data: Option<Value>,
        completed_at: Option<String>,
        duration_ms: Option<u64>,
    },
    NodeFailed {
        execution_id: Option<String>,
        node_id: NodeId,
        error_message: Option<String>,
        completed_at: Option<String>,
        duration_ms: Option<u64>,
    },
    NodeWaiting {
        execution_id: Option<String>,
        node_id: NodeId,
    },
    AgentActivity {
        execution_id: Option<String>,
        node_id: NodeId,
        activity: AgentActivity,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecutionStartedWire {
    execution_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEventWire {
    #[serde(default)]
    execution_id: Option<String>,
    node_id: NodeId,
    #[serde(default)]
    started_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
    #[serde(default, alias = "input", deserialize_with = "payload")]
    input_data: Option<Value>,
    #[serde(default, alias = "output", deserialize_with = "payload")]
    output_data: Option<Value>,
    #[serde(default, alias = "error")]
    error_message: Option<String>,
    #[serde(default, alias = "duration", deserialize_with = "lenient_duration")]
    duration_ms: Option<u64>,
    #[serde(default, alias = "activityType")]
    kind: Option<String>,
    #[serde(default, alias = "toolName")]
    name: Option<String>,
    #[serde(default)]
    active: Option<bool>,
}

impl SocketEvent {
    /// Decode a named socket event. Unknown names and malformed payloads
    /// yield `None`.
    #[must_use]
    pub fn parse(name: &str, data: &Value) -> Option<Self> {
        if name == "execution:started" {
            return match serde_json::from_value::<ExecutionStartedWire>(data.clone()) {
                Ok(w) => Some(Self::ExecutionStarted { execution_id: w.execution_id }),
                Err(e) => {
                    warn!(event = name, error = %e, "malformed socket event");
                    None
                }
            };
        }
        if !matches!(
            name,
            "execution:node-started"
                | "execution:node-completed"
                | "execution:node-failed"
                | "execution:node-waiting"
                | "execution:agent-activity"
        ) {
            debug!(event = name, "ignoring socket event");
            return None;
        }
        let w = match serde_json::from_value::<NodeEventWire>(data.clone()) {
            Ok(w) => w,
            Err(e) => {
                warn!(event = name, error = %e, "malformed socket event");
                return None;
            }
        };
        let event = match name {
            "execution:node-started" => Self::NodeStarted {
                execution_id: w.execution_id,
                node_id: w.node_id,
                started_at: w.started_at,
                input_data: w.input_data,
            },
            "execution:node-completed" => Self::NodeCompleted {
                execution_id: w.execution_id,
                node_id: w.node_id,
                output_data: w.output_data,
                completed_at: w.completed_at,
                duration_ms: w.duration_ms,
            },
            "execution:node-failed" => Self::NodeFailed {
                execution_id: w.execution_id,
                node_id: w.node_id,
                error_message: w.error_message,
                completed_at: w.completed_at,
                duration_ms: w.duration_ms,
            },
            "execution:node-waiting" => Self::NodeWaiting { execution_id: w.execution_id, node_id: w.node_id },
            _ => Self::AgentActivity {
                execution_id: w.execution_id,
                node_id: w.node_id,
                activity: AgentActivity {
                    kind: w.kind.unwrap_or_default(),
                    name: w.name.unwrap_or_default(),
                    active: w.active.unwrap_or(true),
                },
            },
        };
        Some(event)
    }

    /// Execution id carried by the event, if any.
    #[must_use]
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            Self::ExecutionStarted { execution_id } => Some(execution_id),
            Self::NodeStarted { execution_id, .. }
            | Self::NodeCompleted { execution_id, .. }
            | Self::NodeFailed { execution_id, .. }
            | Self::NodeWaiting { execution_id, .. }
            | Self::AgentActivity { execution_id, .. } => execution_id.as_deref(),
        }
    }
}

// =============================================================================
// OVERLAY CACHE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Live,
    History,
}

#[derive(Debug, Clone)]
struct Entry {
    data: NodeExecutionData,
    source: Source,
}

/// Node execution state for the active execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOverlay {
    active_execution_id: Option<String>,
    entries: HashMap<NodeId, Entry>,
    activity: HashMap<NodeId, AgentActivity>,
}

impl ExecutionOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_execution_id(&self) -> Option<&str> {
        self.active_execution_id.as_deref()
    }

    /// Switch the active execution. The cache is cleared when the id changes.
    /// Returns `true` if it changed.
    pub fn set_active_execution(&mut self, execution_id: Option<String>) -> bool {
        if self.active_execution_id == execution_id {
            return false;
        }
        info!(execution_id = ?execution_id, "active execution changed");
        self.active_execution_id = execution_id;
        self.entries.clear();
        self.activity.clear();
        true
    }

    fn live_entry(&mut self, node_id: &str) -> &mut NodeExecutionData {
        let entry = self.entries.entry(node_id.to_owned()).or_insert_with(|| Entry {
            data: NodeExecutionData { node_id: node_id.to_owned(), ..NodeExecutionData::default() },
            source: Source::Live,
        });
        entry.source = Source::Live;
        &mut entry.data
    }

    /// Merge a live socket event. Returns `true` if the overlay changed.
    ///
    /// Only `execution:started` switches the active execution. A node event
    /// is adopted when no execution is active and dropped when it names a
    /// different one.
    pub fn apply_event(&mut self, event: SocketEvent) -> bool {
        let mut changed = false;
        if let SocketEvent::ExecutionStarted { execution_id } = &event {
            return self.set_active_execution(Some(execution_id.clone()));
        }
        if let Some(execution_id) = event.execution_id() {
            match self.active_execution_id.as_deref() {
                None => changed = self.set_active_execution(Some(execution_id.to_owned())),
                Some(active) if active != execution_id => {
                    debug!(execution_id, active, "ignoring event for inactive execution");
                    return false;
                }
                Some(_) => {}
            }
        }

        match event {
            SocketEvent::ExecutionStarted { .. } => {}
            SocketEvent::NodeStarted { node_id, started_at, input_data, .. } => {
                let data = self.live_entry(&node_id);
                data.status = ExecutionStatus::Running;
                if started_at.is_some() {
                    data.started_at = started_at;
                }
                if input_data.is_some() {
                    data.input_data = input_data;
                }
                data.output_data = None;
                data.error_message = None;
                data.completed_at = None;
                data.duration_ms = None;
                changed = true;
            }
            SocketEvent::NodeCompleted { node_id, output_data, completed_at, duration_ms, .. } => {
                let data = self.live_entry(&node_id);
                data.status = ExecutionStatus::Completed;
                data.output_data = output_data;
                data.error_message = None;
                data.completed_at = completed_at;
                data.duration_ms = duration_ms;
                self.activity.remove(&node_id);
                changed = true;
            }
            SocketEvent::NodeFailed { node_id, error_message, completed_at, duration_ms, .. } => {
                let data = self.live_entry(&node_id);
                data.status = ExecutionStatus::Failed;
                data.error_message = error_message;
                data.completed_at = completed_at;
                data.duration_ms = duration_ms;
                self.activity.remove(&node_id);
                changed = true;
            }
            SocketEvent::NodeWaiting { node_id, .. } => {
                self.live_entry(&node_id).status = ExecutionStatus::Waiting;
                changed = true;
            }
            SocketEvent::AgentActivity { node_id, activity, .. } => {
                if activity.active {
                    self.activity.insert(node_id, activity);
                } else {
                    self.activity.remove(&node_id);
                }
                changed = true;
            }
        }
        changed
    }

    /// Merge fetched history for `execution_id`. Records for nodes with live
    /// status are skipped, as is the whole batch if it belongs to a different
    /// execution. Returns how many records were merged.
    pub fn merge_history(&mut self, execution_id: &str, records: Vec<NodeExecutionData>) -> usize {
        if self.active_execution_id.as_deref() != Some(execution_id) {
            debug!(execution_id, active = ?self.active_execution_id, "discarding history for inactive execution");
            return 0;
        }
        let mut merged = 0;
        for record in records {
            if self.has_live_status(&record.node_id) {
                continue;
            }
            self.entries.insert(record.node_id.clone(), Entry { data: record, source: Source::History });
            merged += 1;
        }
        debug!(execution_id, merged, "history merged");
        merged
    }

    /// Whether a live event has been received for `node_id` in the active execution.
    #[must_use]
    pub fn has_live_status(&self, node_id: &str) -> bool {
        self.entries.get(node_id).is_some_and(|e| e.source == Source::Live)
    }

    #[must_use]
    pub fn status(&self, node_id: &str) -> Option<ExecutionStatus> {
        self.entries.get(node_id).map(|e| e.data.status)
    }

    #[must_use]
    pub fn data(&self, node_id: &str) -> Option<&NodeExecutionData> {
        self.entries.get(node_id).map(|e| &e.data)
    }

    #[must_use]
    pub fn activity(&self, node_id: &str) -> Option<&AgentActivity> {
        self.activity.get(node_id)
    }

    /// Write cached status and agent activity onto the graph's nodes.
    ///
    /// With no active execution the nodes keep whatever status they were
    /// loaded with. Otherwise nodes without an entry are reset to IDLE.
    pub fn annotate(&self, graph: &mut GraphModel) {
        if self.active_execution_id.is_none() {
            return;
        }
        for node in graph.nodes_mut() {
            node.status = self.status(&node.id).unwrap_or_default();
            node.agent_activity = self.activity.get(&node.id).cloned();
        }
    }

    /// Reset every node to IDLE with no agent activity.
    pub fn reset(graph: &mut GraphModel) {
        for node in graph.nodes_mut() {
            node.status = ExecutionStatus::Idle;
            node.agent_activity = None;
        }
    }
}
