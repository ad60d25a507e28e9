//! Trigger definitions and live trigger status.
//!
//! Persistent trigger nodes (bots, webhooks) hold a connection on the backend.
//! Their health is polled and cached here by the node id the status belongs
//! to. Each poll result replaces the previous status for that node wholesale.

#[cfg(test)]
#[path = "triggers_test.rs"]
mod triggers_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::doc::{GraphModel, Node, NodeId};

/// Connection state reported by the backend for a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Connecting,
    #[default]
    Disconnected,
    Error,
    #[serde(other)]
    Unknown,
}

/// Live status of one trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerStatus {
    pub trigger_id: String,
    #[serde(default)]
    pub connection_state: ConnectionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_received: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_dev_mode: Option<bool>,
}

/// A trigger registered for a workflow, linking a backend trigger id to its node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDef {
    pub id: String,
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// A node whose trigger status should be polled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollTarget {
    pub node_id: NodeId,
    pub trigger_id: String,
}

/// Persistent-trigger nodes to poll, resolving each node's trigger id from the
/// workflow's trigger definitions, then `configuration.triggerId`, then the node id.
#[must_use]
pub fn poll_targets(graph: &GraphModel, defs: &[TriggerDef]) -> Vec<PollTarget> {
    graph
        .nodes()
        .iter()
        .filter(|n| n.variant().is_persistent_trigger())
        .map(|n| PollTarget { node_id: n.id.clone(), trigger_id: trigger_id_for(n, defs) })
        .collect()
}

/// Backend trigger id of `node`: its definition's id, then
/// `configuration.triggerId`, then the node id itself.
#[must_use]
pub fn trigger_id_for(node: &Node, defs: &[TriggerDef]) -> String {
    defs.iter()
        .find(|d| d.node_id == node.id)
        .map(|d| d.id.clone())
        .or_else(|| node.config_str("triggerId").map(str::to_owned))
        .unwrap_or_else(|| node.id.clone())
}

/// Last-known trigger status per node id.
#[derive(Debug, Clone, Default)]
pub struct TriggerStatusCache {
    by_node: HashMap<NodeId, TriggerStatus>,
}

impl TriggerStatusCache {
    pub fn update(&mut self, node_id: NodeId, status: TriggerStatus) {
        self.by_node.insert(node_id, status);
    }

    #[must_use]
    pub fn get(&self, node_id: &str) -> Option<&TriggerStatus> {
        self.by_node.get(node_id)
    }

    /// Drop statuses for nodes that no longer exist.
    pub fn prune(&mut self, graph: &GraphModel) {
        self.by_node.retain(|node_id, _| graph.contains_node(node_id));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}

/// How a workflow run is started on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Chat,
    Http,
}

impl TriggerKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Http => "http",
        }
    }
}
