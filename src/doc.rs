//! Graph model: nodes, edges and frames, plus the in-memory store that owns them.
//!
//! This module defines the data that describes what is on the canvas (`Node`,
//! `Edge`, `ExecutionStatus`) and the `GraphModel` store that enforces the
//! referential-integrity rules. Node sizes are never stored; they are resolved
//! from the node type and its configuration overrides on every query, so the
//! node array stays the single source of truth for geometry.
//!
//! Data flows into this layer from the host (snapshot JSON), from the input
//! engine (drag, resize, connect, inline edit) and from the execution overlay
//! (status annotation only).

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::camera::{Point, Rect};
use crate::consts::{FRAME_COLLAPSED_HEIGHT, FRAME_COLLAPSED_WIDTH};
use crate::registry::{NodeVariant, PortDirection, Size};

/// Unique identifier for a node.
pub type NodeId = String;

/// Unique identifier for an edge.
pub type EdgeId = String;

/// Execution state of a node as shown on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Idle,
    Pending,
    Waiting,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// Parse a status string in any letter case. Returns `None` for unknown values.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "IDLE" => Some(Self::Idle),
            "PENDING" => Some(Self::Pending),
            "WAITING" => Some(Self::Waiting),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Canonical wire spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Pending => "PENDING",
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

pub(crate) fn lenient_status<'de, D>(deserializer: D) -> Result<ExecutionStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(ExecutionStatus::parse).unwrap_or_default())
}

/// What an agent node is currently doing (tool call, model call, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub kind: String,
    pub name: String,
    pub active: bool,
}

/// A node on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Open-ended type tag, resolved through [`NodeVariant::from_type`].
    #[serde(rename = "type")]
    pub node_type: String,
    /// Top-left corner in world coordinates.
    pub position: Point,
    /// Per-type settings; also holds size overrides and frame flags.
    #[serde(default)]
    pub configuration: Map<String, Value>,
    /// Execution status shown on the node.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: ExecutionStatus,
    /// Live agent activity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_activity: Option<AgentActivity>,
}

impl Node {
    /// A node with empty configuration and idle status.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>, position: Point) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            position,
            configuration: Map::new(),
            status: ExecutionStatus::Idle,
            agent_activity: None,
        }
    }

    #[must_use]
    pub fn variant(&self) -> NodeVariant {
        NodeVariant::from_type(&self.node_type)
    }

    #[must_use]
    pub fn config_f64(&self, key: &str) -> Option<f64> {
        self.configuration.get(key).and_then(Value::as_f64)
    }

    #[must_use]
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn config_bool(&self, key: &str) -> bool {
        self.configuration
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn is_frame(&self) -> bool {
        self.variant().is_frame()
    }

    #[must_use]
    pub fn is_collapsed_frame(&self) -> bool {
        self.is_frame() && self.config_bool("frameCollapsed")
    }

    /// Human-readable name: `configuration.name`, then `configuration.label`, then the type.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.config_str("name")
            .or_else(|| self.config_str("label"))
            .unwrap_or(&self.node_type)
    }

    /// Direction of `port_id` on this node, if the port exists.
    #[must_use]
    pub fn port_direction(&self, port_id: &str) -> Option<PortDirection> {
        self.variant()
            .ports()
            .iter()
            .find(|p| p.id == port_id)
            .map(|p| p.direction)
    }
}

/// A directed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_port_id: String,
    pub target_node_id: NodeId,
    pub target_port_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Edge {
    fn same_tuple(&self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> bool {
        self.source_node_id == src && self.source_port_id == src_port && self.target_node_id == dst && self.target_port_id == dst_port
    }

    /// Whether either endpoint is attached to `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }
}

/// Error returned by graph mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// An endpoint names a node or port that does not exist, or a port of the wrong direction.
    #[error("invalid reference: node {node_id} port {port_id}")]
    InvalidReference { node_id: NodeId, port_id: String },
    /// An edge with the same endpoints already exists.
    #[error("duplicate edge {source_node_id}:{source_port_id} -> {target_node_id}:{target_port_id}")]
    DuplicateEdge {
        source_node_id: NodeId,
        source_port_id: String,
        target_node_id: NodeId,
        target_port_id: String,
    },
    /// The node does not exist.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
}

/// Canonicalize `status` strings on raw node JSON. Unknown statuses and
/// values that are not objects are left untouched.
pub fn normalize_nodes(values: &mut [Value]) {
    for value in values.iter_mut() {
        let Some(obj) = value.as_object_mut() else {
            continue;
        };
        let Some(canonical) = obj
            .get("status")
            .and_then(Value::as_str)
            .and_then(ExecutionStatus::parse)
        else {
            continue;
        };
        obj.insert("status".into(), Value::String(canonical.as_str().into()));
    }
}

/// Round both axes to the nearest multiple of `step`. Non-positive steps disable snapping.
#[must_use]
pub fn snap_to_grid(point: Point, step: f64) -> Point {
    if !(step.is_finite() && step > 0.0) {
        return point;
    }
    Point::new((point.x / step).round() * step, (point.y / step).round() * step)
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|n| n.is_finite() && *n > 0.0)
}

/// Resolve the rendered size of a node from its type and configuration.
#[must_use]
pub fn resolve_dimensions(node: &Node) -> Size {
    let variant = node.variant();
    if node.is_collapsed_frame() {
        return Size::new(FRAME_COLLAPSED_WIDTH, FRAME_COLLAPSED_HEIGHT);
    }
    let base = variant.default_size();
    let Some((w_key, h_key)) = variant.size_keys() else {
        return base;
    };
    let size = Size::new(
        positive(node.config_f64(w_key)).unwrap_or(base.width),
        positive(node.config_f64(h_key)).unwrap_or(base.height),
    );
    match variant.min_size() {
        Some(min) => size.max(min),
        None => size,
    }
}

/// World-space bounding box of a node as drawn.
#[must_use]
pub fn bounds(node: &Node) -> Rect {
    let size = resolve_dimensions(node);
    Rect::new(node.position.x, node.position.y, size.width, size.height)
}

/// Expanded bounds of a frame, regardless of its collapse flag. Containment
/// is always measured against these.
#[must_use]
pub fn frame_bounds(frame: &Node) -> Rect {
    let base = NodeVariant::Frame.default_size();
    Rect::new(
        frame.position.x,
        frame.position.y,
        positive(frame.config_f64("frameWidth")).unwrap_or(base.width),
        positive(frame.config_f64("frameHeight")).unwrap_or(base.height),
    )
}

/// In-memory store of the workflow graph.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole graph from host-supplied JSON nodes and edges.
    ///
    /// Nodes that fail to deserialize and edges that fail referential
    /// integrity are logged and dropped.
    pub fn load_snapshot(&mut self, mut nodes: Vec<Value>, edges: Vec<Edge>) {
        normalize_nodes(&mut nodes);
        self.nodes.clear();
        self.edges.clear();
        for raw in nodes {
            match serde_json::from_value::<Node>(raw) {
                Ok(node) => self.add_node(node),
                Err(e) => warn!(error = %e, "skipping malformed node in snapshot"),
            }
        }
        for edge in edges {
            match self.validate_edge(&edge.source_node_id, &edge.source_port_id, &edge.target_node_id, &edge.target_port_id) {
                Ok(()) => self.edges.push(edge),
                Err(e) => warn!(edge_id = %edge.id, error = %e, "skipping invalid edge in snapshot"),
            }
        }
    }

    /// Nodes in insertion (draw) order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Insert a node, replacing any existing node with the same id in place.
    pub fn add_node(&mut self, node: Node) {
        if let Some(existing) = self.node_mut(&node.id) {
            *existing = node;
        } else {
            self.nodes.push(node);
        }
    }

    /// Remove a node and every edge attached to it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| !e.touches(id));
        Some(self.nodes.remove(idx))
    }

    /// Set a node's world position. Returns false if the node doesn't exist.
    pub fn move_node(&mut self, id: &str, position: Point) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.position = position;
        true
    }

    /// Merge `patch` into a node's configuration. `null` values delete keys.
    /// Returns false if the node doesn't exist.
    pub fn configure_node(&mut self, id: &str, patch: &Map<String, Value>) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        for (k, v) in patch {
            if v.is_null() {
                node.configuration.remove(k);
            } else {
                node.configuration.insert(k.clone(), v.clone());
            }
        }
        true
    }

    /// Direction of a port on a node, if both exist.
    #[must_use]
    pub fn port_direction(&self, node_id: &str, port_id: &str) -> Option<PortDirection> {
        self.node(node_id)?.port_direction(port_id)
    }

    #[must_use]
    pub fn has_edge(&self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> bool {
        self.edges.iter().any(|e| e.same_tuple(src, src_port, dst, dst_port))
    }

    fn validate_edge(&self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> Result<(), GraphError> {
        if self.port_direction(src, src_port) != Some(PortDirection::Output) {
            return Err(GraphError::InvalidReference { node_id: src.into(), port_id: src_port.into() });
        }
        if self.port_direction(dst, dst_port) != Some(PortDirection::Input) {
            return Err(GraphError::InvalidReference { node_id: dst.into(), port_id: dst_port.into() });
        }
        if self.has_edge(src, src_port, dst, dst_port) {
            return Err(GraphError::DuplicateEdge {
                source_node_id: src.into(),
                source_port_id: src_port.into(),
                target_node_id: dst.into(),
                target_port_id: dst_port.into(),
            });
        }
        Ok(())
    }

    /// Connect an output port to an input port.
    ///
    /// # Errors
    ///
    /// [`GraphError::InvalidReference`] if a node or port is missing or the
    /// directions don't match, [`GraphError::DuplicateEdge`] if the same tuple
    /// already exists. The edge list is unchanged on error.
    pub fn add_edge(&mut self, src: &str, src_port: &str, dst: &str, dst_port: &str) -> Result<Edge, GraphError> {
        self.validate_edge(src, src_port, dst, dst_port)?;
        let edge = Edge {
            id: Uuid::new_v4().to_string(),
            source_node_id: src.into(),
            source_port_id: src_port.into(),
            target_node_id: dst.into(),
            target_port_id: dst_port.into(),
            label: None,
        };
        debug!(edge_id = %edge.id, "edge added");
        self.edges.push(edge.clone());
        Ok(edge)
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(idx))
    }

    /// World-space anchor of a port: inputs on the left edge, outputs on the
    /// right, spread evenly over the node height.
    #[must_use]
    pub fn port_anchor(&self, node_id: &str, port_id: &str) -> Option<Point> {
        let node = self.node(node_id)?;
        let direction = node.port_direction(port_id)?;
        let same_side: Vec<&str> = node
            .variant()
            .ports()
            .iter()
            .filter(|p| p.direction == direction)
            .map(|p| p.id)
            .collect();
        let index = same_side.iter().position(|id| *id == port_id)?;
        Some(side_anchor(bounds(node), direction, index, same_side.len()))
    }

    /// Ids of nodes whose bounding box intersects `rect`, in draw order.
    #[must_use]
    pub fn nodes_intersecting(&self, rect: &Rect) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| bounds(n).intersects(rect))
            .map(|n| n.id.clone())
            .collect()
    }

    /// Whether any node holds a live external trigger connection.
    #[must_use]
    pub fn has_persistent_trigger(&self) -> bool {
        self.nodes.iter().any(|n| n.variant().is_persistent_trigger())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Anchor `index` of `count` ports on one side of `rect`.
#[must_use]
pub fn side_anchor(rect: Rect, direction: PortDirection, index: usize, count: usize) -> Point {
    #[allow(clippy::cast_precision_loss)]
    let fraction = (index + 1) as f64 / (count + 1) as f64;
    let x = match direction {
        PortDirection::Input => rect.x,
        PortDirection::Output => rect.right(),
    };
    Point::new(x, rect.y + rect.height * fraction)
}
