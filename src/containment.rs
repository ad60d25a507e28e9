//! Frame containment: which nodes a frame groups, and what a collapsed frame shows.
//!
//! Membership is never stored. Every query recomputes it from current node
//! positions, so a frame can never disagree with what is drawn inside it. A
//! node belongs to a frame when the centre of its bounding box lies inside the
//! frame's expanded rectangle; frames never contain other frames.

#[cfg(test)]
#[path = "containment_test.rs"]
mod containment_test;

use std::collections::HashMap;

use tracing::warn;

use crate::camera::Point;
use crate::doc::{ExecutionStatus, GraphModel, Node, NodeId, bounds, frame_bounds, side_anchor};
use crate::registry::{PortDirection, icon_for};

/// A member port re-exposed on a collapsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedPort {
    pub node_id: NodeId,
    pub port_id: &'static str,
    pub direction: PortDirection,
}

/// Summary of one member for the collapsed-frame preview strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePreview {
    pub node_id: NodeId,
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// The first `limit` member previews plus how many members were left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FramePreview {
    pub items: Vec<NodePreview>,
    pub overflow: usize,
}

/// Non-frame nodes whose bounding-box centre lies inside `frame`, in draw order.
#[must_use]
pub fn contained_nodes<'a>(graph: &'a GraphModel, frame: &Node) -> Vec<&'a Node> {
    let area = frame_bounds(frame);
    graph
        .nodes()
        .iter()
        .filter(|n| !n.is_frame() && area.contains(bounds(n).center()))
        .collect()
}

/// Union of every member's ports.
#[must_use]
pub fn aggregated_ports(graph: &GraphModel, frame: &Node) -> Vec<AggregatedPort> {
    contained_nodes(graph, frame)
        .into_iter()
        .flat_map(|member| {
            member.variant().ports().iter().map(|spec| AggregatedPort {
                node_id: member.id.clone(),
                port_id: spec.id,
                direction: spec.direction,
            })
        })
        .collect()
}

/// Collapse member statuses into one, by priority:
/// RUNNING, FAILED, PENDING (or WAITING), COMPLETED, IDLE.
#[must_use]
pub fn aggregated_status<I>(members: I) -> ExecutionStatus
where
    I: IntoIterator<Item = ExecutionStatus>,
{
    let mut failed = false;
    let mut pending = false;
    let mut completed = false;
    for status in members {
        match status {
            ExecutionStatus::Running => return ExecutionStatus::Running,
            ExecutionStatus::Failed => failed = true,
            ExecutionStatus::Pending | ExecutionStatus::Waiting => pending = true,
            ExecutionStatus::Completed => completed = true,
            ExecutionStatus::Idle => {}
        }
    }
    if failed {
        ExecutionStatus::Failed
    } else if pending {
        ExecutionStatus::Pending
    } else if completed {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::Idle
    }
}

/// Aggregated status of everything inside `frame`.
#[must_use]
pub fn frame_status(graph: &GraphModel, frame: &Node) -> ExecutionStatus {
    aggregated_status(contained_nodes(graph, frame).into_iter().map(|n| n.status))
}

/// Preview of the first `limit` members. Types without a registered icon get
/// an empty icon.
#[must_use]
pub fn contained_node_previews(graph: &GraphModel, frame: &Node, limit: usize) -> FramePreview {
    let members = contained_nodes(graph, frame);
    let overflow = members.len().saturating_sub(limit);
    let items = members
        .into_iter()
        .take(limit)
        .map(|member| {
            let icon = icon_for(&member.node_type).unwrap_or_else(|| {
                warn!(node_id = %member.id, node_type = %member.node_type, "no icon registered for node type");
                ""
            });
            NodePreview {
                node_id: member.id.clone(),
                name: member.display_name().to_owned(),
                icon: icon.to_owned(),
                color: member
                    .config_str("color")
                    .unwrap_or(member.variant().default_color())
                    .to_owned(),
            }
        })
        .collect();
    FramePreview { items, overflow }
}

/// Which nodes are hidden inside collapsed frames.
#[derive(Debug, Clone, Default)]
pub struct Visibility {
    owner: HashMap<NodeId, NodeId>,
}

impl Visibility {
    /// Compute from the current graph. A node inside several collapsed frames
    /// is owned by the topmost one.
    #[must_use]
    pub fn compute(graph: &GraphModel) -> Self {
        let mut owner = HashMap::new();
        for frame in graph.nodes().iter().filter(|n| n.is_collapsed_frame()) {
            for member in contained_nodes(graph, frame) {
                owner.insert(member.id.clone(), frame.id.clone());
            }
        }
        Self { owner }
    }

    #[must_use]
    pub fn is_hidden(&self, node_id: &str) -> bool {
        self.owner.contains_key(node_id)
    }

    /// The collapsed frame hiding `node_id`, if any.
    #[must_use]
    pub fn frame_of(&self, node_id: &str) -> Option<&str> {
        self.owner.get(node_id).map(String::as_str)
    }
}

/// World anchor of a port as drawn: the node's own port when visible,
/// otherwise the matching aggregated port on the collapsed frame hiding it.
#[must_use]
pub fn visible_port_anchor(graph: &GraphModel, visibility: &Visibility, node_id: &str, port_id: &str) -> Option<Point> {
    let Some(frame_id) = visibility.frame_of(node_id) else {
        return graph.port_anchor(node_id, port_id);
    };
    let frame = graph.node(frame_id)?;
    let direction = graph.port_direction(node_id, port_id)?;
    let same_side: Vec<AggregatedPort> = aggregated_ports(graph, frame)
        .into_iter()
        .filter(|p| p.direction == direction)
        .collect();
    let index = same_side
        .iter()
        .position(|p| p.node_id == node_id && p.port_id == port_id)?;
    Some(side_anchor(bounds(frame), direction, index, same_side.len()))
}
