//! Rendering model: a pure snapshot of what the host should draw.
//!
//! [`build_scene`] walks the engine state top-down and produces plain view
//! structs in draw order (frames, then edges, then nodes, then transient
//! overlays). It does not mutate anything; drawing the views is the host's
//! job. Collapsed frames hide their members, show a preview strip and an
//! aggregated status, and expose their members' ports so edges that cross
//! the frame boundary stay attached.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use crate::camera::{Point, Rect};
use crate::containment::{FramePreview, Visibility, aggregated_ports, contained_node_previews, frame_status, visible_port_anchor};
use crate::doc::{AgentActivity, EdgeId, ExecutionStatus, Node, NodeId, bounds};
use crate::engine::EngineCore;
use crate::input::InteractionState;
use crate::presence::RemotePresence;
use crate::registry::{PortDirection, icon_for};
use crate::triggers::TriggerStatus;

/// Minimum horizontal control-point offset of an edge curve, in world units.
const MIN_CURVE_OFFSET: f64 = 50.0;

/// Line segments used to approximate one edge curve.
pub(crate) const CURVE_SEGMENTS: usize = 16;

/// Label shown on frames without one.
const DEFAULT_FRAME_LABEL: &str = "Frame";

#[derive(Debug, Clone, PartialEq)]
pub struct PortView {
    pub node_id: NodeId,
    pub port_id: &'static str,
    pub direction: PortDirection,
    pub anchor: Point,
    /// The port a pending connection would attach to.
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeView {
    pub id: NodeId,
    pub node_type: String,
    pub rect: Rect,
    pub name: String,
    pub icon: Option<&'static str>,
    pub color: String,
    pub status: ExecutionStatus,
    pub agent_activity: Option<AgentActivity>,
    pub trigger: Option<TriggerStatus>,
    /// Note body, or the live draft while it is being edited.
    pub text: Option<String>,
    pub editing: bool,
    pub selected: bool,
    pub remote_selected: bool,
    pub remote_typing: bool,
    pub ports: Vec<PortView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    pub id: NodeId,
    pub rect: Rect,
    pub label: String,
    pub editing: bool,
    pub collapsed: bool,
    pub status: ExecutionStatus,
    /// Member previews; only for collapsed frames.
    pub preview: Option<FramePreview>,
    /// Member ports re-exposed on the frame; empty unless collapsed.
    pub ports: Vec<PortView>,
    pub selected: bool,
    pub remote_selected: bool,
    pub remote_typing: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeView {
    pub id: EdgeId,
    pub from: Point,
    pub to: Point,
    /// Polyline approximating the curve from `from` to `to`.
    pub points: Vec<Point>,
    pub label: Option<String>,
    pub selected: bool,
    pub hovered: bool,
}

/// The transient curve of a connection being dragged out of a port.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdge {
    pub from: Point,
    pub to: Point,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub frames: Vec<FrameView>,
    pub edges: Vec<EdgeView>,
    pub nodes: Vec<NodeView>,
    /// Marquee rectangle in world coordinates.
    pub marquee: Option<Rect>,
    pub pending_edge: Option<PendingEdge>,
}

/// Build the render model for the current engine state.
#[must_use]
pub fn build_scene(engine: &EngineCore, presence: &dyn RemotePresence) -> Scene {
    let graph = &engine.graph;
    let visibility = Visibility::compute(graph);
    let highlighted = match &engine.input {
        InteractionState::ConnectingEdge { hover: Some((node_id, port_id)), .. } => Some((node_id.as_str(), *port_id)),
        _ => None,
    };
    let editing = match &engine.input {
        InteractionState::EditingLabel { node_id, draft, .. } => Some((node_id.as_str(), draft.as_str())),
        _ => None,
    };

    let mut scene = Scene::default();
    for node in graph.nodes().iter().filter(|n| !visibility.is_hidden(&n.id)) {
        let draft = editing.filter(|(id, _)| *id == node.id).map(|(_, text)| text);
        let selected = engine.ui.selection.contains(&node.id);
        if node.is_frame() {
            scene.frames.push(frame_view(engine, node, &visibility, draft, selected, presence));
        } else {
            scene.nodes.push(node_view(engine, node, highlighted, draft, selected, presence));
        }
    }

    for edge in graph.edges() {
        let src_frame = visibility.frame_of(&edge.source_node_id);
        if src_frame.is_some() && src_frame == visibility.frame_of(&edge.target_node_id) {
            continue;
        }
        let from = visible_port_anchor(graph, &visibility, &edge.source_node_id, &edge.source_port_id);
        let to = visible_port_anchor(graph, &visibility, &edge.target_node_id, &edge.target_port_id);
        let (Some(from), Some(to)) = (from, to) else {
            continue;
        };
        scene.edges.push(EdgeView {
            id: edge.id.clone(),
            from,
            to,
            points: sample_curve(&edge_curve(from, to), CURVE_SEGMENTS),
            label: edge.label.clone(),
            selected: engine.ui.selected_edge.as_deref() == Some(edge.id.as_str()),
            hovered: engine.ui.hovered_edge.as_deref() == Some(edge.id.as_str()),
        });
    }

    match &engine.input {
        InteractionState::MarqueeSelecting { start_screen, current_screen } => {
            scene.marquee = Some(Rect::from_corners(
                engine.camera.screen_to_world(*start_screen),
                engine.camera.screen_to_world(*current_screen),
            ));
        }
        InteractionState::ConnectingEdge { node_id, port_id, direction, pointer_world, .. } => {
            if let Some(anchor) = visible_port_anchor(graph, &visibility, node_id, port_id) {
                let (from, to) = match direction {
                    PortDirection::Output => (anchor, *pointer_world),
                    PortDirection::Input => (*pointer_world, anchor),
                };
                scene.pending_edge =
                    Some(PendingEdge { from, to, points: sample_curve(&edge_curve(from, to), CURVE_SEGMENTS) });
            }
        }
        _ => {}
    }

    scene
}

fn node_view(
    engine: &EngineCore,
    node: &Node,
    highlighted: Option<(&str, &'static str)>,
    draft: Option<&str>,
    selected: bool,
    presence: &dyn RemotePresence,
) -> NodeView {
    let variant = node.variant();
    let rect = bounds(node);
    let ports = variant
        .ports()
        .iter()
        .filter_map(|spec| {
            let anchor = engine.graph.port_anchor(&node.id, spec.id)?;
            Some(PortView {
                node_id: node.id.clone(),
                port_id: spec.id,
                direction: spec.direction,
                anchor,
                highlighted: highlighted == Some((node.id.as_str(), spec.id)),
            })
        })
        .collect();
    let text = variant
        .editable_text_key()
        .map(|key| draft.or(node.config_str(key)).unwrap_or_default().to_owned());
    NodeView {
        id: node.id.clone(),
        node_type: node.node_type.clone(),
        rect,
        name: node.display_name().to_owned(),
        icon: icon_for(&node.node_type),
        color: node.config_str("color").unwrap_or(variant.default_color()).to_owned(),
        status: node.status,
        agent_activity: node.agent_activity.clone(),
        trigger: engine.triggers.get(&node.id).cloned(),
        text,
        editing: draft.is_some(),
        selected,
        remote_selected: presence.is_element_selected_by_remote(&node.id),
        remote_typing: presence.is_element_being_typed_by_remote(&node.id),
        ports,
    }
}

fn frame_view(
    engine: &EngineCore,
    frame: &Node,
    visibility: &Visibility,
    draft: Option<&str>,
    selected: bool,
    presence: &dyn RemotePresence,
) -> FrameView {
    let graph = &engine.graph;
    let collapsed = frame.is_collapsed_frame();
    let (preview, ports) = if collapsed {
        let ports = aggregated_ports(graph, frame)
            .into_iter()
            .filter_map(|p| {
                let anchor = visible_port_anchor(graph, visibility, &p.node_id, p.port_id)?;
                Some(PortView { node_id: p.node_id, port_id: p.port_id, direction: p.direction, anchor, highlighted: false })
            })
            .collect();
        (Some(contained_node_previews(graph, frame, engine.config.preview_limit)), ports)
    } else {
        (None, Vec::new())
    };
    FrameView {
        id: frame.id.clone(),
        rect: bounds(frame),
        label: draft
            .or(frame.config_str("frameLabel"))
            .unwrap_or(DEFAULT_FRAME_LABEL)
            .to_owned(),
        editing: draft.is_some(),
        collapsed,
        status: frame_status(graph, frame),
        preview,
        ports,
        selected,
        remote_selected: presence.is_element_selected_by_remote(&frame.id),
        remote_typing: presence.is_element_being_typed_by_remote(&frame.id),
    }
}

/// Cubic Bézier control points for an edge leaving `from` rightwards and
/// entering `to` from the left.
#[must_use]
pub fn edge_curve(from: Point, to: Point) -> [Point; 4] {
    let offset = ((to.x - from.x).abs() * 0.5).max(MIN_CURVE_OFFSET);
    [from, Point::new(from.x + offset, from.y), Point::new(to.x - offset, to.y), to]
}

/// Evaluate a cubic Bézier at `segments + 1` evenly spaced parameters.
#[must_use]
pub fn sample_curve(ctrl: &[Point; 4], segments: usize) -> Vec<Point> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / segments as f64;
            let u = 1.0 - t;
            let w = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
            Point::new(
                w[0] * ctrl[0].x + w[1] * ctrl[1].x + w[2] * ctrl[2].x + w[3] * ctrl[3].x,
                w[0] * ctrl[0].y + w[1] * ctrl[1].y + w[2] * ctrl[2].y + w[3] * ctrl[3].y,
            )
        })
        .collect()
}
