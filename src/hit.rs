//! Hit-testing: what lies under a world-space point.
//!
//! Priority, highest first: ports, resize handles, ordinary node bodies,
//! frames (label strip, then body), edges. Within each tier the topmost
//! (last drawn) candidate wins, so when two edges overlap the most recently
//! added one is hit. Nodes hidden inside collapsed frames are skipped.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{EDGE_HIT_SLOP_PX, FRAME_LABEL_HEIGHT, PORT_RADIUS_PX, RESIZE_HANDLE_PX};
use crate::containment::{Visibility, visible_port_anchor};
use crate::doc::{EdgeId, GraphModel, NodeId, bounds};
use crate::registry::PortDirection;
use crate::render::{CURVE_SEGMENTS, edge_curve, sample_curve};

/// Which part of a node was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    Port { port_id: &'static str, direction: PortDirection },
    ResizeHandle,
    FrameLabel,
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    Node { node_id: NodeId, part: HitPart },
    Edge { edge_id: EdgeId },
}

/// Test which node part or edge (if any) is under `world_pt`.
#[must_use]
pub fn hit_test(world_pt: Point, graph: &GraphModel, camera: &Camera, visibility: &Visibility) -> Option<Hit> {
    let visible: Vec<_> = graph
        .nodes()
        .iter()
        .filter(|n| !visibility.is_hidden(&n.id))
        .collect();

    let port_radius = camera.screen_dist_to_world(PORT_RADIUS_PX);
    for node in visible.iter().rev() {
        for spec in node.variant().ports() {
            let Some(anchor) = graph.port_anchor(&node.id, spec.id) else {
                continue;
            };
            if anchor.distance(world_pt) <= port_radius {
                return Some(Hit::Node {
                    node_id: node.id.clone(),
                    part: HitPart::Port { port_id: spec.id, direction: spec.direction },
                });
            }
        }
    }

    let handle = camera.screen_dist_to_world(RESIZE_HANDLE_PX);
    for node in visible.iter().rev().filter(|n| n.variant().is_resizable()) {
        let rect = bounds(node);
        let dx = rect.right() - world_pt.x;
        let dy = rect.bottom() - world_pt.y;
        if (-handle * 0.5..=handle).contains(&dx) && (-handle * 0.5..=handle).contains(&dy) {
            return Some(Hit::Node { node_id: node.id.clone(), part: HitPart::ResizeHandle });
        }
    }

    for node in visible.iter().rev().filter(|n| !n.is_frame()) {
        if bounds(node).contains(world_pt) {
            return Some(Hit::Node { node_id: node.id.clone(), part: HitPart::Body });
        }
    }

    for frame in visible.iter().rev().filter(|n| n.is_frame()) {
        let rect = bounds(frame);
        if rect.contains(world_pt) {
            let part = if world_pt.y <= rect.y + FRAME_LABEL_HEIGHT {
                HitPart::FrameLabel
            } else {
                HitPart::Body
            };
            return Some(Hit::Node { node_id: frame.id.clone(), part });
        }
    }

    edge_at(world_pt, graph, camera, visibility).map(|edge_id| Hit::Edge { edge_id })
}

/// The topmost edge within hit slop of `world_pt`. Edges are tested against
/// the same sampled curve the scene draws.
#[must_use]
pub fn edge_at(world_pt: Point, graph: &GraphModel, camera: &Camera, visibility: &Visibility) -> Option<EdgeId> {
    let slop = camera.screen_dist_to_world(EDGE_HIT_SLOP_PX);
    graph
        .edges()
        .iter()
        .rev()
        .find(|edge| {
            let from = visible_port_anchor(graph, visibility, &edge.source_node_id, &edge.source_port_id);
            let to = visible_port_anchor(graph, visibility, &edge.target_node_id, &edge.target_port_id);
            match (from, to) {
                (Some(a), Some(b)) => distance_to_curve(world_pt, a, b) <= slop,
                _ => false,
            }
        })
        .map(|edge| edge.id.clone())
}

/// Shortest distance from `p` to the drawn curve between two port anchors.
#[must_use]
pub fn distance_to_curve(p: Point, from: Point, to: Point) -> f64 {
    sample_curve(&edge_curve(from, to), CURVE_SEGMENTS)
        .windows(2)
        .map(|seg| distance_to_segment(p, seg[0], seg[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Shortest distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b.sub(a);
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let ap = p.sub(a);
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.distance(a.add(ab.scale(t)))
}
