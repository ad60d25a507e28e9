#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn node_at(id: &str, ty: &str, x: f64, y: f64) -> Node {
    Node::new(id, ty, Point::new(x, y))
}

fn two_node_graph() -> GraphModel {
    let mut g = GraphModel::new();
    g.add_node(node_at("a", "http-request", 0.0, 0.0));
    g.add_node(node_at("b", "code", 400.0, 0.0));
    g
}

// =============================================================
// ExecutionStatus
// =============================================================

#[test]
fn status_parse_any_case() {
    assert_eq!(ExecutionStatus::parse("running"), Some(ExecutionStatus::Running));
    assert_eq!(ExecutionStatus::parse("Completed"), Some(ExecutionStatus::Completed));
    assert_eq!(ExecutionStatus::parse(" FAILED "), Some(ExecutionStatus::Failed));
    assert_eq!(ExecutionStatus::parse("exploded"), None);
}

#[test]
fn status_serializes_canonical() {
    assert_eq!(serde_json::to_string(&ExecutionStatus::Waiting).unwrap(), "\"WAITING\"");
    for s in [ExecutionStatus::Idle, ExecutionStatus::Pending, ExecutionStatus::Failed] {
        assert_eq!(ExecutionStatus::parse(s.as_str()), Some(s));
    }
}

// =============================================================
// normalize_nodes
// =============================================================

#[test]
fn normalize_canonicalizes_status_case() {
    let mut values = vec![json!({"id": "a", "status": "running"}), json!({"id": "b", "status": "Completed"})];
    normalize_nodes(&mut values);
    assert_eq!(values[0]["status"], "RUNNING");
    assert_eq!(values[1]["status"], "COMPLETED");
}

#[test]
fn normalize_leaves_unknown_untouched() {
    let mut values = vec![json!({"id": "a", "status": "weird"}), json!({"id": "b"}), json!("not an object")];
    let before = values.clone();
    normalize_nodes(&mut values);
    assert_eq!(values, before);
}

#[test]
fn node_deserializes_unknown_status_as_idle() {
    let node: Node = serde_json::from_value(json!({
        "id": "a", "type": "code", "position": {"x": 1.0, "y": 2.0}, "status": "weird"
    }))
    .unwrap();
    assert_eq!(node.status, ExecutionStatus::Idle);
    assert!(node.configuration.is_empty());
}

// =============================================================
// resolve_dimensions
// =============================================================

#[test]
fn dimensions_default_for_ordinary_nodes() {
    let n = node_at("a", "code", 0.0, 0.0);
    assert_eq!(resolve_dimensions(&n), NodeVariant::Standard.default_size());
}

#[test]
fn dimensions_table_honors_overrides() {
    let mut n = node_at("t", "table", 0.0, 0.0);
    n.configuration.insert("tableWidth".into(), json!(500.0));
    n.configuration.insert("tableHeight".into(), json!(260.0));
    assert_eq!(resolve_dimensions(&n), Size::new(500.0, 260.0));
}

#[test]
fn dimensions_table_enforces_minimum() {
    let mut n = node_at("t", "table", 0.0, 0.0);
    n.configuration.insert("tableWidth".into(), json!(10.0));
    n.configuration.insert("tableHeight".into(), json!(-4.0));
    let size = resolve_dimensions(&n);
    let min = NodeVariant::Table.min_size().unwrap();
    assert_eq!(size.width, min.width);
    assert_eq!(size.height, NodeVariant::Table.default_size().height);
}

#[test]
fn dimensions_note_has_distinct_default() {
    let n = node_at("n", "note", 0.0, 0.0);
    assert_eq!(resolve_dimensions(&n), NodeVariant::Note.default_size());
}

#[test]
fn dimensions_collapsed_frame_shrinks_but_frame_bounds_do_not() {
    let mut f = node_at("f", "frame", 10.0, 10.0);
    f.configuration.insert("frameWidth".into(), json!(800.0));
    f.configuration.insert("frameCollapsed".into(), json!(true));
    assert_eq!(resolve_dimensions(&f), Size::new(FRAME_COLLAPSED_WIDTH, FRAME_COLLAPSED_HEIGHT));
    assert_eq!(frame_bounds(&f).width, 800.0);
}

// =============================================================
// add_edge
// =============================================================

#[test]
fn add_edge_success() {
    let mut g = two_node_graph();
    let edge = g.add_edge("a", "output", "b", "input").unwrap();
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.edges()[0], edge);
    assert!(!edge.id.is_empty());
}

#[test]
fn add_edge_missing_port_leaves_edges_unchanged() {
    let mut g = two_node_graph();
    let err = g.add_edge("a", "nope", "b", "input").unwrap_err();
    assert!(matches!(err, GraphError::InvalidReference { .. }));
    assert!(g.edges().is_empty());
}

#[test]
fn add_edge_missing_node_is_invalid() {
    let mut g = two_node_graph();
    assert!(matches!(g.add_edge("a", "output", "ghost", "input"), Err(GraphError::InvalidReference { .. })));
}

#[test]
fn add_edge_wrong_direction_is_invalid() {
    let mut g = two_node_graph();
    assert!(matches!(g.add_edge("a", "input", "b", "output"), Err(GraphError::InvalidReference { .. })));
}

#[test]
fn add_edge_rejects_duplicate_tuple() {
    let mut g = two_node_graph();
    g.add_edge("a", "output", "b", "input").unwrap();
    let err = g.add_edge("a", "output", "b", "input").unwrap_err();
    assert!(matches!(err, GraphError::DuplicateEdge { .. }));
    assert_eq!(g.edges().len(), 1);
}

#[test]
fn graph_error_messages() {
    let e = GraphError::UnknownNode("x".into());
    assert_eq!(e.to_string(), "unknown node: x");
}

// =============================================================
// Node lifecycle
// =============================================================

#[test]
fn add_node_with_same_id_replaces_in_place() {
    let mut g = two_node_graph();
    g.add_node(node_at("a", "delay", 5.0, 5.0));
    assert_eq!(g.len(), 2);
    assert_eq!(g.nodes()[0].node_type, "delay");
}

#[test]
fn remove_node_cascades_edges() {
    let mut g = two_node_graph();
    g.add_node(node_at("c", "code", 800.0, 0.0));
    g.add_edge("a", "output", "b", "input").unwrap();
    g.add_edge("b", "output", "c", "input").unwrap();
    assert!(g.remove_node("a").is_some());
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.edges()[0].source_node_id, "b");
    assert!(g.remove_node("a").is_none());
}

#[test]
fn configure_node_merges_and_deletes() {
    let mut g = two_node_graph();
    let mut patch = Map::new();
    patch.insert("name".into(), json!("Fetch"));
    patch.insert("url".into(), json!("https://x"));
    assert!(g.configure_node("a", &patch));

    let mut patch = Map::new();
    patch.insert("url".into(), Value::Null);
    assert!(g.configure_node("a", &patch));

    let node = g.node("a").unwrap();
    assert_eq!(node.display_name(), "Fetch");
    assert!(node.configuration.get("url").is_none());
    assert!(!g.configure_node("ghost", &patch));
}

#[test]
fn display_name_falls_back_to_type() {
    assert_eq!(node_at("a", "code", 0.0, 0.0).display_name(), "code");
}

// =============================================================
// Geometry
// =============================================================

#[test]
fn snap_to_grid_rounds_to_nearest() {
    assert_eq!(snap_to_grid(Point::new(29.0, 31.0), 20.0), Point::new(20.0, 40.0));
    assert_eq!(snap_to_grid(Point::new(-11.0, 10.0), 20.0), Point::new(-20.0, 20.0));
    assert_eq!(snap_to_grid(Point::new(7.0, 7.0), 0.0), Point::new(7.0, 7.0));
}

#[test]
fn port_anchor_sides() {
    let g = two_node_graph();
    let size = NodeVariant::Standard.default_size();
    assert_eq!(g.port_anchor("a", "input"), Some(Point::new(0.0, size.height / 2.0)));
    assert_eq!(g.port_anchor("a", "output"), Some(Point::new(size.width, size.height / 2.0)));
    assert_eq!(g.port_anchor("a", "nope"), None);
}

#[test]
fn port_anchor_branch_outputs_spread() {
    let mut g = GraphModel::new();
    g.add_node(node_at("if", "condition", 0.0, 0.0));
    let t = g.port_anchor("if", "true").unwrap();
    let f = g.port_anchor("if", "false").unwrap();
    assert!(t.y < f.y);
    assert_eq!(t.x, f.x);
}

#[test]
fn nodes_intersecting_rect() {
    let g = two_node_graph();
    let hits = g.nodes_intersecting(&Rect::new(150.0, 10.0, 20.0, 20.0));
    assert_eq!(hits, vec!["a".to_string()]);
}

// =============================================================
// load_snapshot
// =============================================================

#[test]
fn load_snapshot_skips_malformed_nodes_and_invalid_edges() {
    let mut g = GraphModel::new();
    let nodes = vec![
        json!({"id": "a", "type": "code", "position": {"x": 0, "y": 0}, "status": "running"}),
        json!({"id": "b", "type": "code", "position": {"x": 300, "y": 0}}),
        json!({"id": "broken"}),
    ];
    let edges = vec![
        Edge {
            id: "e1".into(),
            source_node_id: "a".into(),
            source_port_id: "output".into(),
            target_node_id: "b".into(),
            target_port_id: "input".into(),
            label: None,
        },
        Edge {
            id: "e2".into(),
            source_node_id: "a".into(),
            source_port_id: "output".into(),
            target_node_id: "ghost".into(),
            target_port_id: "input".into(),
            label: None,
        },
    ];
    g.load_snapshot(nodes, edges);
    assert_eq!(g.len(), 2);
    assert_eq!(g.node("a").unwrap().status, ExecutionStatus::Running);
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.edges()[0].id, "e1");
}

#[test]
fn has_persistent_trigger_detects_variant() {
    let mut g = two_node_graph();
    assert!(!g.has_persistent_trigger());
    g.add_node(node_at("t", "telegram-trigger", 0.0, 200.0));
    assert!(g.has_persistent_trigger());
}
