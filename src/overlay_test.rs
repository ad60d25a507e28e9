use serde_json::json;

use super::*;
use crate::camera::Point;
use crate::doc::Node;

fn started(exec: &str, node: &str, at: &str) -> SocketEvent {
    SocketEvent::parse(
        "execution:node-started",
        &json!({"executionId": exec, "nodeId": node, "startedAt": at}),
    )
    .unwrap()
}

fn completed(exec: &str, node: &str) -> SocketEvent {
    SocketEvent::parse(
        "execution:node-completed",
        &json!({"executionId": exec, "nodeId": node, "output": "{\"ok\":true}", "durationMs": 42}),
    )
    .unwrap()
}

fn record(node: &str, status: &str) -> NodeExecutionData {
    serde_json::from_value(json!({"id": format!("r-{node}"), "nodeId": node, "status": status})).unwrap()
}

// =============================================================
// Payloads
// =============================================================

#[test]
fn parse_payload_decodes_json_strings() {
    assert_eq!(parse_payload(json!("{\"a\":1}")), json!({"a": 1}));
    assert_eq!(parse_payload(json!("[1,2]")), json!([1, 2]));
}

#[test]
fn parse_payload_keeps_malformed_strings_raw() {
    assert_eq!(parse_payload(json!("{not json")), json!("{not json"));
    assert_eq!(parse_payload(json!({"a": 1})), json!({"a": 1}));
}

#[test]
fn execution_data_deserializes_leniently() {
    let d: NodeExecutionData = serde_json::from_value(json!({
        "id": "x",
        "nodeId": "n1",
        "status": "completed",
        "inputData": "{\"q\":\"hi\"}",
        "outputData": "plain text",
        "durationMs": "120",
        "startedAt": "2024-01-01T00:00:00Z"
    }))
    .unwrap();
    assert_eq!(d.status, ExecutionStatus::Completed);
    assert_eq!(d.input_data, Some(json!({"q": "hi"})));
    assert_eq!(d.output_data, Some(json!("plain text")));
    assert_eq!(d.duration_ms, Some(120));
    assert_eq!(d.started_at.as_deref(), Some("2024-01-01T00:00:00Z"));
}

#[test]
fn unknown_status_in_record_becomes_idle() {
    let d = record("n", "exploded");
    assert_eq!(d.status, ExecutionStatus::Idle);
}

// =============================================================
// Socket events
// =============================================================

#[test]
fn parses_execution_started() {
    let e = SocketEvent::parse("execution:started", &json!({"executionId": "e1"})).unwrap();
    assert_eq!(e, SocketEvent::ExecutionStarted { execution_id: "e1".into() });
    assert_eq!(e.execution_id(), Some("e1"));
}

#[test]
fn parses_failed_with_error_alias() {
    let e = SocketEvent::parse(
        "execution:node-failed",
        &json!({"executionId": "e1", "nodeId": "n", "error": "boom"}),
    )
    .unwrap();
    let SocketEvent::NodeFailed { error_message, .. } = e else {
        panic!("expected NodeFailed");
    };
    assert_eq!(error_message.as_deref(), Some("boom"));
}

#[test]
fn unknown_and_malformed_events_are_ignored() {
    assert!(SocketEvent::parse("execution:whatever", &json!({})).is_none());
    assert!(SocketEvent::parse("execution:node-started", &json!({"executionId": "e"})).is_none());
    assert!(SocketEvent::parse("execution:started", &json!({})).is_none());
}

// =============================================================
// Live merge
// =============================================================

#[test]
fn started_then_completed_keeps_started_at() {
    let mut o = ExecutionOverlay::new();
    assert!(o.apply_event(started("e1", "n", "t0")));
    assert_eq!(o.status("n"), Some(ExecutionStatus::Running));

    o.apply_event(completed("e1", "n"));
    let d = o.data("n").unwrap();
    assert_eq!(d.status, ExecutionStatus::Completed);
    assert_eq!(d.started_at.as_deref(), Some("t0"));
    assert_eq!(d.output_data, Some(json!({"ok": true})));
    assert_eq!(d.duration_ms, Some(42));
    assert!(o.has_live_status("n"));
}

#[test]
fn execution_started_switches_and_clears() {
    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "a", "t0"));
    let next = SocketEvent::parse("execution:started", &json!({"executionId": "e2"})).unwrap();
    assert!(o.apply_event(next));
    assert_eq!(o.active_execution_id(), Some("e2"));
    assert!(o.status("a").is_none());
}

#[test]
fn first_node_event_adopts_its_execution() {
    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "a", "t0"));
    assert_eq!(o.active_execution_id(), Some("e1"));
    assert_eq!(o.status("a"), Some(ExecutionStatus::Running));
}

#[test]
fn straggler_from_previous_execution_is_ignored() {
    let mut o = ExecutionOverlay::new();
    o.set_active_execution(Some("e2".into()));
    o.apply_event(completed("e2", "b"));

    assert!(!o.apply_event(completed("e1", "a")));
    assert_eq!(o.active_execution_id(), Some("e2"));
    assert_eq!(o.status("b"), Some(ExecutionStatus::Completed));
    assert!(o.status("a").is_none());
}

#[test]
fn node_event_without_execution_id_applies_to_active() {
    let mut o = ExecutionOverlay::new();
    o.set_active_execution(Some("e1".into()));
    let e = SocketEvent::parse("execution:node-waiting", &json!({"nodeId": "n"})).unwrap();
    assert!(o.apply_event(e));
    assert_eq!(o.status("n"), Some(ExecutionStatus::Waiting));
}

#[test]
fn agent_activity_tracks_and_clears_on_completion() {
    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "agent", "t0"));
    let act = SocketEvent::parse(
        "execution:agent-activity",
        &json!({"executionId": "e1", "nodeId": "agent", "kind": "tool", "name": "search", "active": true}),
    )
    .unwrap();
    o.apply_event(act);
    assert_eq!(o.activity("agent").unwrap().name, "search");
    assert_eq!(o.status("agent"), Some(ExecutionStatus::Running));

    o.apply_event(completed("e1", "agent"));
    assert!(o.activity("agent").is_none());
}

#[test]
fn waiting_event_sets_waiting() {
    let mut o = ExecutionOverlay::new();
    let e = SocketEvent::parse("execution:node-waiting", &json!({"executionId": "e1", "nodeId": "n"})).unwrap();
    o.apply_event(e);
    assert_eq!(o.status("n"), Some(ExecutionStatus::Waiting));
}

// =============================================================
// History merge
// =============================================================

#[test]
fn stale_history_does_not_override_live() {
    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "n", "t0"));
    o.apply_event(completed("e1", "n"));

    let merged = o.merge_history("e1", vec![record("n", "RUNNING"), record("m", "FAILED")]);
    assert_eq!(merged, 1);
    assert_eq!(o.status("n"), Some(ExecutionStatus::Completed));
    assert_eq!(o.status("m"), Some(ExecutionStatus::Failed));
    assert!(!o.has_live_status("m"));
}

#[test]
fn live_event_overrides_history() {
    let mut o = ExecutionOverlay::new();
    o.set_active_execution(Some("e1".into()));
    o.merge_history("e1", vec![record("n", "COMPLETED")]);
    o.apply_event(started("e1", "n", "t9"));
    assert_eq!(o.status("n"), Some(ExecutionStatus::Running));
    assert!(o.has_live_status("n"));
}

#[test]
fn history_for_other_execution_is_discarded() {
    let mut o = ExecutionOverlay::new();
    o.set_active_execution(Some("e1".into()));
    assert_eq!(o.merge_history("e0", vec![record("n", "COMPLETED")]), 0);
    assert!(o.status("n").is_none());
}

#[test]
fn set_active_execution_same_id_keeps_cache() {
    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "n", "t0"));
    assert!(!o.set_active_execution(Some("e1".into())));
    assert!(o.status("n").is_some());
    assert!(o.set_active_execution(None));
    assert!(o.status("n").is_none());
}

// =============================================================
// Annotate
// =============================================================

#[test]
fn annotate_writes_status_without_touching_topology() {
    let mut g = GraphModel::new();
    g.add_node(Node::new("a", "code", Point::new(0.0, 0.0)));
    g.add_node(Node::new("b", "code", Point::new(300.0, 0.0)));
    g.add_edge("a", "output", "b", "input").unwrap();
    g.node_mut("b").unwrap().status = ExecutionStatus::Failed;

    let mut o = ExecutionOverlay::new();
    o.apply_event(started("e1", "a", "t0"));
    o.annotate(&mut g);

    assert_eq!(g.node("a").unwrap().status, ExecutionStatus::Running);
    assert_eq!(g.node("b").unwrap().status, ExecutionStatus::Idle);
    assert_eq!(g.edges().len(), 1);
    assert_eq!(g.len(), 2);
}

#[test]
fn annotate_without_execution_keeps_loaded_status() {
    let mut g = GraphModel::new();
    let mut n = Node::new("a", "code", Point::new(0.0, 0.0));
    n.status = ExecutionStatus::Completed;
    g.add_node(n);
    ExecutionOverlay::new().annotate(&mut g);
    assert_eq!(g.node("a").unwrap().status, ExecutionStatus::Completed);
}

#[test]
fn reset_returns_nodes_to_idle() {
    let mut g = GraphModel::new();
    let mut n = Node::new("a", "agent", Point::new(0.0, 0.0));
    n.status = ExecutionStatus::Running;
    n.agent_activity = Some(AgentActivity { kind: "tool".into(), name: "search".into(), active: true });
    g.add_node(n);
    ExecutionOverlay::reset(&mut g);
    let a = g.node("a").unwrap();
    assert_eq!(a.status, ExecutionStatus::Idle);
    assert!(a.agent_activity.is_none());
}
