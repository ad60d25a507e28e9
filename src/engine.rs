//! Engine: turns raw host input into graph mutations and host actions.
//!
//! DESIGN
//! ======
//! `EngineCore` owns every piece of mutable canvas state (graph, camera,
//! selection, active interaction, execution overlay, trigger cache). All
//! mutation funnels through its `&mut self` methods, which return the
//! [`Action`]s the host must perform. Nothing here touches a window, a
//! socket or the network; the session layer feeds async results in.
//!
//! Starting an interaction always ends the previous one first. A forced end
//! reverts uncommitted drag/resize changes and commits an inline edit, and
//! the document-listener guard guarantees one detach per attach.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::camera::{Camera, Point, Rect};
use crate::config::CanvasConfig;
use crate::consts::WHEEL_ZOOM_STEP;
use crate::containment::{Visibility, contained_nodes};
use crate::doc::{Edge, GraphError, GraphModel, Node, NodeId, resolve_dimensions, snap_to_grid};
use crate::hit::{Hit, HitPart, hit_test};
use crate::input::{Button, InteractionState, Key, Modifiers, UiState, WheelDelta};
use crate::listeners::DocumentListeners;
use crate::overlay::{ExecutionOverlay, NodeExecutionData, SocketEvent};
use crate::registry::{NodeVariant, PortDirection, Size};
use crate::triggers::{TriggerKind, TriggerStatus, TriggerStatusCache};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RenderNeeded,
    SetCursor(String),
    /// Bind pointer move/up listeners on the whole document.
    AttachDocumentListeners,
    /// Release the document listeners bound by the matching attach.
    DetachDocumentListeners,
    Emit(DomainEvent),
}

/// Events the canvas reports to its host application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", content = "detail", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum DomainEvent {
    WorkflowChanged,
    NodeSelected { node_ids: Vec<NodeId> },
    NodeConfigured { node_id: NodeId, configuration: Map<String, Value> },
    NodeRetry { execution_id: String, node_id: NodeId },
    TriggerToggle { node_id: NodeId, trigger_id: String, active: bool },
    CanvasEnabled { enabled: bool },
    WorkflowTrigger { kind: TriggerKind, execution_id: Option<String> },
}

impl DomainEvent {
    /// Stable event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkflowChanged => "workflow-changed",
            Self::NodeSelected { .. } => "node-selected",
            Self::NodeConfigured { .. } => "node-configured",
            Self::NodeRetry { .. } => "node-retry",
            Self::TriggerToggle { .. } => "trigger-toggle",
            Self::CanvasEnabled { .. } => "canvas-enabled",
            Self::WorkflowTrigger { .. } => "workflow-trigger",
        }
    }
}

/// How an inline edit ends when its interaction is terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditEnd {
    Commit,
    Discard,
}

/// Core engine state.
pub struct EngineCore {
    pub graph: GraphModel,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InteractionState,
    pub overlay: ExecutionOverlay,
    pub triggers: TriggerStatusCache,
    pub config: CanvasConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
    listeners: DocumentListeners,
    cursor: &'static str,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::with_config(CanvasConfig::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: CanvasConfig) -> Self {
        Self {
            graph: GraphModel::new(),
            camera: Camera::with_limits(config.min_zoom, config.max_zoom),
            ui: UiState::default(),
            input: InteractionState::Idle,
            overlay: ExecutionOverlay::new(),
            triggers: TriggerStatusCache::default(),
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
            listeners: DocumentListeners::default(),
            cursor: "default",
        }
    }

    // --- Data inputs ---

    /// Replace the graph from a host snapshot.
    pub fn load_snapshot(&mut self, nodes: Vec<Value>, edges: Vec<Edge>) -> Vec<Action> {
        let mut actions = self.finish_interaction(EditEnd::Commit);
        self.graph.load_snapshot(nodes, edges);
        self.prune_ui();
        self.overlay.annotate(&mut self.graph);
        info!(nodes = self.graph.len(), edges = self.graph.edges().len(), "snapshot loaded");
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Create a node from a palette drop at a screen point.
    pub fn drop_node(
        &mut self,
        node_type: &str,
        screen_pt: Point,
        configuration: Map<String, Value>,
    ) -> (NodeId, Vec<Action>) {
        let mut actions = self.finish_interaction(EditEnd::Commit);
        let world = self.camera.screen_to_world(screen_pt);
        let position = if self.config.snap_to_grid { snap_to_grid(world, self.config.grid_step) } else { world };
        let id = Uuid::new_v4().to_string();
        let mut node = Node::new(id.clone(), node_type, position);
        node.configuration = configuration;
        self.graph.add_node(node);
        self.ui.selection.clear();
        self.ui.selection.insert(id.clone());
        self.ui.selected_edge = None;
        info!(node_id = %id, node_type, "node dropped");
        actions.push(Action::RenderNeeded);
        actions.push(Action::Emit(DomainEvent::WorkflowChanged));
        actions.push(self.selection_event());
        (id, actions)
    }

    /// Remove a node, its edges, and its selection entry.
    pub fn remove_node(&mut self, id: &str) -> Vec<Action> {
        let mut actions = self.finish_interaction(EditEnd::Commit);
        if self.graph.remove_node(id).is_none() {
            return actions;
        }
        let was_selected = self.ui.selection.remove(id);
        self.prune_ui();
        actions.push(Action::RenderNeeded);
        actions.push(Action::Emit(DomainEvent::WorkflowChanged));
        if was_selected {
            actions.push(self.selection_event());
        }
        actions
    }

    /// Delete the selected nodes and the selected edge.
    pub fn delete_selection(&mut self) -> Vec<Action> {
        let mut actions = self.finish_interaction(EditEnd::Commit);
        let mut changed = false;
        if let Some(edge_id) = self.ui.selected_edge.take() {
            changed |= self.graph.remove_edge(&edge_id).is_some();
        }
        let ids: Vec<NodeId> = std::mem::take(&mut self.ui.selection).into_iter().collect();
        for id in &ids {
            changed |= self.graph.remove_node(id).is_some();
        }
        if !changed {
            return actions;
        }
        self.prune_ui();
        debug!(nodes = ids.len(), "selection deleted");
        actions.push(Action::RenderNeeded);
        actions.push(Action::Emit(DomainEvent::WorkflowChanged));
        if !ids.is_empty() {
            actions.push(self.selection_event());
        }
        actions
    }

    /// Merge a configuration patch into a node. `null` values delete keys.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownNode`] if the node does not exist.
    pub fn configure_node(&mut self, id: &str, patch: Map<String, Value>) -> Result<Vec<Action>, GraphError> {
        if !self.graph.configure_node(id, &patch) {
            return Err(GraphError::UnknownNode(id.into()));
        }
        Ok(vec![
            Action::RenderNeeded,
            Action::Emit(DomainEvent::NodeConfigured { node_id: id.into(), configuration: patch }),
            Action::Emit(DomainEvent::WorkflowChanged),
        ])
    }

    /// Enable or disable pointer input. Disabling ends any active interaction.
    pub fn set_enabled(&mut self, enabled: bool) -> Vec<Action> {
        let mut actions = if enabled { Vec::new() } else { self.finish_interaction(EditEnd::Commit) };
        self.ui.enabled = enabled;
        actions.push(Action::RenderNeeded);
        actions.push(Action::Emit(DomainEvent::CanvasEnabled { enabled }));
        actions
    }

    /// Toggle whether background drags pan instead of drawing a marquee.
    pub fn set_pan_mode(&mut self, pan_mode: bool) -> Vec<Action> {
        self.ui.pan_mode = pan_mode;
        self.set_cursor(if pan_mode { "grab" } else { "default" }).into_iter().collect()
    }

    /// Update viewport dimensions in CSS pixels.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    // --- Execution overlay ---

    /// Apply a named socket event to the overlay.
    pub fn apply_socket_event(&mut self, name: &str, data: &Value) -> Vec<Action> {
        let Some(event) = SocketEvent::parse(name, data) else {
            return Vec::new();
        };
        if !self.overlay.apply_event(event) {
            return Vec::new();
        }
        self.overlay.annotate(&mut self.graph);
        vec![Action::RenderNeeded]
    }

    /// Merge fetched history records for `execution_id`.
    pub fn merge_history(&mut self, execution_id: &str, records: Vec<NodeExecutionData>) -> Vec<Action> {
        if self.overlay.merge_history(execution_id, records) == 0 {
            return Vec::new();
        }
        self.overlay.annotate(&mut self.graph);
        vec![Action::RenderNeeded]
    }

    /// Switch the active execution, clearing overlay state on change.
    /// Clearing it entirely resets every node to IDLE.
    pub fn set_active_execution(&mut self, execution_id: Option<String>) -> Vec<Action> {
        let cleared = execution_id.is_none();
        if !self.overlay.set_active_execution(execution_id) {
            return Vec::new();
        }
        if cleared {
            ExecutionOverlay::reset(&mut self.graph);
        } else {
            self.overlay.annotate(&mut self.graph);
        }
        vec![Action::RenderNeeded]
    }

    /// Record a polled trigger status for a node still on the canvas.
    pub fn apply_trigger_status(&mut self, node_id: &str, status: TriggerStatus) -> Vec<Action> {
        if !self.graph.contains_node(node_id) {
            debug!(node_id, "dropping trigger status for removed node");
            return Vec::new();
        }
        self.triggers.update(node_id.to_owned(), status);
        vec![Action::RenderNeeded]
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        if !self.ui.enabled {
            return Vec::new();
        }
        let mut actions = self.finish_interaction(EditEnd::Commit);
        let next = match button {
            Button::Middle => Some(InteractionState::Panning { last_screen: screen_pt }),
            Button::Secondary => None,
            Button::Primary => self.primary_down(screen_pt, modifiers, &mut actions),
        };
        if let Some(state) = next {
            self.begin(state, &mut actions);
        }
        actions
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        if !self.ui.enabled {
            return Vec::new();
        }
        if matches!(self.input, InteractionState::Idle) {
            return self.update_hover(screen_pt);
        }
        let zoom = self.camera.zoom;
        match &mut self.input {
            InteractionState::Idle | InteractionState::EditingLabel { .. } => return Vec::new(),
            InteractionState::DraggingNodes { start_screen, origins } => {
                let delta = screen_pt.sub(*start_screen).scale(1.0 / zoom);
                for (id, origin) in origins.iter() {
                    self.graph.move_node(id, origin.add(delta));
                }
            }
            InteractionState::Panning { last_screen } => {
                let delta = screen_pt.sub(*last_screen);
                self.camera.pan_by(delta.x, delta.y);
                *last_screen = screen_pt;
            }
            InteractionState::MarqueeSelecting { current_screen, .. } => {
                *current_screen = screen_pt;
            }
            InteractionState::ConnectingEdge { node_id, port_id, direction, pointer_world, hover } => {
                let world = self.camera.screen_to_world(screen_pt);
                *pointer_world = world;
                *hover = compatible_port_at(&self.graph, &self.camera, world, node_id, port_id, *direction);
            }
            InteractionState::Resizing { node_id, start_screen, start_size, .. } => {
                let delta = screen_pt.sub(*start_screen).scale(1.0 / zoom);
                let size = Size::new(start_size.width + delta.x, start_size.height + delta.y);
                resize_node(&mut self.graph, node_id, size);
            }
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if matches!(self.input, InteractionState::Idle | InteractionState::EditingLabel { .. }) {
            return Vec::new();
        }
        let mut actions = match std::mem::take(&mut self.input) {
            InteractionState::DraggingNodes { origins, .. } => self.commit_drag(&origins),
            InteractionState::MarqueeSelecting { start_screen, .. } => self.commit_marquee(start_screen, screen_pt),
            InteractionState::ConnectingEdge { node_id, port_id, direction, .. } => {
                self.commit_connect(&node_id, port_id, direction, screen_pt)
            }
            InteractionState::Resizing { node_id, start_size, .. } => self.commit_resize(&node_id, start_size),
            InteractionState::Panning { .. } | InteractionState::Idle | InteractionState::EditingLabel { .. } => {
                vec![Action::RenderNeeded]
            }
        };
        self.release_listeners(&mut actions);
        actions
    }

    /// Start inline editing of a frame label or note body.
    pub fn on_double_click(&mut self, screen_pt: Point) -> Vec<Action> {
        if !self.ui.enabled {
            return Vec::new();
        }
        let mut actions = self.finish_interaction(EditEnd::Commit);
        let world = self.camera.screen_to_world(screen_pt);
        let visibility = Visibility::compute(&self.graph);
        let Some(Hit::Node { node_id, part }) = hit_test(world, &self.graph, &self.camera, &visibility) else {
            return actions;
        };
        let Some(node) = self.graph.node(&node_id) else {
            return actions;
        };
        let variant = node.variant();
        let key = match (variant, part) {
            (NodeVariant::Frame, HitPart::FrameLabel) | (NodeVariant::Note, HitPart::Body) => variant.editable_text_key(),
            _ => None,
        };
        let Some(key) = key else {
            return actions;
        };
        let original = node.config_str(key).unwrap_or_default().to_owned();
        self.begin(
            InteractionState::EditingLabel { node_id, key, draft: original.clone(), original },
            &mut actions,
        );
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Replace the draft text of the active inline edit.
    pub fn set_edit_draft(&mut self, text: impl Into<String>) -> Vec<Action> {
        let InteractionState::EditingLabel { draft, .. } = &mut self.input else {
            return Vec::new();
        };
        *draft = text.into();
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if matches!(self.input, InteractionState::EditingLabel { .. }) {
            if key.is("Escape") {
                return self.finish_interaction(EditEnd::Discard);
            }
            if key.is("Enter") && !modifiers.shift {
                return self.finish_interaction(EditEnd::Commit);
            }
            return Vec::new();
        }
        if key.is("Escape") {
            return self.cancel_interaction();
        }
        if !self.ui.enabled {
            return Vec::new();
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selection();
        }
        Vec::new()
    }

    /// Focus left the inline editor: commit it.
    pub fn on_blur(&mut self) -> Vec<Action> {
        if matches!(self.input, InteractionState::EditingLabel { .. }) {
            self.finish_interaction(EditEnd::Commit)
        } else {
            Vec::new()
        }
    }

    /// Wheel zooms around the cursor; Shift+wheel pans.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if !self.ui.enabled {
            return Vec::new();
        }
        if modifiers.shift {
            self.camera.pan_by(-delta.dx, -delta.dy);
            return vec![Action::RenderNeeded];
        }
        if delta.dy.abs() < f64::EPSILON {
            return Vec::new();
        }
        let factor = if delta.dy < 0.0 { WHEEL_ZOOM_STEP } else { 1.0 / WHEEL_ZOOM_STEP };
        self.camera.zoom_at(screen_pt, factor);
        vec![Action::RenderNeeded]
    }

    /// Abort the active interaction. Drag and resize are reverted, transient
    /// state is dropped, and an inline edit is discarded.
    pub fn cancel_interaction(&mut self) -> Vec<Action> {
        self.finish_interaction(EditEnd::Discard)
    }

    /// Host is tearing the canvas down: end everything and release listeners.
    pub fn detach(&mut self) -> Vec<Action> {
        self.finish_interaction(EditEnd::Commit)
    }

    // --- Queries ---

    /// Selected node ids, sorted by id.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<NodeId> {
        self.ui.selection.iter().cloned().collect()
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.graph.node(id)
    }

    #[must_use]
    pub fn listeners_attached(&self) -> bool {
        self.listeners.is_attached()
    }

    #[must_use]
    pub fn cursor(&self) -> &'static str {
        self.cursor
    }

    // --- Internals ---

    fn selection_event(&self) -> Action {
        Action::Emit(DomainEvent::NodeSelected { node_ids: self.selected_ids() })
    }

    fn begin(&mut self, state: InteractionState, actions: &mut Vec<Action>) {
        debug!(state = state.name(), "interaction started");
        let pointer_driven = state.is_pointer_driven();
        self.input = state;
        if pointer_driven && self.listeners.attach() {
            actions.push(Action::AttachDocumentListeners);
        }
    }

    fn release_listeners(&mut self, actions: &mut Vec<Action>) {
        if self.listeners.detach() {
            actions.push(Action::DetachDocumentListeners);
        }
    }

    fn set_cursor(&mut self, cursor: &'static str) -> Option<Action> {
        if self.cursor == cursor {
            return None;
        }
        self.cursor = cursor;
        Some(Action::SetCursor(cursor.to_owned()))
    }

    /// End the active interaction without completing it.
    fn finish_interaction(&mut self, edit: EditEnd) -> Vec<Action> {
        let mut actions = Vec::new();
        match std::mem::take(&mut self.input) {
            InteractionState::Idle => {}
            InteractionState::DraggingNodes { origins, .. } => {
                for (id, origin) in origins {
                    self.graph.move_node(&id, origin);
                }
                actions.push(Action::RenderNeeded);
            }
            InteractionState::Resizing { node_id, previous, .. } => {
                self.graph.configure_node(&node_id, &previous);
                actions.push(Action::RenderNeeded);
            }
            InteractionState::Panning { .. }
            | InteractionState::MarqueeSelecting { .. }
            | InteractionState::ConnectingEdge { .. } => actions.push(Action::RenderNeeded),
            InteractionState::EditingLabel { node_id, key, draft, original } => match edit {
                EditEnd::Commit => actions.extend(self.commit_edit(&node_id, key, draft, &original)),
                EditEnd::Discard => actions.push(Action::RenderNeeded),
            },
        }
        self.release_listeners(&mut actions);
        actions
    }

    fn primary_down(&mut self, screen_pt: Point, modifiers: Modifiers, actions: &mut Vec<Action>) -> Option<InteractionState> {
        let world = self.camera.screen_to_world(screen_pt);
        let visibility = Visibility::compute(&self.graph);
        match hit_test(world, &self.graph, &self.camera, &visibility) {
            Some(Hit::Node { node_id, part: HitPart::Port { port_id, direction } }) => {
                Some(InteractionState::ConnectingEdge { node_id, port_id, direction, pointer_world: world, hover: None })
            }
            Some(Hit::Node { node_id, part: HitPart::ResizeHandle }) => self.resize_state(node_id, screen_pt),
            Some(Hit::Node { node_id, part: HitPart::Body | HitPart::FrameLabel }) => {
                actions.extend(self.press_node(&node_id, modifiers.shift));
                Some(self.drag_state(screen_pt))
            }
            Some(Hit::Edge { edge_id }) => {
                actions.extend(self.select_edge(edge_id));
                None
            }
            None if self.ui.pan_mode => Some(InteractionState::Panning { last_screen: screen_pt }),
            None => Some(InteractionState::MarqueeSelecting { start_screen: screen_pt, current_screen: screen_pt }),
        }
    }

    fn press_node(&mut self, node_id: &str, additive: bool) -> Vec<Action> {
        let mut changed = self.ui.selected_edge.take().is_some();
        if additive {
            changed |= self.ui.selection.insert(node_id.to_owned());
        } else if !self.ui.selection.contains(node_id) {
            self.ui.selection.clear();
            self.ui.selection.insert(node_id.to_owned());
            changed = true;
        }
        if changed { vec![Action::RenderNeeded, self.selection_event()] } else { Vec::new() }
    }

    fn select_edge(&mut self, edge_id: String) -> Vec<Action> {
        let had_nodes = !self.ui.selection.is_empty();
        self.ui.selection.clear();
        self.ui.selected_edge = Some(edge_id);
        let mut actions = vec![Action::RenderNeeded];
        if had_nodes {
            actions.push(self.selection_event());
        }
        actions
    }

    /// Capture every selected node, plus the members of selected frames.
    fn drag_state(&self, screen_pt: Point) -> InteractionState {
        let mut ids: Vec<NodeId> = self.selected_ids();
        for frame in self.ui.selection.iter().filter_map(|id| self.graph.node(id)).filter(|n| n.is_frame()) {
            for member in contained_nodes(&self.graph, frame) {
                if !ids.contains(&member.id) {
                    ids.push(member.id.clone());
                }
            }
        }
        let origins = ids
            .into_iter()
            .filter_map(|id| self.graph.node(&id).map(|n| n.position).map(|p| (id, p)))
            .collect();
        InteractionState::DraggingNodes { start_screen: screen_pt, origins }
    }

    fn resize_state(&self, node_id: NodeId, screen_pt: Point) -> Option<InteractionState> {
        let node = self.graph.node(&node_id)?;
        let (w_key, h_key) = node.variant().size_keys()?;
        let previous: Map<String, Value> = [w_key, h_key]
            .into_iter()
            .map(|k| (k.to_owned(), node.configuration.get(k).cloned().unwrap_or(Value::Null)))
            .collect();
        let start_size = resolve_dimensions(node);
        Some(InteractionState::Resizing { node_id, start_screen: screen_pt, start_size, previous })
    }

    fn update_hover(&mut self, screen_pt: Point) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let visibility = Visibility::compute(&self.graph);
        let hit = hit_test(world, &self.graph, &self.camera, &visibility);
        let hovered = match &hit {
            Some(Hit::Edge { edge_id }) => Some(edge_id.clone()),
            _ => None,
        };
        let cursor = match hit {
            Some(Hit::Node { part: HitPart::Port { .. }, .. }) => "crosshair",
            Some(Hit::Node { part: HitPart::ResizeHandle, .. }) => "nwse-resize",
            Some(Hit::Node { .. }) => "move",
            Some(Hit::Edge { .. }) => "pointer",
            None if self.ui.pan_mode => "grab",
            None => "default",
        };
        let mut actions = Vec::new();
        if self.ui.hovered_edge != hovered {
            self.ui.hovered_edge = hovered;
            actions.push(Action::RenderNeeded);
        }
        actions.extend(self.set_cursor(cursor));
        actions
    }

    fn commit_drag(&mut self, origins: &[(NodeId, Point)]) -> Vec<Action> {
        let mut moved = false;
        for (id, origin) in origins {
            let Some(mut position) = self.graph.node(id).map(|n| n.position) else {
                continue;
            };
            if self.config.snap_to_grid {
                position = snap_to_grid(position, self.config.grid_step);
                self.graph.move_node(id, position);
            }
            moved |= position != *origin;
        }
        let mut actions = vec![Action::RenderNeeded];
        if moved {
            debug!(nodes = origins.len(), "drag committed");
            actions.push(Action::Emit(DomainEvent::WorkflowChanged));
        }
        actions
    }

    fn commit_marquee(&mut self, start_screen: Point, end_screen: Point) -> Vec<Action> {
        let rect = Rect::from_corners(self.camera.screen_to_world(start_screen), self.camera.screen_to_world(end_screen));
        self.ui.selection = self.graph.nodes_intersecting(&rect).into_iter().collect();
        self.ui.selected_edge = None;
        vec![Action::RenderNeeded, self.selection_event()]
    }

    fn commit_connect(
        &mut self,
        node_id: &str,
        port_id: &'static str,
        direction: PortDirection,
        screen_pt: Point,
    ) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let Some((other, other_port)) = compatible_port_at(&self.graph, &self.camera, world, node_id, port_id, direction)
        else {
            debug!(node_id, port_id, "connection dropped on empty space");
            return vec![Action::RenderNeeded];
        };
        let result = match direction {
            PortDirection::Output => self.graph.add_edge(node_id, port_id, &other, other_port),
            PortDirection::Input => self.graph.add_edge(&other, other_port, node_id, port_id),
        };
        match result {
            Ok(edge) => {
                info!(edge_id = %edge.id, "edge connected");
                vec![Action::RenderNeeded, Action::Emit(DomainEvent::WorkflowChanged)]
            }
            Err(e) => {
                debug!(error = %e, "connection rejected");
                vec![Action::RenderNeeded]
            }
        }
    }

    fn commit_resize(&mut self, node_id: &str, start_size: Size) -> Vec<Action> {
        let mut actions = vec![Action::RenderNeeded];
        if self.graph.node(node_id).map(resolve_dimensions) != Some(start_size) {
            actions.push(Action::Emit(DomainEvent::WorkflowChanged));
        }
        actions
    }

    fn commit_edit(&mut self, node_id: &str, key: &'static str, draft: String, original: &str) -> Vec<Action> {
        if draft == original || !self.graph.contains_node(node_id) {
            return vec![Action::RenderNeeded];
        }
        let mut patch = Map::new();
        patch.insert(key.to_owned(), Value::String(draft));
        self.graph.configure_node(node_id, &patch);
        vec![
            Action::RenderNeeded,
            Action::Emit(DomainEvent::NodeConfigured { node_id: node_id.to_owned(), configuration: patch }),
            Action::Emit(DomainEvent::WorkflowChanged),
        ]
    }

    /// Drop selection, hover and trigger entries that point at removed items.
    fn prune_ui(&mut self) {
        let graph = &self.graph;
        self.ui.selection.retain(|id| graph.contains_node(id));
        if self.ui.selected_edge.as_deref().is_some_and(|id| graph.edge(id).is_none()) {
            self.ui.selected_edge = None;
        }
        if self.ui.hovered_edge.as_deref().is_some_and(|id| graph.edge(id).is_none()) {
            self.ui.hovered_edge = None;
        }
        self.triggers.prune(graph);
    }
}

/// A port under `world` that the connection from `(node_id, port_id)` could
/// end on: another node, opposite direction, and no existing identical edge.
fn compatible_port_at(
    graph: &GraphModel,
    camera: &Camera,
    world: Point,
    node_id: &str,
    port_id: &str,
    direction: PortDirection,
) -> Option<(NodeId, &'static str)> {
    let visibility = Visibility::compute(graph);
    let Some(Hit::Node { node_id: other, part: HitPart::Port { port_id: other_port, direction: other_dir } }) =
        hit_test(world, graph, camera, &visibility)
    else {
        return None;
    };
    if other == node_id || other_dir != direction.opposite() {
        return None;
    }
    let duplicate = match direction {
        PortDirection::Output => graph.has_edge(node_id, port_id, &other, other_port),
        PortDirection::Input => graph.has_edge(&other, other_port, node_id, port_id),
    };
    if duplicate { None } else { Some((other, other_port)) }
}

/// Write a new size into a resizable node's configuration, clamped to its minimum.
fn resize_node(graph: &mut GraphModel, node_id: &str, size: Size) {
    let Some(variant) = graph.node(node_id).map(Node::variant) else {
        return;
    };
    let (Some((w_key, h_key)), Some(min)) = (variant.size_keys(), variant.min_size()) else {
        return;
    };
    let size = size.max(min);
    let mut patch = Map::new();
    patch.insert(w_key.to_owned(), json!(size.width));
    patch.insert(h_key.to_owned(), json!(size.height));
    graph.configure_node(node_id, &patch);
}
