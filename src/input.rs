//! Input model: modifier keys, mouse buttons, and the interaction state machine.
//!
//! `Modifiers`, `Button`, `Key` and `WheelDelta` capture raw host events.
//! `InteractionState` is the single active gesture tracked between
//! pointer-down and pointer-up (or, for inline editing, between double-click
//! and commit), carrying all context needed to compute deltas, revert on
//! cancel, and emit the final mutation on release. `UiState` is persistent
//! view state visible to the renderer.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::camera::Point;
use crate::doc::{EdgeId, NodeId};
use crate::registry::{PortDirection, Size};

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone)]
pub struct UiState {
    /// Selected node ids, sorted by id. Always a subset of the graph's nodes.
    pub selection: BTreeSet<NodeId>,
    /// Selected edge, if any. Mutually exclusive with a node selection.
    pub selected_edge: Option<EdgeId>,
    /// Edge under the pointer while idle.
    pub hovered_edge: Option<EdgeId>,
    /// When set, dragging the background pans instead of drawing a marquee.
    pub pan_mode: bool,
    /// When cleared, pointer input is ignored.
    pub enabled: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self { selection: BTreeSet::new(), selected_edge: None, hovered_edge: None, pan_mode: false, enabled: true }
    }
}

/// The active interaction. Exactly one is active at a time.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    /// No gesture in progress; waiting for the next pointer-down.
    #[default]
    Idle,
    /// Moving one or more nodes together.
    DraggingNodes {
        /// Screen-space pointer position at pointer-down.
        start_screen: Point,
        /// World positions of every captured node at pointer-down.
        origins: Vec<(NodeId, Point)>,
    },
    /// Moving the viewport.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// Drawing a selection rectangle.
    MarqueeSelecting {
        start_screen: Point,
        current_screen: Point,
    },
    /// Dragging a new edge out of a port.
    ConnectingEdge {
        node_id: NodeId,
        port_id: &'static str,
        direction: PortDirection,
        /// Current pointer position; the transient curve ends here.
        pointer_world: Point,
        /// Compatible port currently under the pointer, if any.
        hover: Option<(NodeId, &'static str)>,
    },
    /// Dragging the bottom-right handle of a resizable node.
    Resizing {
        node_id: NodeId,
        start_screen: Point,
        start_size: Size,
        /// Size keys as they were at pointer-down; `Null` marks an absent key.
        previous: Map<String, Value>,
    },
    /// Editing a frame label or note body in place.
    EditingLabel {
        node_id: NodeId,
        /// Configuration key being edited.
        key: &'static str,
        draft: String,
        original: String,
    },
}

impl InteractionState {
    /// Whether this state tracks the pointer through document-level listeners.
    #[must_use]
    pub fn is_pointer_driven(&self) -> bool {
        !matches!(self, Self::Idle | Self::EditingLabel { .. })
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::DraggingNodes { .. } => "dragging_nodes",
            Self::Panning { .. } => "panning",
            Self::MarqueeSelecting { .. } => "marquee_selecting",
            Self::ConnectingEdge { .. } => "connecting_edge",
            Self::Resizing { .. } => "resizing",
            Self::EditingLabel { .. } => "editing_label",
        }
    }
}
