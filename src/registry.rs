//! Node type registry.
//!
//! Every node carries an open-ended `type` string (`"http-request"`,
//! `"telegram-trigger"`, `"note"`, ...). Behaviour that depends on the type
//! (default size, resizability, port schema, palette icon) is looked up once
//! through the closed [`NodeVariant`] enum instead of matching strings at each
//! call site.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH, FRAME_HEIGHT, FRAME_WIDTH, NOTE_HEIGHT, NOTE_MIN_HEIGHT, NOTE_MIN_WIDTH,
    NOTE_WIDTH, TABLE_HEIGHT, TABLE_MIN_HEIGHT, TABLE_MIN_WIDTH, TABLE_WIDTH,
};

/// Width/height pair in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Component-wise maximum.
    #[must_use]
    pub fn max(self, other: Size) -> Size {
        Size::new(self.width.max(other.width), self.height.max(other.height))
    }
}

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Input => Self::Output,
            Self::Output => Self::Input,
        }
    }
}

/// A statically declared port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub id: &'static str,
    pub direction: PortDirection,
}

const STANDARD_PORTS: &[PortSpec] = &[
    PortSpec { id: "input", direction: PortDirection::Input },
    PortSpec { id: "output", direction: PortDirection::Output },
];

const BRANCH_PORTS: &[PortSpec] = &[
    PortSpec { id: "input", direction: PortDirection::Input },
    PortSpec { id: "true", direction: PortDirection::Output },
    PortSpec { id: "false", direction: PortDirection::Output },
];

const TRIGGER_PORTS: &[PortSpec] = &[PortSpec { id: "output", direction: PortDirection::Output }];

/// Trigger types that fire on demand rather than holding a live connection.
const ON_DEMAND_TRIGGERS: &[&str] = &["manual-trigger", "chat-trigger", "http-trigger"];

/// Closed set of node behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVariant {
    /// Ordinary processing node with one input and one output.
    Standard,
    /// Conditional node with `true` / `false` outputs.
    Branch,
    /// Entry point of a workflow. Persistent triggers hold a live external
    /// connection (bot, webhook) whose health is polled.
    Trigger { persistent: bool },
    /// Free-text sticky note.
    Note,
    /// Editable data table.
    Table,
    /// Spatial grouping container.
    Frame,
}

impl NodeVariant {
    /// Resolve a node's `type` string. Matching is case-insensitive.
    #[must_use]
    pub fn from_type(node_type: &str) -> Self {
        let ty = node_type.trim().to_ascii_lowercase();
        match ty.as_str() {
            "note" => Self::Note,
            "table" => Self::Table,
            "frame" => Self::Frame,
            "condition" | "if" | "switch" => Self::Branch,
            other if other.ends_with("-trigger") || other == "trigger" => Self::Trigger {
                persistent: !ON_DEMAND_TRIGGERS.contains(&other) && other != "trigger",
            },
            _ => Self::Standard,
        }
    }

    /// Size used when the node carries no overrides.
    #[must_use]
    pub fn default_size(self) -> Size {
        match self {
            Self::Standard | Self::Branch | Self::Trigger { .. } => Size::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT),
            Self::Note => Size::new(NOTE_WIDTH, NOTE_HEIGHT),
            Self::Table => Size::new(TABLE_WIDTH, TABLE_HEIGHT),
            Self::Frame => Size::new(FRAME_WIDTH, FRAME_HEIGHT),
        }
    }

    /// Minimum size for user-resizable variants; `None` for fixed-size ones.
    #[must_use]
    pub fn min_size(self) -> Option<Size> {
        match self {
            Self::Note => Some(Size::new(NOTE_MIN_WIDTH, NOTE_MIN_HEIGHT)),
            Self::Table => Some(Size::new(TABLE_MIN_WIDTH, TABLE_MIN_HEIGHT)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resizable(self) -> bool {
        self.min_size().is_some()
    }

    /// Configuration keys holding the width/height override, if any.
    #[must_use]
    pub fn size_keys(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::Note => Some(("noteWidth", "noteHeight")),
            Self::Table => Some(("tableWidth", "tableHeight")),
            Self::Frame => Some(("frameWidth", "frameHeight")),
            _ => None,
        }
    }

    /// Configuration key holding inline-editable text, if the variant has one.
    #[must_use]
    pub fn editable_text_key(self) -> Option<&'static str> {
        match self {
            Self::Frame => Some("frameLabel"),
            Self::Note => Some("noteBody"),
            _ => None,
        }
    }

    /// Declared ports in display order.
    #[must_use]
    pub fn ports(self) -> &'static [PortSpec] {
        match self {
            Self::Standard => STANDARD_PORTS,
            Self::Branch => BRANCH_PORTS,
            Self::Trigger { .. } => TRIGGER_PORTS,
            Self::Note | Self::Table | Self::Frame => &[],
        }
    }

    #[must_use]
    pub fn is_frame(self) -> bool {
        matches!(self, Self::Frame)
    }

    #[must_use]
    pub fn is_persistent_trigger(self) -> bool {
        matches!(self, Self::Trigger { persistent: true })
    }

    /// Accent colour used when the node has no `color` configured.
    #[must_use]
    pub fn default_color(self) -> &'static str {
        match self {
            Self::Standard => "#3B82F6",
            Self::Branch => "#8B5CF6",
            Self::Trigger { .. } => "#F59E0B",
            Self::Note => "#FACC15",
            Self::Table => "#0EA5E9",
            Self::Frame => "#64748B",
        }
    }
}

/// Icon name for a node type, or `None` when no icon is registered for it.
#[must_use]
pub fn icon_for(node_type: &str) -> Option<&'static str> {
    let ty = node_type.trim().to_ascii_lowercase();
    let icon = match ty.as_str() {
        "agent" => "bot",
        "llm" => "sparkles",
        "http-request" => "globe",
        "code" => "code",
        "delay" => "clock",
        "email" => "mail",
        "condition" | "if" | "switch" => "git-branch",
        "note" => "sticky-note",
        "table" => "table",
        "frame" => "frame",
        other if other.ends_with("-trigger") || other == "trigger" => "zap",
        _ => return None,
    };
    Some(icon)
}
