//! Shared numeric constants for the canvas crate.

// ── Viewport ────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.1;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 4.0;

/// Zoom multiplier applied per wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Grid ────────────────────────────────────────────────────────

/// Default snapping step in world units.
pub const GRID_STEP: f64 = 20.0;

// ── Node dimensions ─────────────────────────────────────────────

pub const DEFAULT_NODE_WIDTH: f64 = 200.0;
pub const DEFAULT_NODE_HEIGHT: f64 = 80.0;

pub const NOTE_WIDTH: f64 = 220.0;
pub const NOTE_HEIGHT: f64 = 160.0;
pub const NOTE_MIN_WIDTH: f64 = 120.0;
pub const NOTE_MIN_HEIGHT: f64 = 80.0;

pub const TABLE_WIDTH: f64 = 320.0;
pub const TABLE_HEIGHT: f64 = 200.0;
pub const TABLE_MIN_WIDTH: f64 = 160.0;
pub const TABLE_MIN_HEIGHT: f64 = 100.0;

pub const FRAME_WIDTH: f64 = 400.0;
pub const FRAME_HEIGHT: f64 = 300.0;
pub const FRAME_COLLAPSED_WIDTH: f64 = 240.0;
pub const FRAME_COLLAPSED_HEIGHT: f64 = 64.0;

/// Height of the label strip along the top edge of a frame, in world units.
pub const FRAME_LABEL_HEIGHT: f64 = 28.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for ports.
pub const PORT_RADIUS_PX: f64 = 8.0;

/// Screen-space size of the bottom-right resize handle.
pub const RESIZE_HANDLE_PX: f64 = 12.0;

/// Screen-space distance within which an edge counts as hovered.
pub const EDGE_HIT_SLOP_PX: f64 = 6.0;

// ── Frames ──────────────────────────────────────────────────────

/// Number of member previews shown on a collapsed frame.
pub const DEFAULT_PREVIEW_LIMIT: usize = 4;

// ── Polling ─────────────────────────────────────────────────────

/// Trigger status polling interval.
pub const TRIGGER_POLL_INTERVAL_MS: u64 = 5_000;
