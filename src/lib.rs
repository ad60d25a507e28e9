//! Headless core of a workflow canvas.
//!
//! The host (a browser shell or desktop window) owns the surface and forwards
//! raw pointer, keyboard and wheel events into [`engine::EngineCore`]. The
//! engine mutates the workflow graph, tracks camera and selection state, and
//! answers every event with [`engine::Action`]s for the host to carry out.
//! [`render::build_scene`] turns the current state into a plain scene model;
//! drawing it is the host's job. [`session::CanvasSession`] binds an engine to
//! the workflow backend: execution history, retries, on-demand runs and the
//! trigger-status poller.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Event entry points, [`engine::Action`]s and domain events |
//! | [`input`] | Input event types, UI state and the interaction state machine |
//! | [`listeners`] | Document-listener guard (one detach per attach) |
//! | [`camera`] | Pan/zoom camera, coordinate conversions, `Point`/`Rect` |
//! | [`doc`] | Graph model: nodes, edges, dimensions, port anchors |
//! | [`registry`] | Node variants, port schemas, sizes and icons |
//! | [`hit`] | Hit-testing of ports, handles, nodes and edges |
//! | [`containment`] | Frame membership, aggregated ports/status, previews |
//! | [`overlay`] | Execution status cache and socket event decoding |
//! | [`triggers`] | Trigger definitions, statuses and poll targets |
//! | [`render`] | Scene model built from the engine |
//! | [`presence`] | Remote-collaborator queries |
//! | [`api`] | REST backend trait and HTTP client |
//! | [`sync`] | Execution history, retry and run requests |
//! | [`poller`] | Background trigger-status polling |
//! | [`session`] | Attach/detach lifecycle tying it all together |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared numeric constants (zoom limits, node sizes, etc.) |

pub mod api;
pub mod camera;
pub mod config;
pub mod consts;
pub mod containment;
pub mod doc;
pub mod engine;
pub mod hit;
pub mod input;
pub mod listeners;
pub mod overlay;
pub mod poller;
pub mod presence;
pub mod registry;
pub mod render;
pub mod session;
pub mod sync;
pub mod triggers;

#[cfg(test)]
#[path = "backend_fake_test.rs"]
pub(crate) mod backend_fake;
