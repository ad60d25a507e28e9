//! Canvas session: binds one engine to its backend for the canvas lifetime.
//!
//! DESIGN
//! ======
//! The session owns the engine, the execution sync and the trigger poller.
//! `attach` is the connect hook: it loads trigger definitions, starts polling
//! and restores the latest execution. `detach` is the disconnect hook: it
//! stops the poller and releases any document listeners the engine holds.
//!
//! Async calls fetch first and merge afterwards, always through `&mut self`,
//! so the engine is never shared with a background task. The poller's results
//! come back through [`CanvasSession::drain_trigger_updates`].
//!
//! Polling follows the graph: after any change that emits `workflow-changed`
//! the poll targets are recomputed, and polling stops once the last
//! persistent-trigger node is gone.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::WorkflowBackend;
use crate::config::BackendConfig;
use crate::doc::Edge;
use crate::engine::{Action, DomainEvent, EngineCore};
use crate::poller::TriggerPoller;
use crate::sync::ExecutionSync;
use crate::triggers::{TriggerDef, TriggerKind, poll_targets, trigger_id_for};

pub struct CanvasSession {
    engine: EngineCore,
    backend: Arc<dyn WorkflowBackend>,
    sync: ExecutionSync,
    poller: TriggerPoller,
    trigger_defs: Vec<TriggerDef>,
}

impl CanvasSession {
    #[must_use]
    pub fn new(
        engine: EngineCore,
        backend: Arc<dyn WorkflowBackend>,
        workflow_id: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            sync: ExecutionSync::new(Arc::clone(&backend), workflow_id),
            poller: TriggerPoller::new(Arc::clone(&backend), poll_interval),
            backend,
            trigger_defs: Vec::new(),
        }
    }

    /// Session polling at the configured trigger interval.
    #[must_use]
    pub fn with_config(
        engine: EngineCore,
        backend: Arc<dyn WorkflowBackend>,
        workflow_id: impl Into<String>,
        config: &BackendConfig,
    ) -> Self {
        Self::new(engine, backend, workflow_id, config.poll_interval())
    }

    /// Read access to the engine. Mutations go through [`Self::dispatch`]
    /// so polling stays in step with the graph.
    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    #[must_use]
    pub fn workflow_id(&self) -> &str {
        self.sync.workflow_id()
    }

    #[must_use]
    pub fn trigger_defs(&self) -> &[TriggerDef] {
        &self.trigger_defs
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    // --- Lifecycle ---

    /// Connect hook. Must be called inside a tokio runtime.
    pub async fn attach(&mut self) -> Vec<Action> {
        info!(workflow_id = %self.workflow_id(), "canvas session attached");
        self.load_trigger_defs().await;
        self.refresh_polling();
        self.load_latest_execution().await
    }

    /// Disconnect hook.
    pub fn detach(&mut self) -> Vec<Action> {
        self.poller.stop();
        info!(workflow_id = %self.workflow_id(), "canvas session detached");
        self.engine.detach()
    }

    /// Run an engine call and keep polling in step with graph changes.
    pub fn dispatch<F>(&mut self, f: F) -> Vec<Action>
    where
        F: FnOnce(&mut EngineCore) -> Vec<Action>,
    {
        let actions = f(&mut self.engine);
        if actions.iter().any(|a| matches!(a, Action::Emit(DomainEvent::WorkflowChanged))) {
            self.refresh_polling();
        }
        actions
    }

    /// Replace the graph and recompute poll targets.
    pub fn load_snapshot(&mut self, nodes: Vec<Value>, edges: Vec<Edge>) -> Vec<Action> {
        let actions = self.engine.load_snapshot(nodes, edges);
        self.refresh_polling();
        actions
    }

    // --- Triggers ---

    /// Fetch the workflow's trigger definitions. On failure the previous
    /// definitions are kept.
    pub async fn load_trigger_defs(&mut self) {
        let fetched = self.backend.trigger_defs(self.sync.workflow_id()).await;
        match fetched {
            Ok(defs) => {
                debug!(defs = defs.len(), "trigger definitions loaded");
                self.trigger_defs = defs;
                self.refresh_polling();
            }
            Err(e) => warn!(workflow_id = %self.workflow_id(), error = %e, "trigger definitions fetch failed"),
        }
    }

    /// Start, restart or stop polling to match the persistent-trigger nodes
    /// currently on the canvas.
    pub fn refresh_polling(&mut self) {
        self.engine.triggers.prune(&self.engine.graph);
        let targets = poll_targets(&self.engine.graph, &self.trigger_defs);
        if targets.is_empty() {
            self.poller.stop();
        } else {
            self.poller.start(targets);
        }
    }

    /// Merge every trigger status the poller has delivered so far.
    pub fn drain_trigger_updates(&mut self) -> Vec<Action> {
        let mut changed = false;
        for update in self.poller.drain() {
            changed |= !self.engine.apply_trigger_status(&update.node_id, update.status).is_empty();
        }
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Activate or deactivate the trigger behind `node_id`.
    pub async fn toggle_trigger(&mut self, node_id: &str, active: bool) -> Vec<Action> {
        let Some(trigger_id) = self.trigger_id(node_id) else {
            debug!(node_id, "toggle for unknown node ignored");
            return Vec::new();
        };
        if let Err(e) = self.backend.set_trigger_active(&trigger_id, active).await {
            warn!(node_id, %trigger_id, active, error = %e, "trigger toggle failed");
            return Vec::new();
        }
        vec![Action::Emit(DomainEvent::TriggerToggle { node_id: node_id.to_owned(), trigger_id, active })]
    }

    /// Enter or leave dev mode for the trigger behind `node_id`. Returns
    /// whether the backend accepted.
    pub async fn set_dev_mode(&mut self, node_id: &str, enabled: bool) -> bool {
        let Some(trigger_id) = self.trigger_id(node_id) else {
            return false;
        };
        match self.backend.set_dev_mode(&trigger_id, enabled).await {
            Ok(()) => true,
            Err(e) => {
                warn!(node_id, %trigger_id, enabled, error = %e, "dev mode change failed");
                false
            }
        }
    }

    fn trigger_id(&self, node_id: &str) -> Option<String> {
        self.engine.graph.node(node_id).map(|n| trigger_id_for(n, &self.trigger_defs))
    }

    // --- Executions ---

    /// Start a run through a chat or HTTP trigger. A returned execution id
    /// becomes the active execution so live events for it are accepted.
    pub async fn trigger_workflow(&mut self, kind: TriggerKind, body: Value) -> Vec<Action> {
        let Some(execution_id) = self.sync.trigger(kind, body).await else {
            return Vec::new();
        };
        let mut actions = match &execution_id {
            Some(id) => self.engine.set_active_execution(Some(id.clone())),
            None => Vec::new(),
        };
        actions.push(Action::Emit(DomainEvent::WorkflowTrigger { kind, execution_id }));
        actions
    }

    /// Re-run one node of the active execution. Status is left to the live
    /// events that follow.
    pub async fn retry_node(&mut self, node_id: &str) -> Vec<Action> {
        let Some(execution_id) = self.engine.overlay.active_execution_id().map(str::to_owned) else {
            debug!(node_id, "retry without an active execution ignored");
            return Vec::new();
        };
        if !self.sync.retry(&execution_id, node_id).await {
            return Vec::new();
        }
        vec![Action::Emit(DomainEvent::NodeRetry { execution_id, node_id: node_id.to_owned() })]
    }

    /// Config-panel hook: backfill history for a node that has no live status.
    pub async fn open_config_panel(&mut self, node_id: &str) -> Vec<Action> {
        if self.engine.overlay.has_live_status(node_id) {
            return Vec::new();
        }
        let Some(execution_id) = self.engine.overlay.active_execution_id().map(str::to_owned) else {
            return Vec::new();
        };
        match self.sync.fetch_history(&execution_id).await {
            Some(records) => self.engine.merge_history(&execution_id, records),
            None => Vec::new(),
        }
    }

    /// Make the most recent execution active and merge its records.
    pub async fn load_latest_execution(&mut self) -> Vec<Action> {
        let Some((execution_id, records)) = self.sync.load_latest().await else {
            return Vec::new();
        };
        let mut actions = self.engine.set_active_execution(Some(execution_id.clone()));
        actions.extend(self.engine.merge_history(&execution_id, records));
        actions
    }
}
