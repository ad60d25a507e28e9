//! Background trigger-status polling.
//!
//! The poller is the only background task in the crate. It owns a tokio task
//! that fetches the status of every target on a fixed interval and sends the
//! results back over an mpsc channel; the owner drains the channel and merges
//! the results, so the cache it feeds has a single writer. `start` and `stop`
//! are explicit, and dropping the poller stops it.

#[cfg(test)]
#[path = "poller_test.rs"]
mod poller_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::WorkflowBackend;
use crate::doc::NodeId;
use crate::triggers::{PollTarget, TriggerStatus};

/// One poll result.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerUpdate {
    pub node_id: NodeId,
    pub status: TriggerStatus,
}

pub struct TriggerPoller {
    backend: Arc<dyn WorkflowBackend>,
    interval: Duration,
    tx: mpsc::UnboundedSender<TriggerUpdate>,
    rx: mpsc::UnboundedReceiver<TriggerUpdate>,
    task: Option<JoinHandle<()>>,
    targets: Vec<PollTarget>,
}

impl TriggerPoller {
    #[must_use]
    pub fn new(backend: Arc<dyn WorkflowBackend>, interval: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { backend, interval, tx, rx, task: None, targets: Vec::new() }
    }

    /// Start polling `targets`, replacing any running task. Restarting with
    /// the same targets is a no-op. Must be called inside a tokio runtime.
    pub fn start(&mut self, targets: Vec<PollTarget>) {
        if self.is_running() && self.targets == targets {
            return;
        }
        self.stop();
        if targets.is_empty() {
            return;
        }
        info!(targets = targets.len(), interval = ?self.interval, "trigger polling started");
        self.targets.clone_from(&targets);
        self.task = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.backend),
            targets,
            self.interval,
            self.tx.clone(),
        )));
    }

    /// Abort the polling task, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("trigger polling stopped");
        }
        self.targets.clear();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    #[must_use]
    pub fn targets(&self) -> &[PollTarget] {
        &self.targets
    }

    /// Take every result received so far without waiting.
    pub fn drain(&mut self) -> Vec<TriggerUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = self.rx.try_recv() {
            updates.push(update);
        }
        updates
    }
}

impl Drop for TriggerPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    backend: Arc<dyn WorkflowBackend>,
    targets: Vec<PollTarget>,
    interval: Duration,
    tx: mpsc::UnboundedSender<TriggerUpdate>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        for target in &targets {
            match backend.trigger_status(&target.trigger_id).await {
                Ok(status) => {
                    let update = TriggerUpdate { node_id: target.node_id.clone(), status };
                    if tx.send(update).is_err() {
                        debug!("trigger poll receiver closed");
                        return;
                    }
                }
                Err(e) => {
                    warn!(node_id = %target.node_id, trigger_id = %target.trigger_id, error = %e, "trigger status poll failed");
                }
            }
        }
    }
}
