use flipwright_engine::{FlipEvent, FlipState};
use flipwright_flip::WorkflowContext;
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::error::RunnerError;

/// Read-only view of a flip after an event was applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlipSnapshot {
  pub state: FlipState,
  pub label: String,
  pub context: WorkflowContext,
}

/// Caller side of a runner: send events, observe snapshots.
#[derive(Clone)]
pub struct FlipHandle {
  sender: mpsc::Sender<FlipEvent>,
  snapshot: watch::Receiver<FlipSnapshot>,
}

impl FlipHandle {
  pub(crate) fn new(sender: mpsc::Sender<FlipEvent>, snapshot: watch::Receiver<FlipSnapshot>) -> Self {
    Self { sender, snapshot }
  }

  pub async fn send(&self, event: FlipEvent) -> Result<(), RunnerError> {
    self
      .sender
      .send(event)
      .await
      .map_err(|_| RunnerError::ChannelClosed)
  }

  pub fn snapshot(&self) -> FlipSnapshot {
    self.snapshot.borrow().clone()
  }

  pub fn state_label(&self) -> String {
    self.snapshot.borrow().label.clone()
  }

  /// Wait until a snapshot satisfies `predicate`.
  ///
  /// Checks the current snapshot first. Fails once the runner has stopped
  /// without the predicate holding.
  pub async fn wait_for(
    &self,
    mut predicate: impl FnMut(&FlipSnapshot) -> bool,
  ) -> Result<FlipSnapshot, RunnerError> {
    let mut receiver = self.snapshot.clone();
    let snapshot = receiver
      .wait_for(|snapshot| predicate(snapshot))
      .await
      .map_err(|_| RunnerError::ChannelClosed)?;
    Ok(snapshot.clone())
  }

  /// Wait until the state is `path` or one of its children.
  pub async fn wait_for_state(&self, path: &str) -> Result<FlipSnapshot, RunnerError> {
    self.wait_for(|snapshot| snapshot.state.matches(path)).await
  }
}
