//! Runner events and notifiers for observability.

use flipwright_engine::Notification;
use flipwright_flip::TxHash;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted while a flip is being driven.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunnerEvent {
  /// The machine moved to another state.
  StateChanged {
    from: String,
    to: String,
    event: String,
  },

  /// A user-visible message raised by the machine.
  Notification(Notification),

  /// The flip was mined.
  Accepted { tx_hash: Option<TxHash> },
}

/// Trait for receiving runner events.
pub trait FlipNotifier: Send + Sync {
  fn notify(&self, event: RunnerEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FlipNotifier for NoopNotifier {
  fn notify(&self, _event: RunnerEvent) {
    // Intentionally empty
  }
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<RunnerEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<RunnerEvent>) -> Self {
    Self { sender }
  }
}

impl FlipNotifier for ChannelNotifier {
  fn notify(&self, event: RunnerEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
