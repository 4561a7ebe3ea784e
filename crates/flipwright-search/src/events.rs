//! Search outcome events and notifiers.

use flipwright_flip::ImageRef;
use tokio::sync::mpsc;

use crate::SearchError;

/// Outcome of a search generation.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
  Done {
    generation: u64,
    query: String,
    results: Vec<ImageRef>,
  },
  Failed {
    generation: u64,
    query: String,
    error: SearchError,
  },
}

impl SearchEvent {
  pub fn generation(&self) -> u64 {
    match self {
      SearchEvent::Done { generation, .. } | SearchEvent::Failed { generation, .. } => *generation,
    }
  }
}

/// Trait for receiving search outcomes.
///
/// Only outcomes of the current generation are delivered.
pub trait SearchNotifier: Send + Sync {
  fn notify(&self, event: SearchEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopSearchNotifier;

impl SearchNotifier for NoopSearchNotifier {
  fn notify(&self, _event: SearchEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSearchNotifier {
  sender: mpsc::UnboundedSender<SearchEvent>,
}

impl ChannelSearchNotifier {
  pub fn new(sender: mpsc::UnboundedSender<SearchEvent>) -> Self {
    Self { sender }
  }
}

impl SearchNotifier for ChannelSearchNotifier {
  fn notify(&self, event: SearchEvent) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
