use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the decoy image search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  /// Maximum number of search results kept as decoy candidates.
  pub result_limit: usize,
  /// Separator placed between the two keywords when building the query.
  pub query_separator: String,
  /// Upper bound for one search, and for each image fetched from its results.
  pub timeout_ms: u64,
}

impl SearchConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      result_limit: 8,
      query_separator: " ".to_string(),
      timeout_ms: 15_000,
    }
  }
}

/// Settings for decoy synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoyConfig {
  pub width: u32,
  pub height: u32,
  /// Fill colour of the blank placeholder used when no candidate exists.
  pub placeholder_rgb: [u8; 3],
}

impl Default for DecoyConfig {
  fn default() -> Self {
    Self {
      width: 440,
      height: 330,
      placeholder_rgb: [255, 255, 255],
    }
  }
}

/// Confirmation watching policy.
///
/// Each attempt subscribes to the confirmation stream and waits up to
/// `attempt_timeout_ms` for a terminal status. Between attempts the
/// controller backs off exponentially, starting at `initial_backoff_ms`
/// and capped at `max_backoff_ms`. `max_attempts = None` watches forever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
  pub initial_backoff_ms: u64,
  pub max_backoff_ms: u64,
  pub attempt_timeout_ms: u64,
  pub max_attempts: Option<u32>,
}

impl ConfirmationConfig {
  pub fn attempt_timeout(&self) -> Duration {
    Duration::from_millis(self.attempt_timeout_ms)
  }

  /// Backoff before the given (1-based) retry attempt.
  pub fn backoff(&self, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(32);
    let ms = self
      .initial_backoff_ms
      .saturating_mul(1u64 << shift)
      .min(self.max_backoff_ms);
    Duration::from_millis(ms)
  }
}

impl Default for ConfirmationConfig {
  fn default() -> Self {
    Self {
      initial_backoff_ms: 1_000,
      max_backoff_ms: 30_000,
      attempt_timeout_ms: 60_000,
      max_attempts: Some(8),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
  /// Capacity of the runner's inbound event channel.
  pub channel_capacity: usize,
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      channel_capacity: 100,
    }
  }
}
