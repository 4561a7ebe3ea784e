use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sections::{ConfirmationConfig, DecoyConfig, RunnerConfig, SearchConfig};

/// Smallest number of images a flip may have.
pub const MIN_SLOTS: usize = 2;
/// Largest number of images a flip may have.
pub const MAX_SLOTS: usize = 4;

/// Which slot starts out locked as the decoy slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoySlot {
  /// The last slot of the flip.
  #[default]
  Last,
  /// No slot is locked; the user picks one later.
  Unlocked,
  /// A specific slot index.
  Index(usize),
}

/// Top-level configuration for a flip workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipConfig {
  /// Number of image slots in the flip.
  pub slot_count: usize,
  pub decoy_slot: DecoySlot,
  /// Display locale for keyword translations.
  pub locale: String,
  pub search: SearchConfig,
  pub decoy: DecoyConfig,
  pub confirmation: ConfirmationConfig,
  pub runner: RunnerConfig,
}

impl Default for FlipConfig {
  fn default() -> Self {
    Self {
      slot_count: MAX_SLOTS,
      decoy_slot: DecoySlot::default(),
      locale: "en".to_string(),
      search: SearchConfig::default(),
      decoy: DecoyConfig::default(),
      confirmation: ConfirmationConfig::default(),
      runner: RunnerConfig::default(),
    }
  }
}

impl FlipConfig {
  /// Parse and validate a config from a JSON string.
  pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
    let config: FlipConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  /// Read, parse and validate a config file.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
      })?;
    Self::from_json_str(&content)
  }

  /// Resolve the initially locked decoy slot.
  pub fn decoy_slot(&self) -> Option<usize> {
    match self.decoy_slot {
      DecoySlot::Last => self.slot_count.checked_sub(1),
      DecoySlot::Unlocked => None,
      DecoySlot::Index(index) => Some(index),
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(MIN_SLOTS..=MAX_SLOTS).contains(&self.slot_count) {
      return Err(ConfigError::Invalid {
        field: "slot_count",
        message: format!(
          "must be between {} and {}, got {}",
          MIN_SLOTS, MAX_SLOTS, self.slot_count
        ),
      });
    }

    if let DecoySlot::Index(index) = self.decoy_slot
      && index >= self.slot_count
    {
      return Err(ConfigError::Invalid {
        field: "decoy_slot",
        message: format!("slot {} is out of range for {} slots", index, self.slot_count),
      });
    }

    if self.locale.trim().is_empty() {
      return Err(ConfigError::Invalid {
        field: "locale",
        message: "must not be empty".to_string(),
      });
    }

    if self.search.result_limit == 0 {
      return Err(ConfigError::Invalid {
        field: "search.result_limit",
        message: "must be at least 1".to_string(),
      });
    }
    if self.search.timeout_ms == 0 {
      return Err(ConfigError::Invalid {
        field: "search.timeout_ms",
        message: "must be at least 1".to_string(),
      });
    }

    if self.decoy.width == 0 || self.decoy.height == 0 {
      return Err(ConfigError::Invalid {
        field: "decoy",
        message: "width and height must be non-zero".to_string(),
      });
    }

    let confirmation = &self.confirmation;
    if confirmation.initial_backoff_ms > confirmation.max_backoff_ms {
      return Err(ConfigError::Invalid {
        field: "confirmation.initial_backoff_ms",
        message: "must not exceed max_backoff_ms".to_string(),
      });
    }
    if confirmation.max_attempts == Some(0) {
      return Err(ConfigError::Invalid {
        field: "confirmation.max_attempts",
        message: "must be at least 1 (use null for unbounded)".to_string(),
      });
    }

    if self.runner.channel_capacity == 0 {
      return Err(ConfigError::Invalid {
        field: "runner.channel_capacity",
        message: "must be at least 1".to_string(),
      });
    }

    Ok(())
  }
}
