//! Flipwright Config
//!
//! This crate contains the serializable configuration types for the flip
//! workflow. A single [`FlipConfig`] document describes the slot layout of a
//! flip, how decoy images are searched for and synthesized, how long the
//! submission controller keeps watching for a confirmation, and how the
//! runner sizes its event channel.
//!
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=flip.json`)
//! - In-memory JSON strings (tests, embedding callers)
//!
//! Every section is optional; missing sections fall back to their defaults.

mod error;
mod flip;
mod sections;

pub use error::ConfigError;
pub use flip::{DecoySlot, FlipConfig, MAX_SLOTS, MIN_SLOTS};
pub use sections::{ConfirmationConfig, DecoyConfig, RunnerConfig, SearchConfig};
