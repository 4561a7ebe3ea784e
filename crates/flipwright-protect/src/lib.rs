//! Adversarial image pipeline.
//!
//! Turns decoy search results into synthesized decoy candidates, runs the
//! protect step that finalizes one image per slot, and offers a manual
//! reshuffle of the decoy.
//!
//! ```text
//! search results ──► prepare() ──► decoy candidates
//!                                        │
//! images + adversarial images ──► protect() ──► protected images
//! ```
//!
//! [`protect_images`] is a pure function of its input; re-running it after
//! a failure recomputes everything from scratch.

mod error;
mod pipeline;
mod protect;
mod synth;

pub use error::ProtectionError;
pub use pipeline::AdversarialPipeline;
pub use protect::{ProtectInput, pick_decoy, protect_images};
pub use synth::{placeholder_image, synthesize_decoy};
