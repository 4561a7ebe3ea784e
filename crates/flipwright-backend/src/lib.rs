//! Flipwright Backend
//!
//! Interfaces of the collaborators the flip workflow consumes but does not
//! own: the word pair source, community translations, the image search
//! backend and the publish/confirmation backend. The network client that
//! implements them lives outside this workspace.
//!
//! The [`memory`] module provides in-memory implementations used by the
//! tests and the CLI demo.

pub mod memory;
mod traits;

pub use traits::{
  BackendError, ConfirmationStatus, ConfirmationStream, ImageSearchBackend, PairSource,
  PublishBackend, PublishRequest, TranslationSource,
};
