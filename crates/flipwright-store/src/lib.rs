//! Flipwright Store
//!
//! This crate provides the storage trait and a KV-backed implementation for
//! local flip drafts. One draft exists per word pair.
//!
//! The [`DraftStore`] trait defines operations for:
//! - Listing drafts and the pairs they claim
//! - Saving and deleting drafts
//!
//! The workflow core only reads pending drafts (to avoid reissuing a
//! claimed pair). Writes are made by the caller when a flip is abandoned,
//! submitted, or confirmed.

mod kv;
mod types;

pub use kv::KvDraftStore;
pub use types::{Draft, DraftStatus, PendingDraft};

use async_trait::async_trait;
use flipwright_flip::PairId;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The requested record was not found.
  #[error("draft not found for pair {0}")]
  NotFound(PairId),

  #[error("kv error: {0}")]
  Kv(#[from] flipwright_host_kv::KvError),

  #[error("failed to (de)serialize drafts: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// Storage trait for flip drafts.
#[async_trait]
pub trait DraftStore: Send + Sync {
  /// List every stored draft.
  async fn list_drafts(&self) -> Result<Vec<Draft>, StoreError>;

  /// Get the draft for a word pair.
  async fn get_draft(&self, pair_id: PairId) -> Result<Draft, StoreError>;

  /// Pairs claimed by drafts that were submitted but not yet synced.
  async fn list_pending_drafts(&self) -> Result<Vec<PendingDraft>, StoreError>;

  /// Insert or replace the draft for `draft.pair_id`.
  async fn save_draft(&self, draft: &Draft) -> Result<(), StoreError>;

  /// Delete the draft for a word pair. Deleting a missing draft is a no-op.
  async fn delete_draft(&self, pair_id: PairId) -> Result<(), StoreError>;
}
