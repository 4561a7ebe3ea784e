use chrono::{DateTime, Utc};
use flipwright_flip::{ImageBlob, Keywords, PairId, TxHash, WorkflowContext};
use serde::{Deserialize, Serialize};

/// Status of a locally stored flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
  /// Being edited; does not claim its pair.
  Draft,
  /// Submitted, waiting for the network to confirm.
  Publishing,
  /// Confirmed on chain.
  Published,
}

/// A locally persisted flip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
  pub pair_id: PairId,
  pub status: DraftStatus,
  pub keywords: Keywords,
  pub images: Vec<Option<ImageBlob>>,
  #[serde(default)]
  pub protected_images: Vec<Option<ImageBlob>>,
  pub adversarial_image_id: Option<usize>,
  pub order: Vec<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tx_hash: Option<TxHash>,
  pub created_at: DateTime<Utc>,
  pub modified_at: DateTime<Utc>,
}

impl Draft {
  /// Capture the resumable parts of a workflow.
  ///
  /// Returns `None` before a pair has been assigned.
  pub fn from_context(ctx: &WorkflowContext, status: DraftStatus) -> Option<Self> {
    let pair = ctx.current_pair()?;
    let now = Utc::now();
    Some(Self {
      pair_id: pair.id,
      status,
      keywords: ctx.keywords.clone(),
      images: ctx.images.clone(),
      protected_images: ctx.protected_images.clone(),
      adversarial_image_id: ctx.adversarial_image_id,
      order: ctx.order.clone(),
      tx_hash: ctx.tx_hash.clone(),
      created_at: now,
      modified_at: now,
    })
  }

  pub fn is_pending(&self) -> bool {
    self.status == DraftStatus::Publishing
  }
}

/// A pair claimed by a pending draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDraft {
  pub pair_id: PairId,
}
