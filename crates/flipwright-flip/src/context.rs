use serde::{Deserialize, Serialize};

use crate::image::ImageBlob;
use crate::keywords::{Keywords, WordPair};
use crate::payload::TxHash;
use crate::permutation::identity_order;

/// The single mutable aggregate of a flip workflow.
///
/// Owned exclusively by the orchestration engine; everyone else sees
/// read-only snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
  pub locale: String,
  pub epoch: Option<u64>,

  pub available_keywords: Vec<WordPair>,
  /// Index into `available_keywords`.
  pub keyword_pair_id: usize,
  pub keywords: Keywords,
  pub show_translation: bool,
  pub is_community_translations_expanded: bool,
  pub did_show_bad_flip: bool,

  /// One entry per slot, filled incrementally.
  pub images: Vec<Option<ImageBlob>>,
  /// Synthesized decoys, index-aligned with `images`.
  pub adversarial_images: Vec<Option<ImageBlob>>,
  /// Slot locked as the decoy target, `None` when the user unlocked it.
  pub adversarial_image_id: Option<usize>,
  /// Decoy candidates derived from the latest search results.
  pub decoy_candidates: Vec<ImageBlob>,
  /// A decoy search or candidate preparation is outstanding.
  pub decoy_search_pending: bool,
  pub did_show_shuffle_adversarial: bool,

  pub protected_images: Vec<Option<ImageBlob>>,

  pub original_order: Vec<usize>,
  pub order: Vec<usize>,

  pub tx_hash: Option<TxHash>,
}

impl WorkflowContext {
  pub fn new(locale: impl Into<String>, slot_count: usize, decoy_slot: Option<usize>) -> Self {
    let original_order = identity_order(slot_count);
    Self {
      locale: locale.into(),
      epoch: None,
      available_keywords: Vec::new(),
      keyword_pair_id: 0,
      keywords: Keywords::default(),
      show_translation: false,
      is_community_translations_expanded: false,
      did_show_bad_flip: false,
      images: vec![None; slot_count],
      adversarial_images: vec![None; slot_count],
      adversarial_image_id: decoy_slot.filter(|slot| *slot < slot_count),
      decoy_candidates: Vec::new(),
      decoy_search_pending: false,
      did_show_shuffle_adversarial: false,
      protected_images: vec![None; slot_count],
      order: original_order.clone(),
      original_order,
      tx_hash: None,
    }
  }

  pub fn slot_count(&self) -> usize {
    self.images.len()
  }

  /// The pair currently assigned to the flip.
  pub fn current_pair(&self) -> Option<&WordPair> {
    self.available_keywords.get(self.keyword_pair_id)
  }

  pub fn images_complete(&self) -> bool {
    self.images.iter().all(Option::is_some)
  }

  pub fn protected_complete(&self) -> bool {
    self.protected_images.iter().all(Option::is_some)
  }

  pub fn has_adversarial_image(&self) -> bool {
    self.adversarial_images.iter().any(Option::is_some)
  }

  /// Whether any slot holds user content worth keeping as a draft.
  pub fn has_content(&self) -> bool {
    self.images.iter().any(Option::is_some)
  }
}
