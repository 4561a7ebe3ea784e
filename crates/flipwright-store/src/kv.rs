use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use flipwright_flip::PairId;
use flipwright_host_kv::KvStore;
use tracing::debug;

use crate::types::{Draft, PendingDraft};
use crate::{DraftStore, StoreError};

/// Key under which the draft list is stored.
const DRAFTS_KEY: &str = "ownFlips";

/// Draft store keeping all drafts as one JSON array in a [`KvStore`].
#[derive(Clone)]
pub struct KvDraftStore {
  kv: Arc<dyn KvStore>,
}

impl KvDraftStore {
  pub fn new(kv: Arc<dyn KvStore>) -> Self {
    Self { kv }
  }

  async fn load(&self) -> Result<Vec<Draft>, StoreError> {
    match self.kv.get(DRAFTS_KEY).await? {
      Some(json) => Ok(serde_json::from_str(&json)?),
      None => Ok(Vec::new()),
    }
  }

  async fn store(&self, drafts: &[Draft]) -> Result<(), StoreError> {
    let json = serde_json::to_string(drafts)?;
    self.kv.set(DRAFTS_KEY, json).await?;
    Ok(())
  }
}

#[async_trait]
impl DraftStore for KvDraftStore {
  async fn list_drafts(&self) -> Result<Vec<Draft>, StoreError> {
    self.load().await
  }

  async fn get_draft(&self, pair_id: PairId) -> Result<Draft, StoreError> {
    self
      .load()
      .await?
      .into_iter()
      .find(|d| d.pair_id == pair_id)
      .ok_or(StoreError::NotFound(pair_id))
  }

  async fn list_pending_drafts(&self) -> Result<Vec<PendingDraft>, StoreError> {
    Ok(
      self
        .load()
        .await?
        .iter()
        .filter(|d| d.is_pending())
        .map(|d| PendingDraft { pair_id: d.pair_id })
        .collect(),
    )
  }

  async fn save_draft(&self, draft: &Draft) -> Result<(), StoreError> {
    let mut drafts = self.load().await?;
    match drafts.iter_mut().find(|d| d.pair_id == draft.pair_id) {
      Some(existing) => {
        let created_at = existing.created_at;
        *existing = draft.clone();
        existing.created_at = created_at;
        existing.modified_at = Utc::now();
      }
      None => drafts.push(draft.clone()),
    }
    debug!(pair_id = draft.pair_id, status = ?draft.status, "saving draft");
    self.store(&drafts).await
  }

  async fn delete_draft(&self, pair_id: PairId) -> Result<(), StoreError> {
    let mut drafts = self.load().await?;
    let before = drafts.len();
    drafts.retain(|d| d.pair_id != pair_id);
    if drafts.len() != before {
      debug!(pair_id, "deleting draft");
      self.store(&drafts).await?;
    }
    Ok(())
  }
}
