use flipwright_engine::BAD_FLIP_FLAG;
use flipwright_flip::{Allocation, AllocationError, PairId, allocate_pair};
use tracing::{debug, warn};

use crate::services::Services;

/// Allocate a pair for a new flip.
///
/// Pairs claimed by pending drafts are skipped. Also reports whether the
/// bad flip rules were already dismissed.
pub async fn allocate(services: &Services) -> Result<(Allocation, bool), AllocationError> {
  let pairs = services
    .pairs
    .list_word_pairs()
    .await
    .map_err(|e| AllocationError::Source {
      message: e.to_string(),
    })?;

  let pending: Vec<PairId> = services
    .drafts
    .list_pending_drafts()
    .await
    .map_err(|e| AllocationError::Source {
      message: e.to_string(),
    })?
    .into_iter()
    .map(|draft| draft.pair_id)
    .collect();
  debug!(pairs = pairs.len(), pending = pending.len(), "allocating pair");

  let allocation = allocate_pair(&pairs, &pending)?;

  let did_show_bad_flip = match services.kv.get(BAD_FLIP_FLAG).await {
    Ok(value) => value.as_deref() == Some("true"),
    Err(e) => {
      warn!(error = %e, "failed to read bad flip flag");
      false
    }
  };

  Ok((allocation, did_show_bad_flip))
}
