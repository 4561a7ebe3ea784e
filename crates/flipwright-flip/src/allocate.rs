//! Word pair allocation.

use std::collections::HashSet;

use crate::error::AllocationError;
use crate::keywords::{PairId, WordPair};

/// Result of allocating a pair for a new flip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
  /// Pairs the user may cycle through, in source order.
  pub available: Vec<WordPair>,
  /// Index into `available` of the pair assigned to the flip.
  pub keyword_pair_id: usize,
}

impl Allocation {
  pub fn pair(&self) -> &WordPair {
    &self.available[self.keyword_pair_id]
  }
}

/// Pairs that are neither used nor claimed by a pending draft.
pub fn available_pairs(pairs: &[WordPair], pending: &HashSet<PairId>) -> Vec<WordPair> {
  pairs
    .iter()
    .filter(|pair| !pair.used && !pending.contains(&pair.id))
    .cloned()
    .collect()
}

/// Assign the first available pair.
pub fn allocate_pair(pairs: &[WordPair], pending: &[PairId]) -> Result<Allocation, AllocationError> {
  let pending: HashSet<PairId> = pending.iter().copied().collect();
  let available = available_pairs(pairs, &pending);

  if available.is_empty() {
    return Err(AllocationError::NoAvailablePairs {
      total: pairs.len(),
      used: pairs.iter().filter(|p| p.used).count(),
      pending: pairs
        .iter()
        .filter(|p| !p.used && pending.contains(&p.id))
        .count(),
    });
  }

  Ok(Allocation {
    available,
    keyword_pair_id: 0,
  })
}

/// Next index when cycling through `len` pairs, wrapping around.
pub fn next_pair_index(current: usize, len: usize) -> usize {
  if len == 0 { 0 } else { (current + 1) % len }
}
