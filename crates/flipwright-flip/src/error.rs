use thiserror::Error;

/// No word pair could be assigned to a new flip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
  #[error("no available word pairs ({total} total, {used} used, {pending} pending)")]
  NoAvailablePairs {
    total: usize,
    used: usize,
    pending: usize,
  },

  #[error("failed to load word pairs: {message}")]
  Source { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShuffleError {
  #[error("cannot shuffle {slots} slot(s), at least 2 are required")]
  TooFewSlots { slots: usize },

  #[error("order {order:?} is not a permutation of {original:?}")]
  NotABijection {
    order: Vec<usize>,
    original: Vec<usize>,
  },
}
