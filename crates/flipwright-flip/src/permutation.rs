//! Slot order permutations.

use rand::Rng;

use crate::error::ShuffleError;

/// Resampling attempts before falling back to a rotation.
const MAX_RESAMPLES: usize = 64;

/// Identity order `[0, 1, .., slots - 1]`.
pub fn identity_order(slots: usize) -> Vec<usize> {
  (0..slots).collect()
}

/// Whether `order` contains every element of `original` exactly once.
pub fn is_bijection(order: &[usize], original: &[usize]) -> bool {
  if order.len() != original.len() {
    return false;
  }
  let mut a = order.to_vec();
  let mut b = original.to_vec();
  a.sort_unstable();
  b.sort_unstable();
  a == b && b.windows(2).all(|w| w[0] != w[1])
}

pub fn validate_order(order: &[usize], original: &[usize]) -> Result<(), ShuffleError> {
  if is_bijection(order, original) {
    Ok(())
  } else {
    Err(ShuffleError::NotABijection {
      order: order.to_vec(),
      original: original.to_vec(),
    })
  }
}

/// Shuffle `original` into a permutation that differs from it.
///
/// Uniform Fisher–Yates, resampled while the result equals `original`. For
/// two slots the only possible result is the swap.
pub fn shuffle_order<R: Rng + ?Sized>(
  original: &[usize],
  rng: &mut R,
) -> Result<Vec<usize>, ShuffleError> {
  if original.len() < 2 {
    return Err(ShuffleError::TooFewSlots {
      slots: original.len(),
    });
  }

  for _ in 0..MAX_RESAMPLES {
    let mut order = original.to_vec();
    for i in (1..order.len()).rev() {
      let j = rng.gen_range(0..=i);
      order.swap(i, j);
    }
    if order != original {
      return Ok(order);
    }
  }

  // Only reachable with a degenerate rng.
  let mut order = original.to_vec();
  order.rotate_left(1);
  Ok(order)
}
