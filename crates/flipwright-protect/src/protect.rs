use flipwright_flip::ImageBlob;
use rand::Rng;

use crate::error::ProtectionError;

/// Everything the protect step reads from the workflow context.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectInput {
  pub images: Vec<Option<ImageBlob>>,
  pub adversarial_images: Vec<Option<ImageBlob>>,
  pub adversarial_image_id: Option<usize>,
  pub candidates: Vec<ImageBlob>,
}

/// Finalize one image per slot.
///
/// The locked decoy slot receives its adversarial image, falling back to
/// the first decoy candidate and then to `placeholder`. Every other slot
/// copies the user's image through unchanged.
pub fn protect_images(
  input: &ProtectInput,
  placeholder: &ImageBlob,
) -> Result<Vec<Option<ImageBlob>>, ProtectionError> {
  let slots = input.images.len();
  if input.adversarial_images.len() != slots {
    return Err(ProtectionError::SlotMismatch {
      images: slots,
      adversarial: input.adversarial_images.len(),
    });
  }
  if let Some(index) = input.adversarial_image_id
    && index >= slots
  {
    return Err(ProtectionError::InvalidDecoySlot { index, slots });
  }

  let mut protected = Vec::with_capacity(slots);
  for (index, image) in input.images.iter().enumerate() {
    let finalized = if input.adversarial_image_id == Some(index) {
      input.adversarial_images[index]
        .clone()
        .or_else(|| input.candidates.first().cloned())
        .unwrap_or_else(|| placeholder.clone())
    } else {
      image.clone().ok_or(ProtectionError::MissingImage { index })?
    };
    protected.push(Some(finalized));
  }

  Ok(protected)
}

/// Pick a decoy candidate other than `current`.
///
/// Returns `None` when no alternative exists.
pub fn pick_decoy<R: Rng + ?Sized>(
  candidates: &[ImageBlob],
  current: Option<&ImageBlob>,
  rng: &mut R,
) -> Option<ImageBlob> {
  let alternatives: Vec<&ImageBlob> = candidates
    .iter()
    .filter(|candidate| Some(*candidate) != current)
    .collect();

  if alternatives.is_empty() {
    return None;
  }
  let index = rng.gen_range(0..alternatives.len());
  Some(alternatives[index].clone())
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  fn blob(tag: u8) -> ImageBlob {
    ImageBlob::png(vec![tag])
  }

  fn input() -> ProtectInput {
    ProtectInput {
      images: vec![Some(blob(1)), Some(blob(2)), Some(blob(3))],
      adversarial_images: vec![None, None, None],
      adversarial_image_id: Some(2),
      candidates: vec![blob(10), blob(11)],
    }
  }

  #[test]
  fn test_decoy_slot_takes_first_candidate() {
    let protected = protect_images(&input(), &blob(0)).unwrap();
    assert_eq!(protected, vec![Some(blob(1)), Some(blob(2)), Some(blob(10))]);
  }

  #[test]
  fn test_adversarial_image_wins_over_candidates() {
    let mut input = input();
    input.adversarial_images[2] = Some(blob(42));
    let protected = protect_images(&input, &blob(0)).unwrap();
    assert_eq!(protected[2], Some(blob(42)));
  }

  #[test]
  fn test_placeholder_without_candidates() {
    let mut input = input();
    input.candidates.clear();
    let protected = protect_images(&input, &blob(0)).unwrap();
    assert_eq!(protected[2], Some(blob(0)));
  }

  #[test]
  fn test_unlocked_decoy_copies_images() {
    let mut input = input();
    input.adversarial_image_id = None;
    let protected = protect_images(&input, &blob(0)).unwrap();
    assert_eq!(protected, input.images);
  }

  #[test]
  fn test_decoy_slot_may_be_empty() {
    let mut input = input();
    input.images[2] = None;
    assert!(protect_images(&input, &blob(0)).is_ok());
  }

  #[test]
  fn test_missing_image_fails() {
    let mut input = input();
    input.images[0] = None;
    assert_eq!(
      protect_images(&input, &blob(0)).unwrap_err(),
      ProtectionError::MissingImage { index: 0 }
    );
  }

  #[test]
  fn test_mismatched_slots_fail() {
    let mut input = input();
    input.adversarial_images.pop();
    assert!(matches!(
      protect_images(&input, &blob(0)),
      Err(ProtectionError::SlotMismatch { images: 3, adversarial: 2 })
    ));
  }

  #[test]
  fn test_out_of_range_decoy_slot_fails() {
    let mut input = input();
    input.adversarial_image_id = Some(3);
    assert!(matches!(
      protect_images(&input, &blob(0)),
      Err(ProtectionError::InvalidDecoySlot { index: 3, slots: 3 })
    ));
  }

  #[test]
  fn test_protect_is_idempotent() {
    let input = input();
    let first = protect_images(&input, &blob(0)).unwrap();
    let second = protect_images(&input, &blob(0)).unwrap();
    assert_eq!(first, second);
  }

  #[test]
  fn test_pick_decoy_avoids_current() {
    let candidates = vec![blob(10), blob(11)];
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..20 {
      let picked = pick_decoy(&candidates, Some(&blob(10)), &mut rng);
      assert_eq!(picked, Some(blob(11)));
    }
  }

  #[test]
  fn test_pick_decoy_without_alternatives() {
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(pick_decoy(&[blob(10)], Some(&blob(10)), &mut rng), None);
    assert_eq!(pick_decoy(&[], None, &mut rng), None);
  }
}
