use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtectionError {
  #[error("slot {index} has no image")]
  MissingImage { index: usize },

  #[error("slot count mismatch: {images} images, {adversarial} adversarial images")]
  SlotMismatch { images: usize, adversarial: usize },

  #[error("decoy slot {index} is out of range for {slots} slots")]
  InvalidDecoySlot { index: usize, slots: usize },

  #[error("failed to decode image: {message}")]
  Decode { message: String },

  #[error("failed to encode image: {message}")]
  Encode { message: String },

  #[error("protect task failed: {message}")]
  Join { message: String },
}
