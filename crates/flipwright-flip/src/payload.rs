use std::fmt;

use serde::{Deserialize, Serialize};

use crate::image::ImageBlob;
use crate::keywords::{Keywords, PairId};

/// Hash of a published flip transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
  pub fn new(hash: impl Into<String>) -> Self {
    Self(hash.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for TxHash {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Externally supplied private key used to sign the publish transaction.
///
/// The key is never printed: `Debug` and `Display` redact it.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey(String);

impl SigningKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for SigningKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SigningKey(<redacted>)")
  }
}

impl fmt::Display for SigningKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("<redacted>")
  }
}

/// Snapshot of the context handed to the submission controller.
///
/// Images may still contain gaps here; the controller validates before
/// anything is published.
#[derive(Debug, Clone, PartialEq)]
pub struct FlipSubmission {
  pub epoch: u64,
  pub pair_id: PairId,
  pub keywords: Keywords,
  pub images: Vec<Option<ImageBlob>>,
  pub original_order: Vec<usize>,
  pub order: Vec<usize>,
  pub signing_key: SigningKey,
}

/// The validated artifact that is serialized into the publish call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlipPayload {
  pub epoch: u64,
  pub pair_id: PairId,
  pub keywords: Keywords,
  pub images: Vec<ImageBlob>,
  pub original_order: Vec<usize>,
  pub order: Vec<usize>,
}
