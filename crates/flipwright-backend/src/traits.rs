use async_trait::async_trait;
use flipwright_flip::{ImageBlob, ImageRef, PairId, SigningKey, Translation, TxHash, WordPair, WordRef};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
  /// The backend could not be reached.
  #[error("backend unavailable: {message}")]
  Unavailable { message: String },

  /// The backend refused the request (invalid, underfunded, duplicate).
  #[error("request rejected: {message}")]
  Rejected { message: String },

  #[error("not found: {0}")]
  NotFound(String),
}

impl BackendError {
  pub fn unavailable(message: impl Into<String>) -> Self {
    Self::Unavailable {
      message: message.into(),
    }
  }

  pub fn rejected(message: impl Into<String>) -> Self {
    Self::Rejected {
      message: message.into(),
    }
  }
}

/// Source of the word pairs assigned to the current identity.
#[async_trait]
pub trait PairSource: Send + Sync {
  async fn list_word_pairs(&self) -> Result<Vec<WordPair>, BackendError>;
}

/// Community translations of keywords.
#[async_trait]
pub trait TranslationSource: Send + Sync {
  /// Translations for each word, index-aligned with `words`.
  async fn fetch_translations(
    &self,
    words: &[WordRef],
    locale: &str,
  ) -> Result<Vec<Vec<Translation>>, BackendError>;

  async fn vote(&self, translation_id: &str, up: bool) -> Result<(), BackendError>;

  async fn suggest(
    &self,
    word_id: u64,
    name: &str,
    desc: &str,
    locale: &str,
  ) -> Result<Translation, BackendError>;
}

/// Image search used to find decoy material.
#[async_trait]
pub trait ImageSearchBackend: Send + Sync {
  async fn search(&self, query: &str) -> Result<Vec<ImageRef>, BackendError>;

  /// Download the image behind a search result.
  async fn fetch_image(&self, image: &ImageRef) -> Result<ImageBlob, BackendError>;
}

/// A serialized flip ready to be broadcast.
#[derive(Debug, Clone)]
pub struct PublishRequest {
  pub epoch: u64,
  pub pair_id: PairId,
  /// JSON encoded `FlipPayload`.
  pub body: Vec<u8>,
  pub signing_key: SigningKey,
}

/// Terminal status of a published transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConfirmationStatus {
  Mined,
  Failed { reason: String },
}

/// Stream of confirmation updates for one transaction.
///
/// The stream may end without a terminal status (connection dropped); the
/// caller decides whether to resubscribe.
pub type ConfirmationStream = BoxStream<'static, ConfirmationStatus>;

#[async_trait]
pub trait PublishBackend: Send + Sync {
  async fn publish(&self, request: PublishRequest) -> Result<TxHash, BackendError>;

  async fn subscribe_confirmation(&self, tx_hash: &TxHash) -> Result<ConfirmationStream, BackendError>;

  /// Ask the identity's flip list to be reloaded.
  async fn refresh_flips(&self) -> Result<(), BackendError>;
}
