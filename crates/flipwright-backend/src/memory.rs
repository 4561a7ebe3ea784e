//! In-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use flipwright_flip::{
  FlipPayload, ImageBlob, ImageRef, PairId, Translation, TxHash, WordPair, WordRef,
};
use futures::StreamExt;
use tokio::sync::watch;
use tracing::debug;

use crate::traits::{
  BackendError, ConfirmationStatus, ConfirmationStream, ImageSearchBackend, PairSource,
  PublishBackend, PublishRequest, TranslationSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pair source backed by a fixed list.
#[derive(Debug, Default)]
pub struct InMemoryPairSource {
  pairs: Mutex<Vec<WordPair>>,
  failure: Mutex<Option<BackendError>>,
}

impl InMemoryPairSource {
  pub fn new(pairs: Vec<WordPair>) -> Self {
    Self {
      pairs: Mutex::new(pairs),
      failure: Mutex::new(None),
    }
  }

  /// Mark a pair used, as the network does once its flip is mined.
  pub fn mark_used(&self, pair_id: PairId) -> bool {
    let mut pairs = lock(&self.pairs);
    match pairs.iter_mut().find(|p| p.id == pair_id) {
      Some(pair) => {
        pair.used = true;
        true
      }
      None => false,
    }
  }

  pub fn pairs(&self) -> Vec<WordPair> {
    lock(&self.pairs).clone()
  }

  /// Make every following call fail with `error` (or succeed again with `None`).
  pub fn set_failure(&self, error: Option<BackendError>) {
    *lock(&self.failure) = error;
  }
}

#[async_trait]
impl PairSource for InMemoryPairSource {
  async fn list_word_pairs(&self) -> Result<Vec<WordPair>, BackendError> {
    if let Some(error) = lock(&self.failure).clone() {
      return Err(error);
    }
    Ok(self.pairs())
  }
}

/// Translation source keyed by `(word id, locale)`.
#[derive(Debug, Default)]
pub struct InMemoryTranslations {
  entries: Mutex<HashMap<(u64, String), Vec<Translation>>>,
  next_id: AtomicUsize,
  offline: Mutex<bool>,
}

impl InMemoryTranslations {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, locale: &str, translation: Translation) {
    lock(&self.entries)
      .entry((translation.word_id, locale.to_string()))
      .or_default()
      .push(translation);
  }

  pub fn set_offline(&self, offline: bool) {
    *lock(&self.offline) = offline;
  }

  fn check_online(&self) -> Result<(), BackendError> {
    if *lock(&self.offline) {
      Err(BackendError::unavailable("translations offline"))
    } else {
      Ok(())
    }
  }
}

#[async_trait]
impl TranslationSource for InMemoryTranslations {
  async fn fetch_translations(
    &self,
    words: &[WordRef],
    locale: &str,
  ) -> Result<Vec<Vec<Translation>>, BackendError> {
    self.check_online()?;
    let entries = lock(&self.entries);
    Ok(
      words
        .iter()
        .map(|w| {
          entries
            .get(&(w.id, locale.to_string()))
            .cloned()
            .unwrap_or_default()
        })
        .collect(),
    )
  }

  async fn vote(&self, translation_id: &str, up: bool) -> Result<(), BackendError> {
    self.check_online()?;
    let mut entries = lock(&self.entries);
    let translation = entries
      .values_mut()
      .flat_map(|list| list.iter_mut())
      .find(|t| t.id == translation_id)
      .ok_or_else(|| BackendError::NotFound(translation_id.to_string()))?;
    translation.score += if up { 1 } else { -1 };
    Ok(())
  }

  async fn suggest(
    &self,
    word_id: u64,
    name: &str,
    desc: &str,
    locale: &str,
  ) -> Result<Translation, BackendError> {
    self.check_online()?;
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    let translation = Translation {
      id: format!("suggested-{}", id),
      word_id,
      name: name.to_string(),
      desc: desc.to_string(),
      score: 0,
    };
    self.insert(locale, translation.clone());
    Ok(translation)
  }
}

/// Image search with canned results per query.
#[derive(Debug, Default)]
pub struct InMemoryImageSearch {
  results: Mutex<HashMap<String, Vec<ImageRef>>>,
  images: Mutex<HashMap<String, ImageBlob>>,
  delay: Mutex<Option<Duration>>,
  fetch_delay: Mutex<Option<Duration>>,
  failure: Mutex<Option<BackendError>>,
  searches: AtomicUsize,
}

impl InMemoryImageSearch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an image under `url` and list it as a result for `query`.
  pub fn add_result(&self, query: &str, url: &str, image: ImageBlob) {
    lock(&self.results)
      .entry(query.to_string())
      .or_default()
      .push(ImageRef::new(url));
    lock(&self.images).insert(url.to_string(), image);
  }

  /// Delay every search by `delay`.
  pub fn set_delay(&self, delay: Option<Duration>) {
    *lock(&self.delay) = delay;
  }

  /// Delay every image fetch by `delay`.
  pub fn set_fetch_delay(&self, delay: Option<Duration>) {
    *lock(&self.fetch_delay) = delay;
  }

  pub fn set_failure(&self, error: Option<BackendError>) {
    *lock(&self.failure) = error;
  }

  /// Number of searches started so far.
  pub fn search_count(&self) -> usize {
    self.searches.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ImageSearchBackend for InMemoryImageSearch {
  async fn search(&self, query: &str) -> Result<Vec<ImageRef>, BackendError> {
    self.searches.fetch_add(1, Ordering::SeqCst);
    let delay = *lock(&self.delay);
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    if let Some(error) = lock(&self.failure).clone() {
      return Err(error);
    }
    Ok(lock(&self.results).get(query).cloned().unwrap_or_default())
  }

  async fn fetch_image(&self, image: &ImageRef) -> Result<ImageBlob, BackendError> {
    let delay = *lock(&self.fetch_delay);
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    lock(&self.images)
      .get(&image.url)
      .cloned()
      .ok_or_else(|| BackendError::NotFound(image.url.clone()))
  }
}

/// How the in-memory publisher answers confirmation subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmMode {
  /// Every subscription immediately reports `Mined`.
  #[default]
  Auto,
  /// Subscriptions wait until [`InMemoryPublisher::confirm`] is called.
  Manual,
}

/// Publisher that records payloads and confirms on demand.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
  mode: Mutex<ConfirmMode>,
  published: Mutex<Vec<(TxHash, FlipPayload)>>,
  rejections: Mutex<VecDeque<BackendError>>,
  confirmations: Mutex<HashMap<TxHash, watch::Sender<Option<ConfirmationStatus>>>>,
  subscriptions: AtomicUsize,
  refreshes: AtomicUsize,
}

impl InMemoryPublisher {
  pub fn new(mode: ConfirmMode) -> Self {
    Self {
      mode: Mutex::new(mode),
      ..Self::default()
    }
  }

  /// Reject the next publish call with `error`.
  pub fn reject_next(&self, error: BackendError) {
    lock(&self.rejections).push_back(error);
  }

  pub fn published(&self) -> Vec<(TxHash, FlipPayload)> {
    lock(&self.published).clone()
  }

  /// Deliver a terminal status to current and future subscribers.
  pub fn confirm(&self, tx_hash: &TxHash, status: ConfirmationStatus) {
    let mut confirmations = lock(&self.confirmations);
    let sender = confirmations
      .entry(tx_hash.clone())
      .or_insert_with(|| watch::channel(None).0);
    sender.send_replace(Some(status));
  }

  /// Close every open stream for `tx_hash` without a status.
  pub fn drop_subscriptions(&self, tx_hash: &TxHash) {
    lock(&self.confirmations).remove(tx_hash);
  }

  pub fn subscription_count(&self) -> usize {
    self.subscriptions.load(Ordering::SeqCst)
  }

  pub fn refresh_count(&self) -> usize {
    self.refreshes.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PublishBackend for InMemoryPublisher {
  async fn publish(&self, request: PublishRequest) -> Result<TxHash, BackendError> {
    if let Some(error) = lock(&self.rejections).pop_front() {
      return Err(error);
    }

    let payload: FlipPayload = serde_json::from_slice(&request.body)
      .map_err(|e| BackendError::rejected(format!("malformed flip: {}", e)))?;

    let mut published = lock(&self.published);
    let tx_hash = TxHash::new(format!("0x{:064x}", published.len() + 1));
    debug!(tx_hash = %tx_hash, pair_id = request.pair_id, "flip published");
    published.push((tx_hash.clone(), payload));
    Ok(tx_hash)
  }

  async fn subscribe_confirmation(&self, tx_hash: &TxHash) -> Result<ConfirmationStream, BackendError> {
    self.subscriptions.fetch_add(1, Ordering::SeqCst);

    if *lock(&self.mode) == ConfirmMode::Auto {
      return Ok(futures::stream::iter([ConfirmationStatus::Mined]).boxed());
    }

    let receiver = lock(&self.confirmations)
      .entry(tx_hash.clone())
      .or_insert_with(|| watch::channel(None).0)
      .subscribe();

    let stream = futures::stream::unfold(Some(receiver), |receiver| async move {
      let mut receiver = receiver?;
      let status = {
        let current = receiver.wait_for(Option::is_some).await.ok()?;
        (*current).clone()?
      };
      Some((status, None))
    });
    Ok(stream.boxed())
  }

  async fn refresh_flips(&self) -> Result<(), BackendError> {
    self.refreshes.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}
