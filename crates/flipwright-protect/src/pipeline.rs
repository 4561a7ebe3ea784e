use std::sync::Arc;
use std::time::Duration;

use flipwright_backend::{BackendError, ImageSearchBackend};
use flipwright_config::DecoyConfig;
use flipwright_flip::{ImageBlob, ImageRef};
use futures::future::join_all;
use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::error::ProtectionError;
use crate::protect::{ProtectInput, pick_decoy, protect_images};
use crate::synth::{placeholder_image, synthesize_decoy};

/// Decoy preparation and protection backed by an image search backend.
#[derive(Clone)]
pub struct AdversarialPipeline {
  backend: Arc<dyn ImageSearchBackend>,
  config: DecoyConfig,
  placeholder: ImageBlob,
  fetch_timeout: Option<Duration>,
}

impl AdversarialPipeline {
  pub fn new(backend: Arc<dyn ImageSearchBackend>, config: DecoyConfig) -> Result<Self, ProtectionError> {
    let placeholder = placeholder_image(&config)?;
    Ok(Self {
      backend,
      config,
      placeholder,
      fetch_timeout: None,
    })
  }

  /// Skip decoy sources that take longer than `timeout` to fetch.
  pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
    self.fetch_timeout = Some(timeout);
    self
  }

  pub fn placeholder(&self) -> &ImageBlob {
    &self.placeholder
  }

  /// Fetch the search results and synthesize a decoy from each.
  ///
  /// Results that cannot be fetched or decoded are skipped, so an empty
  /// candidate list is a valid outcome.
  #[instrument(skip(self, results), fields(results = results.len()))]
  pub async fn prepare(&self, results: Vec<ImageRef>) -> Result<Vec<ImageBlob>, ProtectionError> {
    let fetched = join_all(results.iter().map(|result| self.fetch(result))).await;

    let mut candidates = Vec::with_capacity(fetched.len());
    for (result, blob) in results.iter().zip(fetched) {
      let blob = match blob {
        Ok(blob) => blob,
        Err(e) => {
          warn!(url = %result.url, error = %e, "skipping decoy source");
          continue;
        }
      };

      let config = self.config.clone();
      let synthesized = tokio::task::spawn_blocking(move || synthesize_decoy(&blob, &config))
        .await
        .map_err(|e| ProtectionError::Join {
          message: e.to_string(),
        })?;

      match synthesized {
        Ok(decoy) => candidates.push(decoy),
        Err(e) => warn!(url = %result.url, error = %e, "skipping undecodable decoy source"),
      }
    }

    info!(candidates = candidates.len(), "decoy candidates prepared");
    Ok(candidates)
  }

  async fn fetch(&self, image: &ImageRef) -> Result<ImageBlob, BackendError> {
    match self.fetch_timeout {
      Some(limit) => tokio::time::timeout(limit, self.backend.fetch_image(image))
        .await
        .unwrap_or_else(|_| {
          Err(BackendError::unavailable(format!(
            "fetch timed out after {}ms",
            limit.as_millis()
          )))
        }),
      None => self.backend.fetch_image(image).await,
    }
  }

  #[instrument(skip(self, input), fields(slots = input.images.len(), decoy_slot = ?input.adversarial_image_id))]
  pub fn protect(&self, input: &ProtectInput) -> Result<Vec<Option<ImageBlob>>, ProtectionError> {
    let protected = protect_images(input, &self.placeholder)?;
    debug!("protect step complete");
    Ok(protected)
  }

  /// Swap the decoy for another candidate.
  pub fn reshuffle<R: Rng + ?Sized>(
    &self,
    candidates: &[ImageBlob],
    current: Option<&ImageBlob>,
    rng: &mut R,
  ) -> Option<ImageBlob> {
    pick_decoy(candidates, current, rng)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::synth::tests::sample_png;
  use flipwright_backend::memory::InMemoryImageSearch;

  fn config() -> DecoyConfig {
    DecoyConfig {
      width: 20,
      height: 20,
      placeholder_rgb: [255, 255, 255],
    }
  }

  #[tokio::test]
  async fn test_prepare_skips_broken_sources() {
    let backend = Arc::new(InMemoryImageSearch::new());
    backend.add_result("cat", "https://img/cat.png", sample_png(40, 40));
    backend.add_result("cat", "https://img/broken.png", ImageBlob::png(vec![1, 2, 3]));
    let pipeline = AdversarialPipeline::new(backend.clone(), config()).unwrap();

    let results = vec![
      ImageRef::new("https://img/cat.png"),
      ImageRef::new("https://img/broken.png"),
      ImageRef::new("https://img/missing.png"),
    ];
    let candidates = pipeline.prepare(results).await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].mime(), "image/png");
    assert_ne!(candidates[0], sample_png(40, 40));
  }

  #[tokio::test]
  async fn test_prepare_skips_slow_fetches() {
    let backend = Arc::new(InMemoryImageSearch::new());
    backend.add_result("cat", "https://img/cat.png", sample_png(40, 40));
    backend.set_fetch_delay(Some(Duration::from_secs(5)));
    let pipeline = AdversarialPipeline::new(backend, config())
      .unwrap()
      .with_fetch_timeout(Duration::from_millis(20));

    let prepared = tokio::time::timeout(
      Duration::from_secs(1),
      pipeline.prepare(vec![ImageRef::new("https://img/cat.png")]),
    )
    .await
    .expect("prepare is bounded by the fetch timeout");
    assert!(prepared.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_prepare_empty_results() {
    let pipeline = AdversarialPipeline::new(Arc::new(InMemoryImageSearch::new()), config()).unwrap();
    assert!(pipeline.prepare(Vec::new()).await.unwrap().is_empty());
  }

  #[test]
  fn test_protect_uses_placeholder() {
    let pipeline = AdversarialPipeline::new(Arc::new(InMemoryImageSearch::new()), config()).unwrap();
    let input = ProtectInput {
      images: vec![Some(ImageBlob::png(vec![1])), None],
      adversarial_images: vec![None, None],
      adversarial_image_id: Some(1),
      candidates: Vec::new(),
    };

    let protected = pipeline.protect(&input).unwrap();
    assert_eq!(protected[1].as_ref(), Some(pipeline.placeholder()));
  }
}
