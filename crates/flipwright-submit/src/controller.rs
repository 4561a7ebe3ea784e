use std::sync::Arc;

use flipwright_backend::{ConfirmationStatus, PublishBackend, PublishRequest};
use flipwright_config::{ConfirmationConfig, MIN_SLOTS};
use flipwright_flip::{FlipPayload, FlipSubmission, TxHash, validate_order};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{ConfirmationError, SubmissionError};

/// Outcome of a single confirmation attempt.
enum Attempt {
  Confirmed(ConfirmationStatus),
  /// Stream closed, subscription failed or the attempt timed out.
  Inconclusive,
}

/// Builds publish requests and watches their confirmation.
#[derive(Clone)]
pub struct SubmissionController {
  backend: Arc<dyn PublishBackend>,
  config: ConfirmationConfig,
}

impl SubmissionController {
  pub fn new(backend: Arc<dyn PublishBackend>, config: ConfirmationConfig) -> Self {
    Self { backend, config }
  }

  /// Check that a submission is structurally complete.
  ///
  /// Every slot must hold an image and `order` must be a bijection on
  /// `original_order`.
  pub fn validate(submission: &FlipSubmission) -> Result<FlipPayload, SubmissionError> {
    let slots = submission.images.len();
    if slots < MIN_SLOTS {
      return Err(SubmissionError::InvalidFlip {
        message: format!("a flip needs at least {} images, got {}", MIN_SLOTS, slots),
      });
    }
    if submission.original_order.len() != slots {
      return Err(SubmissionError::InvalidFlip {
        message: format!(
          "original order has {} entries for {} images",
          submission.original_order.len(),
          slots
        ),
      });
    }

    let mut images = Vec::with_capacity(slots);
    for (index, image) in submission.images.iter().enumerate() {
      match image {
        Some(image) => images.push(image.clone()),
        None => {
          return Err(SubmissionError::InvalidFlip {
            message: format!("protected image {} is missing", index),
          });
        }
      }
    }

    validate_order(&submission.order, &submission.original_order).map_err(|e| {
      SubmissionError::InvalidFlip {
        message: e.to_string(),
      }
    })?;

    Ok(FlipPayload {
      epoch: submission.epoch,
      pair_id: submission.pair_id,
      keywords: submission.keywords.clone(),
      images,
      original_order: submission.original_order.clone(),
      order: submission.order.clone(),
    })
  }

  /// Validate, serialize and publish a flip.
  #[instrument(skip(self, submission), fields(pair_id = submission.pair_id, epoch = submission.epoch))]
  pub async fn submit_flip(&self, submission: FlipSubmission) -> Result<TxHash, SubmissionError> {
    let payload = Self::validate(&submission)?;
    let body = serde_json::to_vec(&payload)?;
    debug!(bytes = body.len(), "flip serialized");

    let request = PublishRequest {
      epoch: submission.epoch,
      pair_id: submission.pair_id,
      body,
      signing_key: submission.signing_key,
    };

    let tx_hash = self
      .backend
      .publish(request)
      .await
      .map_err(|e| SubmissionError::Rejected {
        message: e.to_string(),
      })?;

    info!(tx_hash = %tx_hash, "flip published");
    Ok(tx_hash)
  }

  /// Wait until `tx_hash` is mined.
  ///
  /// Resubscribes with exponential backoff when an attempt ends without a
  /// terminal status, up to `max_attempts`.
  #[instrument(skip(self, cancel), fields(tx_hash = %tx_hash))]
  pub async fn watch_confirmation(
    &self,
    tx_hash: &TxHash,
    cancel: CancellationToken,
  ) -> Result<(), ConfirmationError> {
    let mut attempt: u32 = 0;

    loop {
      attempt += 1;

      match self.attempt(tx_hash, attempt, &cancel).await? {
        Attempt::Confirmed(ConfirmationStatus::Mined) => {
          info!(attempt, "flip mined");
          return Ok(());
        }
        Attempt::Confirmed(ConfirmationStatus::Failed { reason }) => {
          warn!(reason = %reason, "flip transaction failed");
          return Err(ConfirmationError::Failed {
            tx_hash: tx_hash.clone(),
            reason,
          });
        }
        Attempt::Inconclusive => {}
      }

      if let Some(max_attempts) = self.config.max_attempts
        && attempt >= max_attempts
      {
        warn!(attempts = attempt, "giving up on confirmation");
        return Err(ConfirmationError::Timeout {
          tx_hash: tx_hash.clone(),
          attempts: attempt,
        });
      }

      let backoff = self.config.backoff(attempt);
      debug!(attempt, backoff_ms = backoff.as_millis() as u64, "confirmation pending, backing off");

      tokio::select! {
        _ = cancel.cancelled() => return Err(ConfirmationError::Cancelled),
        _ = tokio::time::sleep(backoff) => {}
      }
    }
  }

  async fn attempt(
    &self,
    tx_hash: &TxHash,
    attempt: u32,
    cancel: &CancellationToken,
  ) -> Result<Attempt, ConfirmationError> {
    let mut stream = match self.backend.subscribe_confirmation(tx_hash).await {
      Ok(stream) => stream,
      Err(e) => {
        warn!(attempt, error = %e, "confirmation subscription failed");
        return Ok(Attempt::Inconclusive);
      }
    };

    let next = tokio::time::timeout(self.config.attempt_timeout(), stream.next());
    tokio::select! {
      _ = cancel.cancelled() => Err(ConfirmationError::Cancelled),
      result = next => match result {
        Ok(Some(status)) => Ok(Attempt::Confirmed(status)),
        Ok(None) => {
          debug!(attempt, "confirmation stream closed");
          Ok(Attempt::Inconclusive)
        }
        Err(_) => {
          debug!(attempt, "confirmation attempt timed out");
          Ok(Attempt::Inconclusive)
        }
      },
    }
  }
}
