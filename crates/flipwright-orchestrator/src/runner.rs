//! Flip runner with channel-based event delivery.
//!
//! The `FlipRunner` owns the state machine and the inbound event channel.
//! Commands returned by the machine run as spawned tasks that report their
//! outcome back through the same channel.

use std::future::Future;
use std::sync::Arc;

use flipwright_config::FlipConfig;
use flipwright_engine::{Command, FlipEvent, FlipMachine, Notification};
use flipwright_protect::{AdversarialPipeline, ProtectInput};
use flipwright_search::{ChannelSearchNotifier, ImageSearchService, SearchEvent, SearchRequest};
use flipwright_submit::{ConfirmationError, SubmissionController};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, info, warn};

use crate::allocate::allocate;
use crate::error::RunnerError;
use crate::events::{FlipNotifier, NoopNotifier, RunnerEvent};
use crate::handle::{FlipHandle, FlipSnapshot};
use crate::services::Services;

/// Drives one flip workflow.
///
/// # Usage
///
/// ```ignore
/// let runner = FlipRunner::new(&config, services, NoopNotifier)?;
///
/// // Handle for the UI or CLI
/// let handle = runner.handle();
///
/// // Start the event loop
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct FlipRunner<N: FlipNotifier = NoopNotifier> {
  sender: mpsc::Sender<FlipEvent>,
  receiver: mpsc::Receiver<FlipEvent>,
  search_events: mpsc::UnboundedReceiver<SearchEvent>,
  snapshot: watch::Sender<FlipSnapshot>,
  machine: FlipMachine<StdRng>,
  services: Services,
  search: ImageSearchService<ChannelSearchNotifier>,
  pipeline: AdversarialPipeline,
  submission: SubmissionController,
  notifier: Arc<N>,
  /// Cancels searches and confirmation watches when the runner stops.
  shutdown: CancellationToken,
  rng: StdRng,
}

impl<N: FlipNotifier + 'static> FlipRunner<N> {
  pub fn new(config: &FlipConfig, services: Services, notifier: N) -> Result<Self, RunnerError> {
    Self::with_rng(config, services, notifier, StdRng::from_entropy())
  }

  /// Create a runner whose shuffles are driven by `rng`.
  pub fn with_rng(
    config: &FlipConfig,
    services: Services,
    notifier: N,
    mut rng: StdRng,
  ) -> Result<Self, RunnerError> {
    let (sender, receiver) = mpsc::channel(config.runner.channel_capacity.max(1));
    let (search_sender, search_events) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let machine = FlipMachine::with_rng(config, StdRng::seed_from_u64(rng.next_u64()));
    let snapshot = watch::Sender::new(FlipSnapshot {
      state: machine.state(),
      label: machine.state_label(),
      context: machine.context().clone(),
    });

    let search = ImageSearchService::new(
      services.images.clone(),
      ChannelSearchNotifier::new(search_sender),
      config.search.result_limit,
      shutdown.clone(),
    )
    .with_timeout(config.search.timeout());
    let pipeline = AdversarialPipeline::new(services.images.clone(), config.decoy.clone())?
      .with_fetch_timeout(config.search.timeout());
    let submission = SubmissionController::new(services.publisher.clone(), config.confirmation.clone());

    Ok(Self {
      sender,
      receiver,
      search_events,
      snapshot,
      machine,
      services,
      search,
      pipeline,
      submission,
      notifier: Arc::new(notifier),
      shutdown,
      rng,
    })
  }

  pub fn handle(&self) -> FlipHandle {
    FlipHandle::new(self.sender.clone(), self.snapshot.subscribe())
  }

  /// Get a sender for delivering events from outside the runner.
  pub fn sender(&self) -> mpsc::Sender<FlipEvent> {
    self.sender.clone()
  }

  /// Start the event loop.
  ///
  /// Runs until the flip is accepted or the cancellation token fires.
  pub async fn start(mut self, cancel: CancellationToken) -> Result<(), RunnerError> {
    info!(slots = self.machine.context().slot_count(), "starting flip runner");

    loop {
      let event = tokio::select! {
        _ = cancel.cancelled() => {
          info!(state = %self.machine.state(), "flip runner cancelled");
          break;
        }
        Some(event) = self.search_events.recv() => search_event(event),
        event = self.receiver.recv() => match event {
          Some(event) => event,
          None => {
            info!("flip runner channel closed");
            break;
          }
        },
      };

      self.dispatch(event);

      if self.machine.state().is_final() {
        info!(tx_hash = ?self.machine.context().tx_hash, "flip accepted, stopping runner");
        break;
      }
    }

    self.shutdown.cancel();
    Ok(())
  }

  fn dispatch(&mut self, event: FlipEvent) {
    let name = event.name();
    let before = self.machine.state();
    let commands = self.machine.handle(event);
    let after = self.machine.state();

    if before != after {
      self.notifier.notify(RunnerEvent::StateChanged {
        from: before.label(),
        to: after.label(),
        event: name.to_string(),
      });
      if after.is_final() {
        self.notifier.notify(RunnerEvent::Accepted {
          tx_hash: self.machine.context().tx_hash.clone(),
        });
      }
    }

    for command in commands {
      self.execute(command);
    }

    self.snapshot.send_replace(FlipSnapshot {
      state: after,
      label: after.label(),
      context: self.machine.context().clone(),
    });
  }

  /// Run `task` in the background and feed its event back to the machine.
  fn spawn<F>(&self, command: &'static str, task: F)
  where
    F: Future<Output = Option<FlipEvent>> + Send + 'static,
  {
    let sender = self.sender.clone();
    tokio::spawn(
      async move {
        if let Some(event) = task.await
          && sender.send(event).await.is_err()
        {
          debug!("runner stopped before the result was delivered");
        }
      }
      .instrument(debug_span!("command", command)),
    );
  }

  fn execute(&mut self, command: Command) {
    let name = command.name();
    debug!(command = name, "executing command");

    match command {
      Command::AllocatePair => {
        let services = self.services.clone();
        self.spawn(name, async move {
          Some(match allocate(&services).await {
            Ok((allocation, did_show_bad_flip)) => FlipEvent::PairAllocated {
              available: allocation.available,
              keyword_pair_id: allocation.keyword_pair_id,
              did_show_bad_flip,
            },
            Err(error) => FlipEvent::AllocationFailed { error },
          })
        });
      }

      Command::FetchTranslations { words, locale } => {
        let translations = self.services.translations.clone();
        self.spawn(name, async move {
          Some(match translations.fetch_translations(&words, &locale).await {
            Ok(translations) => FlipEvent::TranslationsFetched { translations },
            Err(e) => FlipEvent::TranslationsFailed { message: e.to_string() },
          })
        });
      }

      Command::Vote { translation_id, up } => {
        let translations = self.services.translations.clone();
        self.spawn(name, async move {
          Some(match translations.vote(&translation_id, up).await {
            Ok(()) => FlipEvent::TranslationUpdated,
            Err(e) => FlipEvent::TranslationUpdateFailed { message: e.to_string() },
          })
        });
      }

      Command::Suggest {
        word_id,
        name: suggestion,
        desc,
        locale,
      } => {
        let translations = self.services.translations.clone();
        self.spawn(name, async move {
          Some(match translations.suggest(word_id, &suggestion, &desc, &locale).await {
            Ok(_) => FlipEvent::TranslationUpdated,
            Err(e) => FlipEvent::TranslationUpdateFailed { message: e.to_string() },
          })
        });
      }

      Command::SearchDecoys { query } => {
        match self.search.search(query.clone()) {
          SearchRequest::Started { generation } => debug!(generation, query = %query, "decoy search started"),
          SearchRequest::AlreadySearching { generation } => {
            debug!(generation, query = %query, "decoy search already running")
          }
        }
      }

      Command::PrepareDecoys { results } => {
        let pipeline = self.pipeline.clone();
        self.spawn(name, async move {
          Some(match pipeline.prepare(results).await {
            Ok(candidates) => FlipEvent::DecoysReady { candidates },
            Err(e) => FlipEvent::DecoysFailed { message: e.to_string() },
          })
        });
      }

      Command::Protect {
        images,
        adversarial_images,
        adversarial_image_id,
        candidates,
      } => {
        let pipeline = self.pipeline.clone();
        let input = ProtectInput {
          images,
          adversarial_images,
          adversarial_image_id,
          candidates,
        };
        self.spawn(name, async move {
          Some(match pipeline.protect(&input) {
            Ok(images) => FlipEvent::Protected { images },
            Err(e) => FlipEvent::ProtectFailed { message: e.to_string() },
          })
        });
      }

      Command::ShuffleDecoy { candidates, current } => {
        let image = self.pipeline.reshuffle(&candidates, current.as_ref(), &mut self.rng);
        self.spawn(name, async move { Some(FlipEvent::AdversarialShuffled { image }) });
      }

      Command::Submit { submission } => {
        let controller = self.submission.clone();
        self.spawn(name, async move {
          Some(match controller.submit_flip(submission).await {
            Ok(tx_hash) => FlipEvent::Submitted { tx_hash },
            Err(e) => FlipEvent::SubmitFailed { message: e.to_string() },
          })
        });
      }

      Command::WatchConfirmation { tx_hash } => {
        let controller = self.submission.clone();
        let cancel = self.shutdown.child_token();
        self.spawn(name, async move {
          match controller.watch_confirmation(&tx_hash, cancel).await {
            Ok(()) => Some(FlipEvent::FlipMined),
            Err(ConfirmationError::Failed { reason, .. }) => {
              Some(FlipEvent::ConfirmationFailed { message: reason })
            }
            Err(ConfirmationError::Timeout { attempts, .. }) => {
              Some(FlipEvent::ConfirmationTimedOut { attempts })
            }
            Err(ConfirmationError::Cancelled) => None,
          }
        });
      }

      Command::RefreshFlips => {
        let publisher = self.services.publisher.clone();
        self.spawn(name, async move {
          if let Err(e) = publisher.refresh_flips().await {
            warn!(error = %e, "failed to refresh flips");
          }
          None
        });
      }

      Command::PersistFlag { key } => {
        let kv = self.services.kv.clone();
        self.spawn(name, async move {
          if let Err(e) = kv.set(key, "true".to_string()).await {
            warn!(key, error = %e, "failed to persist flag");
          }
          None
        });
      }

      Command::Notify(notification) => {
        match &notification {
          Notification::Error { step, message } => warn!(step = %step, message = %message, "flip error"),
          Notification::Info { message } => info!(message = %message, "flip notice"),
        }
        self.notifier.notify(RunnerEvent::Notification(notification));
      }
    }
  }
}

fn search_event(event: SearchEvent) -> FlipEvent {
  match event {
    SearchEvent::Done { results, .. } => FlipEvent::SearchDone { results },
    SearchEvent::Failed { error, .. } => FlipEvent::SearchFailed {
      message: error.to_string(),
    },
  }
}
