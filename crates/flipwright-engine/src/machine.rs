use flipwright_config::FlipConfig;
use flipwright_flip::{
  FlipSubmission, ImageBlob, ImageRef, Keywords, SigningKey, TxHash, WordPair, WorkflowContext,
  identity_order, is_bijection, next_pair_index, shuffle_order,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::command::{BAD_FLIP_FLAG, Command, Notification, SHUFFLE_ADVERSARIAL_FLAG};
use crate::event::FlipEvent;
use crate::state::{
  EditingState, FlipState, ImagesState, KeywordsState, ProtectState, ShuffleState, Step,
  SubmitState, TranslationsState,
};

fn error(step: Step, message: impl Into<String>) -> Command {
  Command::Notify(Notification::Error {
    step,
    message: message.into(),
  })
}

/// The flip workflow state machine.
///
/// Synchronous and free of I/O: `handle` applies one event and returns the
/// commands the caller must execute. Randomness comes from the injected
/// `R`, so a seeded generator makes every run reproducible.
pub struct FlipMachine<R = StdRng> {
  state: FlipState,
  context: WorkflowContext,
  signing_key: Option<SigningKey>,
  query_separator: String,
  /// Set once the flip has been broadcast; the workflow can't go back.
  broadcast: bool,
  rng: R,
}

impl FlipMachine<StdRng> {
  pub fn new(config: &FlipConfig) -> Self {
    Self::with_rng(config, StdRng::from_entropy())
  }
}

impl<R: Rng> FlipMachine<R> {
  pub fn with_rng(config: &FlipConfig, rng: R) -> Self {
    Self {
      state: FlipState::Idle,
      context: WorkflowContext::new(config.locale.clone(), config.slot_count, config.decoy_slot()),
      signing_key: None,
      query_separator: config.search.query_separator.clone(),
      broadcast: false,
      rng,
    }
  }

  pub fn state(&self) -> FlipState {
    self.state
  }

  pub fn state_label(&self) -> String {
    self.state.label()
  }

  pub fn matches(&self, path: &str) -> bool {
    self.state.matches(path)
  }

  pub fn context(&self) -> &WorkflowContext {
    &self.context
  }

  /// Apply one event. Events the current state does not accept are
  /// ignored and produce no commands.
  pub fn handle(&mut self, event: FlipEvent) -> Vec<Command> {
    let name = event.name();
    let before = self.state;

    let handled = match self.state {
      FlipState::Idle => self.on_idle(event),
      FlipState::Editing(editing) => self.on_editing(editing, event),
      FlipState::Accepted => None,
    };

    match handled {
      Some(commands) => {
        if self.state != before {
          debug!(event = name, from = %before, to = %self.state, "transition");
        }
        commands
      }
      None => {
        debug!(event = name, state = %self.state, "event ignored");
        Vec::new()
      }
    }
  }

  fn on_idle(&mut self, event: FlipEvent) -> Option<Vec<Command>> {
    match event {
      FlipEvent::PrepareFlip { epoch, signing_key } => {
        info!(epoch, slots = self.context.slot_count(), "preparing flip");
        self.context.epoch = Some(epoch);
        self.signing_key = Some(signing_key);
        self.state = FlipState::Editing(EditingState::Keywords(KeywordsState::Loading));
        Some(vec![Command::AllocatePair])
      }
      _ => None,
    }
  }

  fn on_editing(&mut self, editing: EditingState, event: FlipEvent) -> Option<Vec<Command>> {
    match event {
      FlipEvent::Next => self.next(editing),
      FlipEvent::Prev => self.prev(editing),
      FlipEvent::SwitchLocale => {
        self.context.show_translation = !self.context.show_translation;
        Some(Vec::new())
      }
      FlipEvent::SearchDone { results } => Some(self.on_search_done(results)),
      FlipEvent::SearchFailed { message } => {
        warn!(error = %message, "decoy search failed, continuing without decoys");
        self.context.decoy_search_pending = false;
        Some(self.finish_preparing())
      }
      FlipEvent::DecoysReady { candidates } => Some(self.on_decoys_ready(candidates)),
      FlipEvent::DecoysFailed { message } => {
        warn!(error = %message, "decoy preparation failed, continuing without decoys");
        self.context.decoy_search_pending = false;
        Some(self.finish_preparing())
      }
      event => match editing {
        EditingState::Keywords(state) => self.on_keywords(state, event),
        EditingState::Images(state) => self.on_images(state, event),
        EditingState::Protect(state) => self.on_protect(state, event),
        EditingState::Shuffle(state) => self.on_shuffle(state, event),
        EditingState::Submit(state) => self.on_submit(state, event),
      },
    }
  }

  fn next(&mut self, editing: EditingState) -> Option<Vec<Command>> {
    if editing.is_in_progress() {
      return None;
    }

    let allowed = match editing {
      EditingState::Keywords(state) => matches!(state, KeywordsState::Loaded(_)),
      EditingState::Images(_) => self.context.images_complete(),
      EditingState::Protect(_) => self.context.protected_complete(),
      EditingState::Shuffle(_) => is_bijection(&self.context.order, &self.context.original_order),
      EditingState::Submit(_) => false,
    };
    if !allowed {
      return None;
    }

    let step = editing.step().next()?;
    Some(self.enter(step))
  }

  fn prev(&mut self, editing: EditingState) -> Option<Vec<Command>> {
    if editing.is_in_progress() || self.broadcast {
      return None;
    }
    let step = editing.step().prev()?;
    Some(self.enter(step))
  }

  fn enter(&mut self, step: Step) -> Vec<Command> {
    match step {
      Step::Keywords => self.enter_keywords_loaded(),
      Step::Images => {
        self.state = FlipState::Editing(EditingState::Images(ImagesState::Idle));
        self.load_adversarial()
      }
      Step::Protect => self.enter_protect(),
      Step::Shuffle => {
        self.context.order = self.context.original_order.clone();
        self.state = FlipState::Editing(EditingState::Shuffle(ShuffleState::Idle));
        Vec::new()
      }
      Step::Submit => {
        self.state = FlipState::Editing(EditingState::Submit(SubmitState::Idle));
        Vec::new()
      }
    }
  }

  // Keywords

  fn enter_keywords_loaded(&mut self) -> Vec<Command> {
    self.state = FlipState::Editing(EditingState::Keywords(KeywordsState::Loaded(
      TranslationsState::Fetching,
    )));
    vec![Command::FetchTranslations {
      words: self.context.keywords.words.clone(),
      locale: self.context.locale.clone(),
    }]
  }

  fn set_keywords_state(&mut self, state: KeywordsState) {
    self.state = FlipState::Editing(EditingState::Keywords(state));
  }

  fn on_keywords(&mut self, state: KeywordsState, event: FlipEvent) -> Option<Vec<Command>> {
    use KeywordsState::{Failure, Loaded, Loading};
    use TranslationsState::{Fetched, Fetching};

    match (state, event) {
      (
        Loading,
        FlipEvent::PairAllocated {
          available,
          keyword_pair_id,
          did_show_bad_flip,
        },
      ) => Some(self.on_pair_allocated(available, keyword_pair_id, did_show_bad_flip)),

      (Loading, FlipEvent::AllocationFailed { error: e }) => {
        warn!(error = %e, "pair allocation failed");
        self.set_keywords_state(Failure);
        Some(vec![error(Step::Keywords, e.to_string())])
      }

      (Loaded(Fetching), FlipEvent::TranslationsFetched { translations }) => {
        self.context.keywords.translations = translations;
        self.set_keywords_state(Loaded(Fetched { suggesting: false }));
        Some(Vec::new())
      }

      (Loaded(Fetching), FlipEvent::TranslationsFailed { message }) => {
        warn!(error = %message, "community translations unavailable");
        self.set_keywords_state(Loaded(TranslationsState::FetchFailed));
        Some(Vec::new())
      }

      (Loaded(_), FlipEvent::ChangeKeywords) => {
        let len = self.context.available_keywords.len();
        if len < 2 {
          return None;
        }
        let index = next_pair_index(self.context.keyword_pair_id, len);
        let pair = self.context.available_keywords.get(index)?;
        self.context.keywords = Keywords::from_pair(pair);
        self.context.keyword_pair_id = index;
        debug!(pair_id = pair.id, index, "keywords changed");
        Some(self.enter_keywords_loaded())
      }

      (Loaded(_), FlipEvent::ToggleCommunityTranslations) => {
        self.context.is_community_translations_expanded = !self.context.is_community_translations_expanded;
        Some(Vec::new())
      }

      (Loaded(Fetched { suggesting: false }), FlipEvent::Vote { translation_id, up }) => {
        Some(vec![Command::Vote { translation_id, up }])
      }

      (Loaded(Fetched { suggesting: false }), FlipEvent::Suggest { word_id, name, desc }) => {
        self.set_keywords_state(Loaded(Fetched { suggesting: true }));
        Some(vec![Command::Suggest {
          word_id,
          name,
          desc,
          locale: self.context.locale.clone(),
        }])
      }

      (Loaded(Fetched { .. }), FlipEvent::TranslationUpdated) => Some(self.enter_keywords_loaded()),

      (Loaded(Fetched { .. }), FlipEvent::TranslationUpdateFailed { message }) => {
        self.set_keywords_state(Loaded(Fetched { suggesting: false }));
        Some(vec![error(Step::Keywords, message)])
      }

      (_, FlipEvent::SkipBadFlip) => {
        self.context.did_show_bad_flip = true;
        Some(vec![Command::PersistFlag { key: BAD_FLIP_FLAG }])
      }

      _ => None,
    }
  }

  fn on_pair_allocated(
    &mut self,
    available: Vec<WordPair>,
    keyword_pair_id: usize,
    did_show_bad_flip: bool,
  ) -> Vec<Command> {
    let Some(pair) = available.get(keyword_pair_id) else {
      self.set_keywords_state(KeywordsState::Failure);
      return vec![error(
        Step::Keywords,
        format!("allocated pair {} is out of range", keyword_pair_id),
      )];
    };

    info!(pair_id = pair.id, available = available.len(), "pair allocated");
    self.context.keywords = Keywords::from_pair(pair);
    self.context.available_keywords = available;
    self.context.keyword_pair_id = keyword_pair_id;
    self.context.did_show_bad_flip = did_show_bad_flip;
    self.enter_keywords_loaded()
  }

  // Images and decoys

  /// Start a decoy search unless a decoy or a search already exists.
  fn load_adversarial(&mut self) -> Vec<Command> {
    let ctx = &self.context;
    if ctx.has_adversarial_image() || ctx.decoy_search_pending || !ctx.decoy_candidates.is_empty() {
      return Vec::new();
    }

    let query = ctx.keywords.query(&self.query_separator);
    if query.is_empty() {
      debug!("no keywords to search decoys for");
      return Vec::new();
    }

    self.context.decoy_search_pending = true;
    vec![Command::SearchDecoys { query }]
  }

  fn on_search_done(&mut self, results: Vec<ImageRef>) -> Vec<Command> {
    if results.is_empty() {
      info!("decoy search returned no results");
      self.context.decoy_search_pending = false;
      return self.finish_preparing();
    }
    debug!(results = results.len(), "preparing decoys");
    vec![Command::PrepareDecoys { results }]
  }

  fn on_decoys_ready(&mut self, candidates: Vec<ImageBlob>) -> Vec<Command> {
    info!(candidates = candidates.len(), "decoys ready");
    self.context.decoy_search_pending = false;

    if let Some(slot) = self.context.adversarial_image_id
      && self.context.adversarial_images[slot].is_none()
      && let Some(first) = candidates.first()
    {
      self.context.adversarial_images[slot] = Some(first.clone());
    }
    self.context.decoy_candidates = candidates;

    self.finish_preparing()
  }

  fn set_images_state(&mut self, state: ImagesState) {
    self.state = FlipState::Editing(EditingState::Images(state));
  }

  fn on_images(&mut self, state: ImagesState, event: FlipEvent) -> Option<Vec<Command>> {
    let slots = self.context.slot_count();

    match (state, event) {
      (ImagesState::Idle, FlipEvent::Painting) => {
        self.set_images_state(ImagesState::Painting);
        Some(Vec::new())
      }

      (_, FlipEvent::ChangeImages { index, image }) => {
        if index >= slots {
          return None;
        }
        self.context.images[index] = image;
        if self.context.adversarial_image_id == Some(index) {
          self.context.adversarial_images[index] = None;
        }
        if state == ImagesState::Painting {
          self.set_images_state(ImagesState::Idle);
        }
        Some(Vec::new())
      }

      (ImagesState::Idle | ImagesState::Failure, FlipEvent::ChangeOriginalOrder { order }) => {
        if !is_bijection(&order, &identity_order(slots)) {
          return Some(vec![error(Step::Images, "slot order is not a permutation")]);
        }
        self.context.original_order = order.clone();
        self.context.order = order;
        Some(Vec::new())
      }

      (ImagesState::Idle | ImagesState::Failure, FlipEvent::ChangeAdversarialId { index }) => {
        if index.is_some_and(|index| index >= slots) {
          return None;
        }
        debug!(from = ?self.context.adversarial_image_id, to = ?index, "decoy slot changed");
        self.context.adversarial_image_id = index;
        Some(Vec::new())
      }

      (ImagesState::Idle | ImagesState::Failure, FlipEvent::ChangeAdversarialImage { image }) => {
        let slot = self.context.adversarial_image_id?;
        self.context.adversarial_images[slot] = Some(image);
        Some(Vec::new())
      }

      (ImagesState::Idle | ImagesState::Painting, FlipEvent::ImagesFailed { message }) => {
        warn!(error = %message, "image step failed");
        self.context.decoy_search_pending = false;
        self.set_images_state(ImagesState::Failure);
        Some(vec![error(Step::Images, message)])
      }

      (ImagesState::Failure, FlipEvent::Retry) => {
        self.set_images_state(ImagesState::Idle);
        Some(self.load_adversarial())
      }

      _ => None,
    }
  }

  // Protect

  fn set_protect_state(&mut self, state: ProtectState) {
    self.state = FlipState::Editing(EditingState::Protect(state));
  }

  fn decoy_installed(&self) -> bool {
    self
      .context
      .adversarial_image_id
      .and_then(|slot| self.context.adversarial_images.get(slot))
      .is_some_and(Option::is_some)
  }

  fn enter_protect(&mut self) -> Vec<Command> {
    self.context.protected_images = vec![None; self.context.slot_count()];

    if self.context.adversarial_image_id.is_some()
      && self.context.decoy_search_pending
      && !self.decoy_installed()
    {
      self.set_protect_state(ProtectState::Preparing);
      return Vec::new();
    }
    self.start_protect()
  }

  fn start_protect(&mut self) -> Vec<Command> {
    self.set_protect_state(ProtectState::Protecting);
    vec![Command::Protect {
      images: self.context.images.clone(),
      adversarial_images: self.context.adversarial_images.clone(),
      adversarial_image_id: self.context.adversarial_image_id,
      candidates: self.context.decoy_candidates.clone(),
    }]
  }

  fn finish_preparing(&mut self) -> Vec<Command> {
    if self.state == FlipState::Editing(EditingState::Protect(ProtectState::Preparing)) {
      self.start_protect()
    } else {
      Vec::new()
    }
  }

  fn on_protect(&mut self, state: ProtectState, event: FlipEvent) -> Option<Vec<Command>> {
    let slots = self.context.slot_count();

    match (state, event) {
      (ProtectState::Protecting, FlipEvent::Protected { images }) => {
        if images.len() != slots || images.iter().any(Option::is_none) {
          self.set_protect_state(ProtectState::Failure);
          return Some(vec![error(Step::Protect, "protect step returned incomplete images")]);
        }
        self.context.protected_images = images;
        self.set_protect_state(ProtectState::Idle);
        Some(Vec::new())
      }

      (ProtectState::Protecting, FlipEvent::ProtectFailed { message }) => {
        warn!(error = %message, "protect step failed");
        self.set_protect_state(ProtectState::Failure);
        Some(vec![error(Step::Protect, message)])
      }

      (ProtectState::Failure, FlipEvent::Retry)
      | (ProtectState::Idle | ProtectState::Failure, FlipEvent::Protecting) => Some(self.enter_protect()),

      (ProtectState::Idle, FlipEvent::ChangeProtectedImages { index, image }) => {
        if index >= slots {
          return None;
        }
        self.context.protected_images[index] = Some(image);
        Some(Vec::new())
      }

      // A decoy supplied by hand ends the wait for the search.
      (ProtectState::Preparing, FlipEvent::ChangeAdversarialImage { image }) => {
        let slot = self.context.adversarial_image_id?;
        self.context.adversarial_images[slot] = Some(image);
        Some(self.start_protect())
      }

      (ProtectState::Idle | ProtectState::Failure, FlipEvent::ChangeAdversarialImage { image }) => {
        let slot = self.context.adversarial_image_id?;
        if state == ProtectState::Idle {
          self.context.protected_images[slot] = Some(image.clone());
        }
        self.context.adversarial_images[slot] = Some(image);
        Some(Vec::new())
      }

      (ProtectState::Idle, FlipEvent::ShuffleAdversarial) => {
        let slot = self.context.adversarial_image_id?;
        let current = self.context.adversarial_images[slot]
          .clone()
          .or_else(|| self.context.protected_images[slot].clone());
        self.set_protect_state(ProtectState::Shuffling);
        Some(vec![Command::ShuffleDecoy {
          candidates: self.context.decoy_candidates.clone(),
          current,
        }])
      }

      (ProtectState::Shuffling, FlipEvent::AdversarialShuffled { image }) => {
        self.set_protect_state(ProtectState::Idle);
        let (Some(slot), Some(image)) = (self.context.adversarial_image_id, image) else {
          return Some(vec![Command::Notify(Notification::Info {
            message: "no other decoy available".to_string(),
          })]);
        };

        self.context.adversarial_images[slot] = Some(image.clone());
        self.context.protected_images[slot] = Some(image);

        let mut commands = Vec::new();
        if !self.context.did_show_shuffle_adversarial {
          self.context.did_show_shuffle_adversarial = true;
          commands.push(Command::PersistFlag {
            key: SHUFFLE_ADVERSARIAL_FLAG,
          });
        }
        Some(commands)
      }

      _ => None,
    }
  }

  // Shuffle

  fn set_shuffle_state(&mut self, state: ShuffleState) {
    self.state = FlipState::Editing(EditingState::Shuffle(state));
  }

  fn on_shuffle(&mut self, state: ShuffleState, event: FlipEvent) -> Option<Vec<Command>> {
    match (state, event) {
      (_, FlipEvent::Shuffle) | (ShuffleState::Failure, FlipEvent::Retry) => {
        match shuffle_order(&self.context.original_order, &mut self.rng) {
          Ok(order) => {
            debug!(?order, "order shuffled");
            self.context.order = order;
            self.set_shuffle_state(ShuffleState::Shuffled);
            Some(Vec::new())
          }
          Err(e) => {
            warn!(error = %e, "shuffle failed");
            self.set_shuffle_state(ShuffleState::Failure);
            Some(vec![error(Step::Shuffle, e.to_string())])
          }
        }
      }

      (_, FlipEvent::ManualShuffle { order }) => {
        if !is_bijection(&order, &self.context.original_order) {
          return Some(vec![error(Step::Shuffle, "order is not a permutation of the slots")]);
        }
        self.context.order = order;
        self.set_shuffle_state(ShuffleState::ManualShuffled);
        Some(Vec::new())
      }

      (_, FlipEvent::ResetShuffle) => {
        self.context.order = self.context.original_order.clone();
        self.set_shuffle_state(ShuffleState::Idle);
        Some(Vec::new())
      }

      _ => None,
    }
  }

  // Submit

  fn set_submit_state(&mut self, state: SubmitState) {
    self.state = FlipState::Editing(EditingState::Submit(state));
  }

  fn submission(&self) -> Result<FlipSubmission, String> {
    let epoch = self.context.epoch.ok_or("epoch is unknown")?;
    let signing_key = self.signing_key.clone().ok_or("signing key is unavailable")?;
    let pair = self.context.current_pair().ok_or("no word pair assigned")?;

    Ok(FlipSubmission {
      epoch,
      pair_id: pair.id,
      keywords: self.context.keywords.clone(),
      images: self.context.protected_images.clone(),
      original_order: self.context.original_order.clone(),
      order: self.context.order.clone(),
      signing_key,
    })
  }

  fn watch(&mut self, tx_hash: TxHash) -> Vec<Command> {
    self.set_submit_state(SubmitState::Mining);
    vec![Command::WatchConfirmation { tx_hash }]
  }

  fn on_submit(&mut self, state: SubmitState, event: FlipEvent) -> Option<Vec<Command>> {
    match (state, event) {
      (SubmitState::Idle | SubmitState::Failure, FlipEvent::Submit) => match self.submission() {
        Ok(submission) => {
          info!(pair_id = submission.pair_id, epoch = submission.epoch, "submitting flip");
          self.set_submit_state(SubmitState::Submitting);
          Some(vec![Command::Submit { submission }])
        }
        Err(message) => Some(vec![error(Step::Submit, message)]),
      },

      (SubmitState::Submitting, FlipEvent::Submitted { tx_hash }) => {
        info!(tx_hash = %tx_hash, "flip broadcast, waiting for confirmation");
        self.context.tx_hash = Some(tx_hash.clone());
        self.broadcast = true;
        Some(self.watch(tx_hash))
      }

      (SubmitState::Submitting, FlipEvent::SubmitFailed { message }) => {
        warn!(error = %message, "submission failed");
        self.context.tx_hash = None;
        self.set_submit_state(SubmitState::Failure);
        Some(vec![error(Step::Submit, message)])
      }

      (SubmitState::Mining | SubmitState::ConfirmationTimeout, FlipEvent::FlipMined) => {
        info!(tx_hash = ?self.context.tx_hash, "flip mined");
        self.state = FlipState::Accepted;
        Some(vec![Command::RefreshFlips])
      }

      (SubmitState::Mining, FlipEvent::ConfirmationFailed { message }) => {
        warn!(error = %message, "flip transaction failed");
        self.context.tx_hash = None;
        self.set_submit_state(SubmitState::Failure);
        Some(vec![error(Step::Submit, message)])
      }

      (SubmitState::Mining, FlipEvent::ConfirmationTimedOut { attempts }) => {
        warn!(attempts, "confirmation not observed");
        self.set_submit_state(SubmitState::ConfirmationTimeout);
        Some(vec![error(
          Step::Submit,
          format!("flip not confirmed after {} attempts", attempts),
        )])
      }

      (SubmitState::ConfirmationTimeout, FlipEvent::RetryConfirmation) => {
        let tx_hash = self.context.tx_hash.clone()?;
        Some(self.watch(tx_hash))
      }

      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flipwright_flip::{AllocationError, Translation, WordRef};

  fn config(slot_count: usize) -> FlipConfig {
    FlipConfig {
      slot_count,
      ..FlipConfig::default()
    }
  }

  fn machine(slot_count: usize) -> FlipMachine<StdRng> {
    FlipMachine::with_rng(&config(slot_count), StdRng::seed_from_u64(7))
  }

  fn word(id: u64, name: &str) -> WordRef {
    WordRef {
      id,
      name: name.to_string(),
      desc: String::new(),
    }
  }

  fn pairs() -> Vec<WordPair> {
    vec![
      WordPair {
        id: 7,
        words: [word(1, "apple"), word(2, "rocket")],
        used: false,
      },
      WordPair {
        id: 8,
        words: [word(3, "tree"), word(4, "clock")],
        used: false,
      },
    ]
  }

  fn blob(tag: u8) -> ImageBlob {
    ImageBlob::png(vec![tag])
  }

  fn has_error(commands: &[Command], step: Step) -> bool {
    commands
      .iter()
      .any(|c| matches!(c, Command::Notify(Notification::Error { step: s, .. }) if *s == step))
  }

  fn prepared(m: &mut FlipMachine<StdRng>) {
    m.handle(FlipEvent::PrepareFlip {
      epoch: 12,
      signing_key: SigningKey::new("key"),
    });
    m.handle(FlipEvent::PairAllocated {
      available: pairs(),
      keyword_pair_id: 0,
      did_show_bad_flip: true,
    });
  }

  fn fill_images(m: &mut FlipMachine<StdRng>) {
    for index in 0..m.context().slot_count() {
      m.handle(FlipEvent::ChangeImages {
        index,
        image: Some(blob(index as u8 + 1)),
      });
    }
  }

  /// Drive to `editing.protect.idle` with the search settled.
  fn protected(m: &mut FlipMachine<StdRng>) {
    prepared(m);
    m.handle(FlipEvent::Next);
    fill_images(m);
    m.handle(FlipEvent::SearchDone { results: Vec::new() });
    m.handle(FlipEvent::Next);
    let images = (0..m.context().slot_count()).map(|i| Some(blob(i as u8 + 10))).collect();
    m.handle(FlipEvent::Protected { images });
    assert_eq!(m.state_label(), "editing.protect.idle");
  }

  fn at_submit(m: &mut FlipMachine<StdRng>) {
    protected(m);
    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::Shuffle);
    m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.submit.idle");
  }

  #[test]
  fn test_prepare_flip_allocates_pair() {
    let mut m = machine(3);
    assert_eq!(m.state_label(), "idle");

    let commands = m.handle(FlipEvent::PrepareFlip {
      epoch: 12,
      signing_key: SigningKey::new("key"),
    });
    assert!(matches!(commands.as_slice(), [Command::AllocatePair]));
    assert_eq!(m.state_label(), "editing.keywords.loading");
    assert_eq!(m.context().epoch, Some(12));

    // A second PREPARE_FLIP is ignored.
    assert!(
      m.handle(FlipEvent::PrepareFlip {
        epoch: 13,
        signing_key: SigningKey::new("key"),
      })
      .is_empty()
    );
  }

  #[test]
  fn test_pair_allocated_loads_keywords() {
    let mut m = machine(3);
    m.handle(FlipEvent::PrepareFlip {
      epoch: 12,
      signing_key: SigningKey::new("key"),
    });
    let commands = m.handle(FlipEvent::PairAllocated {
      available: pairs(),
      keyword_pair_id: 0,
      did_show_bad_flip: false,
    });

    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchingTranslations");
    assert!(matches!(
      commands.as_slice(),
      [Command::FetchTranslations { words, locale }] if words.len() == 2 && locale == "en"
    ));
    assert_eq!(m.context().current_pair().map(|p| p.id), Some(7));
    assert_eq!(m.context().keywords.words[0].name, "apple");
    assert!(!m.context().did_show_bad_flip);
  }

  #[test]
  fn test_allocation_failure_is_terminal_for_keywords() {
    let mut m = machine(3);
    m.handle(FlipEvent::PrepareFlip {
      epoch: 12,
      signing_key: SigningKey::new("key"),
    });
    let commands = m.handle(FlipEvent::AllocationFailed {
      error: AllocationError::NoAvailablePairs {
        total: 2,
        used: 2,
        pending: 0,
      },
    });

    assert_eq!(m.state_label(), "editing.keywords.failure");
    assert!(has_error(&commands, Step::Keywords));
    assert!(m.handle(FlipEvent::Retry).is_empty());
    assert!(m.handle(FlipEvent::Next).is_empty());
    assert_eq!(m.state_label(), "editing.keywords.failure");
  }

  #[test]
  fn test_change_keywords_wraps_around() {
    let mut m = machine(3);
    prepared(&mut m);

    m.handle(FlipEvent::ChangeKeywords);
    assert_eq!(m.context().keyword_pair_id, 1);
    assert_eq!(m.context().keywords.words[0].name, "tree");

    m.handle(FlipEvent::ChangeKeywords);
    assert_eq!(m.context().keyword_pair_id, 0);
    assert_eq!(m.context().current_pair().map(|p| p.id), Some(7));
  }

  #[test]
  fn test_translations_lifecycle() {
    let mut m = machine(3);
    prepared(&mut m);

    let translations = vec![
      vec![Translation {
        id: "t1".to_string(),
        word_id: 1,
        name: "Apfel".to_string(),
        desc: String::new(),
        score: 2,
      }],
      Vec::new(),
    ];
    m.handle(FlipEvent::TranslationsFetched {
      translations: translations.clone(),
    });
    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchedTranslations");
    assert_eq!(m.context().keywords.translations, translations);

    let commands = m.handle(FlipEvent::Suggest {
      word_id: 2,
      name: "Rakete".to_string(),
      desc: String::new(),
    });
    assert!(matches!(commands.as_slice(), [Command::Suggest { word_id: 2, .. }]));
    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchedTranslations.suggesting");

    // Voting waits for the suggestion to land.
    assert!(
      m.handle(FlipEvent::Vote {
        translation_id: "t1".to_string(),
        up: true,
      })
      .is_empty()
    );

    let commands = m.handle(FlipEvent::TranslationUpdated);
    assert!(matches!(commands.as_slice(), [Command::FetchTranslations { .. }]));
    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchingTranslations");
  }

  #[test]
  fn test_offline_translations() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::TranslationsFailed {
      message: "offline".to_string(),
    });
    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchTranslationsFailed");

    // The step still works without translations.
    m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.images.idle");
  }

  #[test]
  fn test_toggles() {
    let mut m = machine(3);
    prepared(&mut m);

    m.handle(FlipEvent::ToggleCommunityTranslations);
    assert!(m.context().is_community_translations_expanded);

    let commands = m.handle(FlipEvent::SkipBadFlip);
    assert!(matches!(
      commands.as_slice(),
      [Command::PersistFlag { key }] if *key == BAD_FLIP_FLAG
    ));
    assert!(m.context().did_show_bad_flip);

    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::SwitchLocale);
    assert!(m.context().show_translation);
    m.handle(FlipEvent::SwitchLocale);
    assert!(!m.context().show_translation);
  }

  #[test]
  fn test_entering_images_searches_once() {
    let mut m = machine(3);
    prepared(&mut m);

    let commands = m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.images.idle");
    assert!(matches!(
      commands.as_slice(),
      [Command::SearchDecoys { query }] if query == "apple rocket"
    ));
    assert!(m.context().decoy_search_pending);

    // Leaving and re-entering while the search runs does not search again.
    m.handle(FlipEvent::Prev);
    let commands = m.handle(FlipEvent::Next);
    assert!(!commands.iter().any(|c| matches!(c, Command::SearchDecoys { .. })));
  }

  #[test]
  fn test_no_search_once_decoy_exists() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::DecoysReady {
      candidates: vec![blob(50)],
    });
    assert_eq!(m.context().adversarial_images[2], Some(blob(50)));

    m.handle(FlipEvent::Prev);
    let commands = m.handle(FlipEvent::Next);
    assert!(commands.is_empty());
  }

  #[test]
  fn test_next_from_images_requires_every_slot() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);

    m.handle(FlipEvent::ChangeImages {
      index: 0,
      image: Some(blob(1)),
    });
    assert!(m.handle(FlipEvent::Next).is_empty());
    assert_eq!(m.state_label(), "editing.images.idle");

    fill_images(&mut m);
    m.handle(FlipEvent::SearchFailed {
      message: "offline".to_string(),
    });
    let commands = m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.protect.protecting");
    assert!(matches!(commands.as_slice(), [Command::Protect { .. }]));
  }

  #[test]
  fn test_painting_blocks_navigation() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);

    m.handle(FlipEvent::Painting);
    assert_eq!(m.state_label(), "editing.images.painting");
    assert!(m.handle(FlipEvent::Next).is_empty());
    assert!(m.handle(FlipEvent::Prev).is_empty());
    assert_eq!(m.state_label(), "editing.images.painting");

    m.handle(FlipEvent::ChangeImages {
      index: 1,
      image: Some(blob(9)),
    });
    assert_eq!(m.state_label(), "editing.images.idle");
    assert_eq!(m.context().images[1], Some(blob(9)));
  }

  #[test]
  fn test_changing_decoy_slot_image_clears_decoy() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::ChangeAdversarialImage { image: blob(60) });
    assert_eq!(m.context().adversarial_images[2], Some(blob(60)));

    m.handle(FlipEvent::ChangeImages {
      index: 1,
      image: Some(blob(1)),
    });
    assert_eq!(m.context().adversarial_images[2], Some(blob(60)));

    m.handle(FlipEvent::ChangeImages {
      index: 2,
      image: Some(blob(2)),
    });
    assert_eq!(m.context().adversarial_images[2], None);
  }

  #[test]
  fn test_change_adversarial_id_is_range_checked() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);

    m.handle(FlipEvent::ChangeAdversarialId { index: Some(0) });
    assert_eq!(m.context().adversarial_image_id, Some(0));

    m.handle(FlipEvent::ChangeAdversarialId { index: Some(3) });
    assert_eq!(m.context().adversarial_image_id, Some(0));

    m.handle(FlipEvent::ChangeAdversarialId { index: None });
    assert_eq!(m.context().adversarial_image_id, None);
  }

  #[test]
  fn test_change_original_order() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);

    m.handle(FlipEvent::ChangeOriginalOrder { order: vec![2, 0, 1] });
    assert_eq!(m.context().original_order, vec![2, 0, 1]);
    assert_eq!(m.context().order, vec![2, 0, 1]);

    let commands = m.handle(FlipEvent::ChangeOriginalOrder { order: vec![0, 0, 1] });
    assert!(has_error(&commands, Step::Images));
    assert_eq!(m.context().original_order, vec![2, 0, 1]);
  }

  #[test]
  fn test_protect_waits_for_decoys() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);

    let commands = m.handle(FlipEvent::Next);
    assert!(commands.is_empty());
    assert_eq!(m.state_label(), "editing.protect.preparing");
    assert!(m.handle(FlipEvent::Prev).is_empty());

    let commands = m.handle(FlipEvent::SearchDone {
      results: vec![ImageRef::new("https://img/1.png")],
    });
    assert!(matches!(commands.as_slice(), [Command::PrepareDecoys { results }] if results.len() == 1));
    assert_eq!(m.state_label(), "editing.protect.preparing");

    let commands = m.handle(FlipEvent::DecoysReady {
      candidates: vec![blob(50), blob(51)],
    });
    assert_eq!(m.state_label(), "editing.protect.protecting");
    match commands.as_slice() {
      [
        Command::Protect {
          adversarial_images,
          adversarial_image_id,
          candidates,
          ..
        },
      ] => {
        assert_eq!(*adversarial_image_id, Some(2));
        assert_eq!(adversarial_images[2], Some(blob(50)));
        assert_eq!(candidates.len(), 2);
      }
      other => panic!("unexpected commands: {:?}", other),
    }
  }

  #[test]
  fn test_manual_decoy_leaves_preparing() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);
    m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.protect.preparing");

    for event in [FlipEvent::Next, FlipEvent::Prev, FlipEvent::Retry, FlipEvent::Protecting] {
      assert!(m.handle(event).is_empty());
      assert_eq!(m.state_label(), "editing.protect.preparing");
    }

    let commands = m.handle(FlipEvent::ChangeAdversarialImage { image: blob(60) });
    assert_eq!(m.state_label(), "editing.protect.protecting");
    match commands.as_slice() {
      [Command::Protect {
        adversarial_images,
        adversarial_image_id,
        ..
      }] => {
        assert_eq!(*adversarial_image_id, Some(2));
        assert_eq!(adversarial_images[2], Some(blob(60)));
      }
      other => panic!("unexpected commands: {:?}", other),
    }

    // The search finishing late does not restart protection.
    let commands = m.handle(FlipEvent::SearchFailed {
      message: "timed out".to_string(),
    });
    assert!(commands.is_empty());
    assert!(!m.context().decoy_search_pending);
    assert_eq!(m.state_label(), "editing.protect.protecting");
  }

  #[test]
  fn test_decoy_failure_does_not_block_protect() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);
    m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.protect.preparing");

    m.handle(FlipEvent::SearchDone {
      results: vec![ImageRef::new("https://img/1.png")],
    });
    let commands = m.handle(FlipEvent::DecoysFailed {
      message: "decode error".to_string(),
    });
    assert_eq!(m.state_label(), "editing.protect.protecting");
    assert!(matches!(commands.as_slice(), [Command::Protect { candidates, .. }] if candidates.is_empty()));
  }

  #[test]
  fn test_protect_failure_and_retry() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);
    m.handle(FlipEvent::SearchFailed {
      message: "offline".to_string(),
    });
    m.handle(FlipEvent::Next);

    let commands = m.handle(FlipEvent::ProtectFailed {
      message: "encode failed".to_string(),
    });
    assert_eq!(m.state_label(), "editing.protect.failure");
    assert!(has_error(&commands, Step::Protect));
    assert!(m.handle(FlipEvent::Next).is_empty());

    let commands = m.handle(FlipEvent::Retry);
    assert_eq!(m.state_label(), "editing.protect.protecting");
    assert!(matches!(commands.as_slice(), [Command::Protect { .. }]));
    assert!(m.context().protected_images.iter().all(Option::is_none));
  }

  #[test]
  fn test_incomplete_protect_result_fails() {
    let mut m = machine(3);
    prepared(&mut m);
    m.handle(FlipEvent::Next);
    fill_images(&mut m);
    m.handle(FlipEvent::SearchDone { results: Vec::new() });
    m.handle(FlipEvent::Next);

    m.handle(FlipEvent::Protected {
      images: vec![Some(blob(1)), None, Some(blob(3))],
    });
    assert_eq!(m.state_label(), "editing.protect.failure");
  }

  #[test]
  fn test_reentering_protect_recomputes() {
    let mut m = machine(3);
    protected(&mut m);
    m.handle(FlipEvent::ChangeProtectedImages {
      index: 0,
      image: blob(99),
    });
    assert_eq!(m.context().protected_images[0], Some(blob(99)));

    m.handle(FlipEvent::Next);
    let commands = m.handle(FlipEvent::Prev);
    assert_eq!(m.state_label(), "editing.protect.protecting");
    assert!(m.context().protected_images.iter().all(Option::is_none));
    assert!(matches!(commands.as_slice(), [Command::Protect { images, .. }] if images[0] == Some(blob(1))));
  }

  #[test]
  fn test_shuffle_adversarial() {
    let mut m = machine(3);
    protected(&mut m);

    let commands = m.handle(FlipEvent::ShuffleAdversarial);
    assert_eq!(m.state_label(), "editing.protect.shuffling");
    assert!(matches!(commands.as_slice(), [Command::ShuffleDecoy { .. }]));
    assert!(m.handle(FlipEvent::Next).is_empty());

    let commands = m.handle(FlipEvent::AdversarialShuffled { image: Some(blob(70)) });
    assert_eq!(m.state_label(), "editing.protect.idle");
    assert_eq!(m.context().protected_images[2], Some(blob(70)));
    assert!(m.context().did_show_shuffle_adversarial);
    assert!(matches!(
      commands.as_slice(),
      [Command::PersistFlag { key }] if *key == SHUFFLE_ADVERSARIAL_FLAG
    ));

    m.handle(FlipEvent::ShuffleAdversarial);
    let commands = m.handle(FlipEvent::AdversarialShuffled { image: None });
    assert!(matches!(commands.as_slice(), [Command::Notify(Notification::Info { .. })]));
    assert_eq!(m.context().protected_images[2], Some(blob(70)));
  }

  #[test]
  fn test_shuffle_step() {
    let mut m = machine(3);
    protected(&mut m);
    m.handle(FlipEvent::Next);
    assert_eq!(m.state_label(), "editing.shuffle.idle");
    assert_eq!(m.context().order, m.context().original_order);

    for _ in 0..20 {
      m.handle(FlipEvent::Shuffle);
      assert_eq!(m.state_label(), "editing.shuffle.shuffled");
      assert_ne!(m.context().order, m.context().original_order);
      assert!(is_bijection(&m.context().order, &m.context().original_order));
    }

    m.handle(FlipEvent::ManualShuffle { order: vec![1, 2, 0] });
    assert_eq!(m.state_label(), "editing.shuffle.manualShuffled");
    assert_eq!(m.context().order, vec![1, 2, 0]);

    let commands = m.handle(FlipEvent::ManualShuffle { order: vec![1, 1, 0] });
    assert!(has_error(&commands, Step::Shuffle));
    assert_eq!(m.context().order, vec![1, 2, 0]);

    m.handle(FlipEvent::ResetShuffle);
    assert_eq!(m.state_label(), "editing.shuffle.idle");
    assert_eq!(m.context().order, vec![0, 1, 2]);
  }

  #[test]
  fn test_two_slot_shuffle_swaps() {
    let mut m = machine(2);
    protected(&mut m);
    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::Shuffle);
    assert_eq!(m.context().order, vec![1, 0]);
  }

  #[test]
  fn test_single_slot_shuffle_fails() {
    let mut m = machine(1);
    protected(&mut m);
    m.handle(FlipEvent::Next);

    let commands = m.handle(FlipEvent::Shuffle);
    assert_eq!(m.state_label(), "editing.shuffle.failure");
    assert!(has_error(&commands, Step::Shuffle));
    m.handle(FlipEvent::Retry);
    assert_eq!(m.state_label(), "editing.shuffle.failure");
  }

  #[test]
  fn test_entering_shuffle_resets_order() {
    let mut m = machine(3);
    protected(&mut m);
    m.handle(FlipEvent::Next);
    m.handle(FlipEvent::Shuffle);
    m.handle(FlipEvent::Prev);
    m.handle(FlipEvent::Protected {
      images: vec![Some(blob(1)), Some(blob(2)), Some(blob(3))],
    });
    m.handle(FlipEvent::Next);
    assert_eq!(m.context().order, m.context().original_order);
  }

  #[test]
  fn test_submit_and_mine() {
    let mut m = machine(3);
    at_submit(&mut m);
    let order = m.context().order.clone();

    let commands = m.handle(FlipEvent::Submit);
    assert_eq!(m.state_label(), "editing.submit.submitting");
    match commands.as_slice() {
      [Command::Submit { submission }] => {
        assert_eq!(submission.epoch, 12);
        assert_eq!(submission.pair_id, 7);
        assert_eq!(submission.order, order);
        assert!(submission.images.iter().all(Option::is_some));
      }
      other => panic!("unexpected commands: {:?}", other),
    }
    assert!(m.handle(FlipEvent::Submit).is_empty());
    assert!(m.handle(FlipEvent::Prev).is_empty());

    let tx_hash = TxHash::new("0x01");
    let commands = m.handle(FlipEvent::Submitted {
      tx_hash: tx_hash.clone(),
    });
    assert_eq!(m.state_label(), "editing.submit.mining");
    assert!(matches!(commands.as_slice(), [Command::WatchConfirmation { tx_hash: t }] if *t == tx_hash));
    assert_eq!(m.context().tx_hash, Some(tx_hash.clone()));
    assert!(m.handle(FlipEvent::Prev).is_empty());

    let commands = m.handle(FlipEvent::FlipMined);
    assert_eq!(m.state_label(), "accepted");
    assert!(m.state().is_final());
    assert!(matches!(commands.as_slice(), [Command::RefreshFlips]));
    assert_eq!(m.context().tx_hash, Some(tx_hash));
  }

  #[test]
  fn test_rejected_submission_allows_resubmit() {
    let mut m = machine(3);
    at_submit(&mut m);

    let first = m.handle(FlipEvent::Submit);
    let commands = m.handle(FlipEvent::SubmitFailed {
      message: "insufficient funds".to_string(),
    });
    assert_eq!(m.state_label(), "editing.submit.failure");
    assert!(has_error(&commands, Step::Submit));
    assert_eq!(m.context().tx_hash, None);

    let second = m.handle(FlipEvent::Submit);
    match (first.as_slice(), second.as_slice()) {
      ([Command::Submit { submission: a }], [Command::Submit { submission: b }]) => assert_eq!(a, b),
      other => panic!("unexpected commands: {:?}", other),
    }

    // Editing is still possible before anything was broadcast.
    m.handle(FlipEvent::SubmitFailed {
      message: "again".to_string(),
    });
    m.handle(FlipEvent::Prev);
    assert_eq!(m.state_label(), "editing.shuffle.idle");
  }

  #[test]
  fn test_confirmation_timeout_and_retry() {
    let mut m = machine(3);
    at_submit(&mut m);
    m.handle(FlipEvent::Submit);
    m.handle(FlipEvent::Submitted {
      tx_hash: TxHash::new("0x02"),
    });

    let commands = m.handle(FlipEvent::ConfirmationTimedOut { attempts: 8 });
    assert_eq!(m.state_label(), "editing.submit.confirmationTimeout");
    assert!(has_error(&commands, Step::Submit));
    assert!(m.handle(FlipEvent::Prev).is_empty());
    assert!(m.handle(FlipEvent::Submit).is_empty());

    let commands = m.handle(FlipEvent::RetryConfirmation);
    assert_eq!(m.state_label(), "editing.submit.mining");
    assert!(matches!(commands.as_slice(), [Command::WatchConfirmation { .. }]));

    m.handle(FlipEvent::ConfirmationTimedOut { attempts: 8 });
    m.handle(FlipEvent::FlipMined);
    assert_eq!(m.state_label(), "accepted");
  }

  #[test]
  fn test_failed_confirmation_clears_tx_hash() {
    let mut m = machine(3);
    at_submit(&mut m);
    m.handle(FlipEvent::Submit);
    m.handle(FlipEvent::Submitted {
      tx_hash: TxHash::new("0x03"),
    });

    m.handle(FlipEvent::ConfirmationFailed {
      message: "reverted".to_string(),
    });
    assert_eq!(m.state_label(), "editing.submit.failure");
    assert_eq!(m.context().tx_hash, None);
    assert!(m.handle(FlipEvent::Prev).is_empty());

    let commands = m.handle(FlipEvent::Submit);
    assert!(matches!(commands.as_slice(), [Command::Submit { .. }]));
  }

  #[test]
  fn test_stale_events_are_ignored() {
    let mut m = machine(3);
    assert!(m.handle(FlipEvent::FlipMined).is_empty());
    assert_eq!(m.state_label(), "idle");

    prepared(&mut m);
    let before = m.context().clone();
    assert!(
      m.handle(FlipEvent::Protected {
        images: vec![Some(blob(1)); 3],
      })
      .is_empty()
    );
    assert!(
      m.handle(FlipEvent::Submitted {
        tx_hash: TxHash::new("0x04"),
      })
      .is_empty()
    );
    assert_eq!(m.context(), &before);
    assert_eq!(m.state_label(), "editing.keywords.loaded.fetchingTranslations");
  }

  #[test]
  fn test_accepted_is_terminal() {
    let mut m = machine(3);
    at_submit(&mut m);
    m.handle(FlipEvent::Submit);
    m.handle(FlipEvent::Submitted {
      tx_hash: TxHash::new("0x05"),
    });
    m.handle(FlipEvent::FlipMined);

    for event in [FlipEvent::Prev, FlipEvent::Next, FlipEvent::Submit, FlipEvent::SwitchLocale] {
      assert!(m.handle(event).is_empty());
    }
    assert_eq!(m.state_label(), "accepted");
  }

  #[test]
  fn test_random_event_sequences_keep_invariants() {
    let mut driver = StdRng::seed_from_u64(42);
    for _ in 0..50 {
      let mut m = machine(3);
      prepared(&mut m);

      for _ in 0..200 {
        let event = match driver.gen_range(0..14) {
          0 => FlipEvent::Next,
          1 => FlipEvent::Prev,
          2 => FlipEvent::Painting,
          3 => FlipEvent::ChangeImages {
            index: driver.gen_range(0..4),
            image: Some(blob(driver.r#gen())),
          },
          4 => FlipEvent::SearchDone { results: Vec::new() },
          5 => FlipEvent::DecoysReady {
            candidates: vec![blob(40)],
          },
          6 => FlipEvent::Protected {
            images: vec![Some(blob(1)); 3],
          },
          7 => FlipEvent::ProtectFailed {
            message: "boom".to_string(),
          },
          8 => FlipEvent::Retry,
          9 => FlipEvent::Shuffle,
          10 => FlipEvent::ManualShuffle {
            order: vec![driver.gen_range(0..3), driver.gen_range(0..3), driver.gen_range(0..3)],
          },
          11 => FlipEvent::Submit,
          12 => FlipEvent::SubmitFailed {
            message: "rejected".to_string(),
          },
          _ => FlipEvent::ChangeAdversarialId {
            index: Some(driver.gen_range(0..4)),
          },
        };
        m.handle(event);

        let ctx = m.context();
        assert!(is_bijection(&ctx.order, &ctx.original_order));
        assert_eq!(ctx.images.len(), 3);
        assert_eq!(ctx.adversarial_images.len(), 3);
        assert_eq!(ctx.protected_images.len(), 3);
        assert!(ctx.adversarial_image_id.is_none_or(|slot| slot < 3));
        if m.matches("editing.shuffle") || m.matches("editing.submit") {
          assert!(ctx.protected_complete());
        }
      }
    }
  }

  #[test]
  fn test_notification_serializes_with_kind() {
    let notification = Notification::Error {
      step: Step::Submit,
      message: "rejected".to_string(),
    };
    let json = serde_json::to_value(&notification).unwrap();
    assert_eq!(json["kind"], "error");
    assert_eq!(json["step"], "submit");
  }
}
