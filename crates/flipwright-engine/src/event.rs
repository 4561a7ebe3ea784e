use flipwright_flip::{
  AllocationError, ImageBlob, ImageRef, SigningKey, Translation, TxHash, WordPair,
};

/// Everything that can happen to a flip workflow.
///
/// User intents are named after the action (`Next`, `ChangeImages`);
/// service completions after their outcome (`PairAllocated`,
/// `ProtectFailed`).
#[derive(Debug, Clone)]
pub enum FlipEvent {
  /// Start a new flip for `epoch`.
  PrepareFlip { epoch: u64, signing_key: SigningKey },

  // Keywords
  PairAllocated {
    available: Vec<WordPair>,
    keyword_pair_id: usize,
    did_show_bad_flip: bool,
  },
  AllocationFailed { error: AllocationError },
  TranslationsFetched { translations: Vec<Vec<Translation>> },
  TranslationsFailed { message: String },
  /// A vote or suggestion was recorded.
  TranslationUpdated,
  TranslationUpdateFailed { message: String },
  ChangeKeywords,
  SwitchLocale,
  ToggleCommunityTranslations,
  Vote { translation_id: String, up: bool },
  Suggest { word_id: u64, name: String, desc: String },
  SkipBadFlip,

  // Navigation
  Next,
  Prev,
  /// Re-run the service of a failed step.
  Retry,

  // Images
  Painting,
  ChangeImages { index: usize, image: Option<ImageBlob> },
  ChangeOriginalOrder { order: Vec<usize> },
  /// Move the decoy slot; `None` unlocks it.
  ChangeAdversarialId { index: Option<usize> },
  /// The image editor could not produce a slot image.
  ImagesFailed { message: String },

  // Decoy search and preparation
  SearchDone { results: Vec<ImageRef> },
  SearchFailed { message: String },
  DecoysReady { candidates: Vec<ImageBlob> },
  DecoysFailed { message: String },

  // Protect
  Protecting,
  Protected { images: Vec<Option<ImageBlob>> },
  ProtectFailed { message: String },
  ChangeProtectedImages { index: usize, image: ImageBlob },
  ChangeAdversarialImage { image: ImageBlob },
  ShuffleAdversarial,
  AdversarialShuffled { image: Option<ImageBlob> },

  // Shuffle
  Shuffle,
  ManualShuffle { order: Vec<usize> },
  ResetShuffle,

  // Submit
  Submit,
  Submitted { tx_hash: TxHash },
  SubmitFailed { message: String },
  FlipMined,
  ConfirmationFailed { message: String },
  ConfirmationTimedOut { attempts: u32 },
  RetryConfirmation,
}

impl FlipEvent {
  /// Short name used in logs.
  pub fn name(&self) -> &'static str {
    match self {
      FlipEvent::PrepareFlip { .. } => "PREPARE_FLIP",
      FlipEvent::PairAllocated { .. } => "PAIR_ALLOCATED",
      FlipEvent::AllocationFailed { .. } => "ALLOCATION_FAILED",
      FlipEvent::TranslationsFetched { .. } => "TRANSLATIONS_FETCHED",
      FlipEvent::TranslationsFailed { .. } => "TRANSLATIONS_FAILED",
      FlipEvent::TranslationUpdated => "TRANSLATION_UPDATED",
      FlipEvent::TranslationUpdateFailed { .. } => "TRANSLATION_UPDATE_FAILED",
      FlipEvent::ChangeKeywords => "CHANGE_KEYWORDS",
      FlipEvent::SwitchLocale => "SWITCH_LOCALE",
      FlipEvent::ToggleCommunityTranslations => "TOGGLE_COMMUNITY_TRANSLATIONS",
      FlipEvent::Vote { .. } => "VOTE",
      FlipEvent::Suggest { .. } => "SUGGEST",
      FlipEvent::SkipBadFlip => "SKIP_BAD_FLIP",
      FlipEvent::Next => "NEXT",
      FlipEvent::Prev => "PREV",
      FlipEvent::Retry => "RETRY",
      FlipEvent::Painting => "PAINTING",
      FlipEvent::ChangeImages { .. } => "CHANGE_IMAGES",
      FlipEvent::ChangeOriginalOrder { .. } => "CHANGE_ORIGINAL_ORDER",
      FlipEvent::ChangeAdversarialId { .. } => "CHANGE_ADVERSARIAL_ID",
      FlipEvent::ImagesFailed { .. } => "IMAGES_FAILED",
      FlipEvent::SearchDone { .. } => "SEARCH_DONE",
      FlipEvent::SearchFailed { .. } => "SEARCH_FAILED",
      FlipEvent::DecoysReady { .. } => "DECOYS_READY",
      FlipEvent::DecoysFailed { .. } => "DECOYS_FAILED",
      FlipEvent::Protecting => "PROTECTING",
      FlipEvent::Protected { .. } => "PROTECTED",
      FlipEvent::ProtectFailed { .. } => "PROTECT_FAILED",
      FlipEvent::ChangeProtectedImages { .. } => "CHANGE_PROTECTED_IMAGES",
      FlipEvent::ChangeAdversarialImage { .. } => "CHANGE_ADVERSARIAL_IMAGE",
      FlipEvent::ShuffleAdversarial => "SHUFFLE_ADVERSARIAL",
      FlipEvent::AdversarialShuffled { .. } => "ADVERSARIAL_SHUFFLED",
      FlipEvent::Shuffle => "SHUFFLE",
      FlipEvent::ManualShuffle { .. } => "MANUAL_SHUFFLE",
      FlipEvent::ResetShuffle => "RESET_SHUFFLE",
      FlipEvent::Submit => "SUBMIT",
      FlipEvent::Submitted { .. } => "SUBMITTED",
      FlipEvent::SubmitFailed { .. } => "SUBMIT_FAILED",
      FlipEvent::FlipMined => "FLIP_MINED",
      FlipEvent::ConfirmationFailed { .. } => "CONFIRMATION_FAILED",
      FlipEvent::ConfirmationTimedOut { .. } => "CONFIRMATION_TIMED_OUT",
      FlipEvent::RetryConfirmation => "RETRY_CONFIRMATION",
    }
  }
}
