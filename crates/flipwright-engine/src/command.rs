use flipwright_flip::{FlipSubmission, ImageBlob, ImageRef, TxHash, WordRef};
use serde::{Deserialize, Serialize};

use crate::state::Step;

/// KV key remembering that the bad flip rules were dismissed.
pub const BAD_FLIP_FLAG: &str = "didShowBadFlipNew";
/// KV key remembering that the decoy reshuffle hint was shown.
pub const SHUFFLE_ADVERSARIAL_FLAG: &str = "didShowShuffleAdversarial";

/// User-visible messages raised by the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
  Error { step: Step, message: String },
  Info { message: String },
}

/// A side effect requested by the machine.
///
/// Each service command is answered by one completion event.
#[derive(Debug, Clone)]
pub enum Command {
  /// Answered by `PairAllocated` or `AllocationFailed`.
  AllocatePair,
  /// Answered by `TranslationsFetched` or `TranslationsFailed`.
  FetchTranslations { words: Vec<WordRef>, locale: String },
  /// Answered by `TranslationUpdated` or `TranslationUpdateFailed`.
  Vote { translation_id: String, up: bool },
  Suggest {
    word_id: u64,
    name: String,
    desc: String,
    locale: String,
  },
  /// Answered by `SearchDone` or `SearchFailed`.
  SearchDecoys { query: String },
  /// Answered by `DecoysReady` or `DecoysFailed`.
  PrepareDecoys { results: Vec<ImageRef> },
  /// Answered by `Protected` or `ProtectFailed`.
  Protect {
    images: Vec<Option<ImageBlob>>,
    adversarial_images: Vec<Option<ImageBlob>>,
    adversarial_image_id: Option<usize>,
    candidates: Vec<ImageBlob>,
  },
  /// Answered by `AdversarialShuffled`.
  ShuffleDecoy {
    candidates: Vec<ImageBlob>,
    current: Option<ImageBlob>,
  },
  /// Answered by `Submitted` or `SubmitFailed`.
  Submit { submission: FlipSubmission },
  /// Answered by `FlipMined`, `ConfirmationFailed` or `ConfirmationTimedOut`.
  WatchConfirmation { tx_hash: TxHash },
  RefreshFlips,
  PersistFlag { key: &'static str },
  Notify(Notification),
}

impl Command {
  pub fn name(&self) -> &'static str {
    match self {
      Command::AllocatePair => "allocate_pair",
      Command::FetchTranslations { .. } => "fetch_translations",
      Command::Vote { .. } => "vote",
      Command::Suggest { .. } => "suggest",
      Command::SearchDecoys { .. } => "search_decoys",
      Command::PrepareDecoys { .. } => "prepare_decoys",
      Command::Protect { .. } => "protect",
      Command::ShuffleDecoy { .. } => "shuffle_decoy",
      Command::Submit { .. } => "submit",
      Command::WatchConfirmation { .. } => "watch_confirmation",
      Command::RefreshFlips => "refresh_flips",
      Command::PersistFlag { .. } => "persist_flag",
      Command::Notify(_) => "notify",
    }
  }
}
