use std::fmt;

use serde::{Deserialize, Serialize};

/// The five editing steps, in navigation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  Keywords,
  Images,
  Protect,
  Shuffle,
  Submit,
}

impl Step {
  pub fn next(self) -> Option<Step> {
    match self {
      Step::Keywords => Some(Step::Images),
      Step::Images => Some(Step::Protect),
      Step::Protect => Some(Step::Shuffle),
      Step::Shuffle => Some(Step::Submit),
      Step::Submit => None,
    }
  }

  pub fn prev(self) -> Option<Step> {
    match self {
      Step::Keywords => None,
      Step::Images => Some(Step::Keywords),
      Step::Protect => Some(Step::Images),
      Step::Shuffle => Some(Step::Protect),
      Step::Submit => Some(Step::Shuffle),
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Step::Keywords => "keywords",
      Step::Images => "images",
      Step::Protect => "protect",
      Step::Shuffle => "shuffle",
      Step::Submit => "submit",
    }
  }
}

impl fmt::Display for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Community translation sub-state of `keywords.loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationsState {
  Fetching,
  Fetched { suggesting: bool },
  /// Translations are unavailable (offline); the step still works.
  FetchFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeywordsState {
  Loading,
  Loaded(TranslationsState),
  Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagesState {
  Idle,
  Painting,
  Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectState {
  /// Waiting for decoy candidates before protecting.
  Preparing,
  Protecting,
  /// Swapping the decoy for another candidate.
  Shuffling,
  Idle,
  Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShuffleState {
  Idle,
  Shuffled,
  ManualShuffled,
  Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitState {
  Idle,
  Submitting,
  Mining,
  /// Confirmation was not observed in time. The transaction is already
  /// broadcast, so the flip cannot be edited or resubmitted from here.
  ConfirmationTimeout,
  Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditingState {
  Keywords(KeywordsState),
  Images(ImagesState),
  Protect(ProtectState),
  Shuffle(ShuffleState),
  Submit(SubmitState),
}

impl EditingState {
  pub fn step(&self) -> Step {
    match self {
      EditingState::Keywords(_) => Step::Keywords,
      EditingState::Images(_) => Step::Images,
      EditingState::Protect(_) => Step::Protect,
      EditingState::Shuffle(_) => Step::Shuffle,
      EditingState::Submit(_) => Step::Submit,
    }
  }

  pub fn is_in_progress(&self) -> bool {
    matches!(
      self,
      EditingState::Keywords(KeywordsState::Loading)
        | EditingState::Images(ImagesState::Painting)
        | EditingState::Protect(ProtectState::Preparing | ProtectState::Protecting | ProtectState::Shuffling)
        | EditingState::Submit(SubmitState::Submitting | SubmitState::Mining)
    )
  }

  fn variant(&self) -> &'static str {
    match self {
      EditingState::Keywords(state) => match state {
        KeywordsState::Loading => "loading",
        KeywordsState::Loaded(TranslationsState::Fetching) => "loaded.fetchingTranslations",
        KeywordsState::Loaded(TranslationsState::Fetched { suggesting: false }) => {
          "loaded.fetchedTranslations"
        }
        KeywordsState::Loaded(TranslationsState::Fetched { suggesting: true }) => {
          "loaded.fetchedTranslations.suggesting"
        }
        KeywordsState::Loaded(TranslationsState::FetchFailed) => "loaded.fetchTranslationsFailed",
        KeywordsState::Failure => "failure",
      },
      EditingState::Images(state) => match state {
        ImagesState::Idle => "idle",
        ImagesState::Painting => "painting",
        ImagesState::Failure => "failure",
      },
      EditingState::Protect(state) => match state {
        ProtectState::Preparing => "preparing",
        ProtectState::Protecting => "protecting",
        ProtectState::Shuffling => "shuffling",
        ProtectState::Idle => "idle",
        ProtectState::Failure => "failure",
      },
      EditingState::Shuffle(state) => match state {
        ShuffleState::Idle => "idle",
        ShuffleState::Shuffled => "shuffled",
        ShuffleState::ManualShuffled => "manualShuffled",
        ShuffleState::Failure => "failure",
      },
      EditingState::Submit(state) => match state {
        SubmitState::Idle => "idle",
        SubmitState::Submitting => "submitting",
        SubmitState::Mining => "mining",
        SubmitState::ConfirmationTimeout => "confirmationTimeout",
        SubmitState::Failure => "failure",
      },
    }
  }
}

/// Top-level state of a flip workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlipState {
  /// Waiting for `PREPARE_FLIP`.
  #[default]
  Idle,
  Editing(EditingState),
  /// The flip is mined. Terminal.
  Accepted,
}

impl FlipState {
  /// Dotted path of the active state, e.g. `editing.protect.preparing`.
  pub fn label(&self) -> String {
    match self {
      FlipState::Idle => "idle".to_string(),
      FlipState::Editing(editing) => format!("editing.{}.{}", editing.step(), editing.variant()),
      FlipState::Accepted => "accepted".to_string(),
    }
  }

  /// Whether the label equals `path` or lies below it.
  pub fn matches(&self, path: &str) -> bool {
    let label = self.label();
    label == path || label.strip_prefix(path).is_some_and(|rest| rest.starts_with('.'))
  }

  pub fn step(&self) -> Option<Step> {
    match self {
      FlipState::Editing(editing) => Some(editing.step()),
      _ => None,
    }
  }

  pub fn is_in_progress(&self) -> bool {
    matches!(self, FlipState::Editing(editing) if editing.is_in_progress())
  }

  pub fn is_final(&self) -> bool {
    matches!(self, FlipState::Accepted)
  }
}

impl fmt::Display for FlipState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.label())
  }
}
