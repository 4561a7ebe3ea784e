//! Flipwright Engine
//!
//! The flip workflow as a deterministic, synchronous state machine. The
//! machine owns the [`WorkflowContext`]; every change to it happens inside
//! [`FlipMachine::handle`], one event at a time. Side effects are returned
//! as [`Command`]s for a runner to execute, and their outcomes come back as
//! further events.
//!
//! ```text
//!            ┌──────────────── FlipEvent ◄──────────────┐
//!            ▼                                          │
//!   ┌──────────────────┐   Vec<Command>   ┌───────────────────────┐
//!   │   FlipMachine    │ ───────────────► │  runner (async tasks) │
//!   │  state + context │                  │  search, protect, ... │
//!   └──────────────────┘                  └───────────────────────┘
//! ```
//!
//! States nest as `editing.<step>.<variant>`; see [`FlipState::label`].
//! Navigation (`NEXT`/`PREV`) is refused while any step is in an
//! in-progress variant, and once a flip is mining it can no longer go back.

mod command;
mod event;
mod machine;
mod state;

pub use command::{BAD_FLIP_FLAG, Command, Notification, SHUFFLE_ADVERSARIAL_FLAG};
pub use event::FlipEvent;
pub use flipwright_flip::WorkflowContext;
pub use machine::FlipMachine;
pub use state::{
  EditingState, FlipState, ImagesState, KeywordsState, ProtectState, ShuffleState, Step,
  SubmitState, TranslationsState,
};
