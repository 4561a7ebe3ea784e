//! Submission and confirmation of finished flips.
//!
//! [`SubmissionController::submit_flip`] validates a context snapshot and
//! hands the serialized payload to the publish backend. Confirmation is a
//! separate call, [`SubmissionController::watch_confirmation`], so the
//! caller can report the transaction hash before the flip is mined.

mod controller;
mod error;

pub use controller::SubmissionController;
pub use error::{ConfirmationError, SubmissionError};
