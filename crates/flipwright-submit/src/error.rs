use flipwright_flip::TxHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmissionError {
  #[error("invalid flip: {message}")]
  InvalidFlip { message: String },

  #[error("publish rejected: {message}")]
  Rejected { message: String },

  #[error("failed to serialize flip: {0}")]
  Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfirmationError {
  #[error("transaction {tx_hash} failed: {reason}")]
  Failed { tx_hash: TxHash, reason: String },

  #[error("transaction {tx_hash} not confirmed after {attempts} attempts")]
  Timeout { tx_hash: TxHash, attempts: u32 },

  #[error("confirmation watch cancelled")]
  Cancelled,
}
