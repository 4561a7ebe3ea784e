use flipwright_protect::ProtectionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("flip runner channel closed")]
  ChannelClosed,

  #[error("failed to set up the protect pipeline: {0}")]
  Pipeline(#[from] ProtectionError),
}
