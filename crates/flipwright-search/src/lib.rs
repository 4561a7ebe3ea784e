//! Image acquisition for flip decoys.
//!
//! [`ImageSearchService`] runs one search at a time against an
//! [`ImageSearchBackend`](flipwright_backend::ImageSearchBackend). Starting a
//! search for a different query cancels the one in flight; every search is
//! tagged with a generation and results from an outdated generation are
//! dropped, so the latest search always wins.
//!
//! Outcomes are reported through a [`SearchNotifier`]. A failed or timed out
//! search is logged and reported but never treated as fatal by the workflow.

mod events;
mod service;

pub use events::{ChannelSearchNotifier, NoopSearchNotifier, SearchEvent, SearchNotifier};
pub use service::{ImageSearchService, SearchRequest, SearchState};

/// Errors reported by a search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
  #[error("image search for '{query}' failed: {message}")]
  Backend { query: String, message: String },

  #[error("image search for '{query}' timed out after {timeout_ms}ms")]
  Timeout { query: String, timeout_ms: u64 },

  #[error("image search cancelled")]
  Cancelled,
}
