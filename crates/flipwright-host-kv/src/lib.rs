//! Injected key-value storage.
//!
//! Drafts and one-time UI flags live behind [`KvStore`] so the workflow
//! never touches ambient global storage. Two backends are provided:
//! [`InMemoryKvStore`] for tests and embedding, and [`JsonFileKvStore`]
//! which keeps a single JSON object on disk.

mod file;
mod memory;

use std::future::Future;
use std::pin::Pin;

pub use file::JsonFileKvStore;
pub use memory::InMemoryKvStore;

/// Boxed future returned by [`KvStore`] methods.
pub type KvFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, KvError>> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum KvError {
  #[error("kv io error on '{path}': {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("kv file '{path}' is corrupt: {source}")]
  Corrupt {
    path: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Trait for string key-value storage.
///
/// This trait is async to support file and networked backends. Methods take
/// `&self`; implementations synchronize internally so a store can be shared
/// behind an `Arc`.
pub trait KvStore: Send + Sync {
  /// Get a value by key.
  fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>>;

  /// Set a value.
  fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()>;

  /// Delete a value.
  fn delete<'a>(&'a self, key: &'a str) -> KvFuture<'a, ()>;
}
