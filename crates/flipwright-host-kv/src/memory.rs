use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::{KvFuture, KvStore};

/// In-memory KV store implementation.
///
/// Suitable for single-process use or testing.
#[derive(Debug, Default)]
pub struct InMemoryKvStore {
  data: Mutex<HashMap<String, String>>,
}

impl InMemoryKvStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStore for InMemoryKvStore {
  fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
    Box::pin(async move { Ok(self.data.lock().await.get(key).cloned()) })
  }

  fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()> {
    Box::pin(async move {
      self.data.lock().await.insert(key.to_string(), value);
      Ok(())
    })
  }

  fn delete<'a>(&'a self, key: &'a str) -> KvFuture<'a, ()> {
    Box::pin(async move {
      self.data.lock().await.remove(key);
      Ok(())
    })
  }
}
