use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{KvError, KvFuture, KvStore};

/// KV store persisted as one JSON object in a single file.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename. The mutex serializes writers within the process.
#[derive(Debug)]
pub struct JsonFileKvStore {
  path: PathBuf,
  lock: Mutex<()>,
}

impl JsonFileKvStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      lock: Mutex::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn io_error(&self, source: std::io::Error) -> KvError {
    KvError::Io {
      path: self.path.display().to_string(),
      source,
    }
  }

  async fn read_all(&self) -> Result<BTreeMap<String, String>, KvError> {
    match fs::read_to_string(&self.path).await {
      Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
      Ok(content) => serde_json::from_str(&content).map_err(|source| KvError::Corrupt {
        path: self.path.display().to_string(),
        source,
      }),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
      Err(e) => Err(self.io_error(e)),
    }
  }

  async fn write_all(&self, data: &BTreeMap<String, String>) -> Result<(), KvError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      fs::create_dir_all(parent)
        .await
        .map_err(|e| self.io_error(e))?;
    }

    let content = serde_json::to_string_pretty(data).map_err(|source| KvError::Corrupt {
      path: self.path.display().to_string(),
      source,
    })?;
    let tmp = self.path.with_extension("tmp");
    fs::write(&tmp, content)
      .await
      .map_err(|e| self.io_error(e))?;
    fs::rename(&tmp, &self.path)
      .await
      .map_err(|e| self.io_error(e))?;

    debug!(path = %self.path.display(), keys = data.len(), "kv file written");
    Ok(())
  }
}

impl KvStore for JsonFileKvStore {
  fn get<'a>(&'a self, key: &'a str) -> KvFuture<'a, Option<String>> {
    Box::pin(async move {
      let _guard = self.lock.lock().await;
      Ok(self.read_all().await?.remove(key))
    })
  }

  fn set<'a>(&'a self, key: &'a str, value: String) -> KvFuture<'a, ()> {
    Box::pin(async move {
      let _guard = self.lock.lock().await;
      let mut data = self.read_all().await?;
      data.insert(key.to_string(), value);
      self.write_all(&data).await
    })
  }

  fn delete<'a>(&'a self, key: &'a str) -> KvFuture<'a, ()> {
    Box::pin(async move {
      let _guard = self.lock.lock().await;
      let mut data = self.read_all().await?;
      if data.remove(key).is_some() {
        self.write_all(&data).await?;
      }
      Ok(())
    })
  }
}
