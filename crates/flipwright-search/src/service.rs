use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use flipwright_backend::ImageSearchBackend;
use flipwright_flip::ImageRef;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::SearchError;
use crate::events::{SearchEvent, SearchNotifier};

/// Observable state of the search service.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
  Idle,
  Searching {
    generation: u64,
    query: String,
  },
  Done {
    generation: u64,
    query: String,
    results: Vec<ImageRef>,
  },
  Failed {
    generation: u64,
    query: String,
    error: SearchError,
  },
}

/// What a call to [`ImageSearchService::search`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchRequest {
  /// A new search generation was started.
  Started { generation: u64 },
  /// The same query is already being searched.
  AlreadySearching { generation: u64 },
}

struct Inner {
  state: SearchState,
  generation: u64,
  current: Option<CancellationToken>,
}

/// Restartable decoy image search.
///
/// Cloning yields another handle to the same service.
pub struct ImageSearchService<N: SearchNotifier> {
  backend: Arc<dyn ImageSearchBackend>,
  notifier: Arc<N>,
  inner: Arc<Mutex<Inner>>,
  result_limit: usize,
  timeout: Option<Duration>,
  shutdown: CancellationToken,
}

impl<N: SearchNotifier> Clone for ImageSearchService<N> {
  fn clone(&self) -> Self {
    Self {
      backend: self.backend.clone(),
      notifier: self.notifier.clone(),
      inner: self.inner.clone(),
      result_limit: self.result_limit,
      timeout: self.timeout,
      shutdown: self.shutdown.clone(),
    }
  }
}

impl<N: SearchNotifier + 'static> ImageSearchService<N> {
  /// Create a service; searches are cancelled when `shutdown` fires.
  pub fn new(
    backend: Arc<dyn ImageSearchBackend>,
    notifier: N,
    result_limit: usize,
    shutdown: CancellationToken,
  ) -> Self {
    Self {
      backend,
      notifier: Arc::new(notifier),
      inner: Arc::new(Mutex::new(Inner {
        state: SearchState::Idle,
        generation: 0,
        current: None,
      })),
      result_limit,
      timeout: None,
      shutdown,
    }
  }

  /// Fail searches that take longer than `timeout`.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn state(&self) -> SearchState {
    self.lock().state.clone()
  }

  pub fn is_searching(&self) -> bool {
    matches!(self.lock().state, SearchState::Searching { .. })
  }

  /// Start searching for `query`.
  ///
  /// A search already running for the same query is left alone. A search for
  /// any other query is cancelled and its results will be discarded.
  pub fn search(&self, query: impl Into<String>) -> SearchRequest {
    let query = query.into();
    let mut inner = self.lock();

    if let SearchState::Searching {
      generation,
      query: current,
    } = &inner.state
      && *current == query
    {
      return SearchRequest::AlreadySearching {
        generation: *generation,
      };
    }

    if let Some(previous) = inner.current.take() {
      debug!(generation = inner.generation, "cancelling previous search");
      previous.cancel();
    }

    inner.generation += 1;
    let generation = inner.generation;
    let token = self.shutdown.child_token();
    inner.current = Some(token.clone());
    inner.state = SearchState::Searching {
      generation,
      query: query.clone(),
    };
    drop(inner);

    let service = self.clone();
    tokio::spawn(async move { service.run(generation, query, token).await });

    SearchRequest::Started { generation }
  }

  /// Cancel the search in flight, if any, and return to idle.
  pub fn cancel(&self) {
    let mut inner = self.lock();
    if let Some(token) = inner.current.take() {
      token.cancel();
    }
    if matches!(inner.state, SearchState::Searching { .. }) {
      inner.generation += 1;
      inner.state = SearchState::Idle;
    }
  }

  #[instrument(name = "decoy_search", skip(self, token))]
  async fn run(&self, generation: u64, query: String, token: CancellationToken) {
    info!("searching for decoy images");

    let search = async {
      let result = match self.timeout {
        Some(limit) => match tokio::time::timeout(limit, self.backend.search(&query)).await {
          Ok(result) => result,
          Err(_) => {
            return Err(SearchError::Timeout {
              query: query.clone(),
              timeout_ms: limit.as_millis() as u64,
            });
          }
        },
        None => self.backend.search(&query).await,
      };
      result.map_err(|e| SearchError::Backend {
        query: query.clone(),
        message: e.to_string(),
      })
    };

    let outcome = tokio::select! {
      _ = token.cancelled() => Err(SearchError::Cancelled),
      outcome = search => outcome,
    };

    let event = {
      let mut inner = self.lock();
      if inner.generation != generation {
        debug!(current = inner.generation, "discarding stale search outcome");
        return;
      }
      inner.current = None;

      match outcome {
        Ok(mut results) => {
          results.truncate(self.result_limit);
          info!(results = results.len(), "decoy search done");
          inner.state = SearchState::Done {
            generation,
            query: query.clone(),
            results: results.clone(),
          };
          SearchEvent::Done {
            generation,
            query,
            results,
          }
        }
        Err(error) => {
          warn!(error = %error, "decoy search failed");
          inner.state = SearchState::Failed {
            generation,
            query: query.clone(),
            error: error.clone(),
          };
          SearchEvent::Failed {
            generation,
            query,
            error,
          }
        }
      }
    };

    self.notifier.notify(event);
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use flipwright_backend::BackendError;
  use flipwright_backend::memory::InMemoryImageSearch;
  use flipwright_flip::ImageBlob;
  use tokio::sync::mpsc;

  use super::*;
  use crate::events::ChannelSearchNotifier;

  fn service(
    backend: Arc<InMemoryImageSearch>,
    limit: usize,
  ) -> (
    ImageSearchService<ChannelSearchNotifier>,
    mpsc::UnboundedReceiver<SearchEvent>,
  ) {
    let (tx, rx) = mpsc::unbounded_channel();
    let service = ImageSearchService::new(
      backend,
      ChannelSearchNotifier::new(tx),
      limit,
      CancellationToken::new(),
    );
    (service, rx)
  }

  fn backend_with(query: &str, count: usize) -> Arc<InMemoryImageSearch> {
    let backend = Arc::new(InMemoryImageSearch::new());
    for i in 0..count {
      backend.add_result(query, &format!("https://img/{}/{}", query, i), ImageBlob::png(vec![i as u8]));
    }
    backend
  }

  #[tokio::test]
  async fn test_search_reports_results() {
    let backend = backend_with("apple rocket", 3);
    let (service, mut rx) = service(backend, 8);

    assert_eq!(
      service.search("apple rocket"),
      SearchRequest::Started { generation: 1 }
    );

    match rx.recv().await.unwrap() {
      SearchEvent::Done {
        generation,
        results,
        ..
      } => {
        assert_eq!(generation, 1);
        assert_eq!(results.len(), 3);
      }
      other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(service.state(), SearchState::Done { .. }));
  }

  #[tokio::test]
  async fn test_results_are_truncated_to_limit() {
    let backend = backend_with("q", 5);
    let (service, mut rx) = service(backend, 2);
    service.search("q");

    let event = rx.recv().await.unwrap();
    assert!(matches!(event, SearchEvent::Done { ref results, .. } if results.len() == 2));
  }

  #[tokio::test]
  async fn test_same_query_is_not_restarted() {
    let backend = backend_with("q", 1);
    backend.set_delay(Some(Duration::from_millis(50)));
    let (service, mut rx) = service(backend.clone(), 8);

    service.search("q");
    assert_eq!(
      service.search("q"),
      SearchRequest::AlreadySearching { generation: 1 }
    );

    assert_eq!(rx.recv().await.unwrap().generation(), 1);
    assert_eq!(backend.search_count(), 1);
  }

  #[tokio::test]
  async fn test_latest_search_wins() {
    let backend = backend_with("old", 1);
    backend.add_result("new", "https://img/new", ImageBlob::png(vec![9u8]));
    backend.set_delay(Some(Duration::from_millis(30)));
    let (service, mut rx) = service(backend, 8);

    service.search("old");
    service.search("new");

    let event = rx.recv().await.unwrap();
    match event {
      SearchEvent::Done {
        generation, query, ..
      } => {
        assert_eq!(generation, 2);
        assert_eq!(query, "new");
      }
      other => panic!("unexpected event: {:?}", other),
    }

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_failure_is_reported_not_fatal() {
    let backend = Arc::new(InMemoryImageSearch::new());
    backend.set_failure(Some(BackendError::unavailable("search down")));
    let (service, mut rx) = service(backend.clone(), 8);

    service.search("q");
    assert!(matches!(rx.recv().await.unwrap(), SearchEvent::Failed { .. }));
    assert!(matches!(service.state(), SearchState::Failed { .. }));

    backend.set_failure(None);
    assert_eq!(service.search("q"), SearchRequest::Started { generation: 2 });
    assert!(matches!(rx.recv().await.unwrap(), SearchEvent::Done { .. }));
  }

  #[tokio::test]
  async fn test_slow_backend_times_out() {
    let backend = backend_with("q", 1);
    backend.set_delay(Some(Duration::from_secs(5)));
    let (service, mut rx) = service(backend.clone(), 8);
    let service = service.with_timeout(Duration::from_millis(20));

    service.search("q");
    match rx.recv().await.unwrap() {
      SearchEvent::Failed { generation, error, .. } => {
        assert_eq!(generation, 1);
        assert_eq!(
          error,
          SearchError::Timeout {
            query: "q".to_string(),
            timeout_ms: 20,
          }
        );
      }
      other => panic!("unexpected event: {:?}", other),
    }
    assert!(matches!(service.state(), SearchState::Failed { .. }));

    // A later search for the same query starts over.
    backend.set_delay(None);
    assert_eq!(service.search("q"), SearchRequest::Started { generation: 2 });
    assert!(matches!(rx.recv().await.unwrap(), SearchEvent::Done { .. }));
  }

  #[tokio::test]
  async fn test_cancel_discards_in_flight_search() {
    let backend = backend_with("q", 1);
    backend.set_delay(Some(Duration::from_millis(30)));
    let (service, mut rx) = service(backend, 8);

    service.search("q");
    service.cancel();
    assert_eq!(service.state(), SearchState::Idle);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(rx.try_recv().is_err());
  }
}
