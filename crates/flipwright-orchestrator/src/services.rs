use std::sync::Arc;

use flipwright_backend::{ImageSearchBackend, PairSource, PublishBackend, TranslationSource};
use flipwright_host_kv::KvStore;
use flipwright_store::DraftStore;

/// The collaborators a runner talks to.
#[derive(Clone)]
pub struct Services {
  pub pairs: Arc<dyn PairSource>,
  pub translations: Arc<dyn TranslationSource>,
  pub images: Arc<dyn ImageSearchBackend>,
  pub publisher: Arc<dyn PublishBackend>,
  pub drafts: Arc<dyn DraftStore>,
  pub kv: Arc<dyn KvStore>,
}
