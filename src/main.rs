use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use flipwright_backend::memory::{
  ConfirmMode, InMemoryImageSearch, InMemoryPairSource, InMemoryPublisher, InMemoryTranslations,
};
use flipwright_config::{DecoyConfig, FlipConfig};
use flipwright_engine::{FlipEvent, Notification};
use flipwright_flip::{
  ImageBlob, Keywords, SigningKey, WordPair, available_pairs, identity_order, shuffle_order,
};
use flipwright_host_kv::JsonFileKvStore;
use flipwright_orchestrator::{ChannelNotifier, FlipHandle, FlipRunner, FlipSnapshot, RunnerEvent, Services};
use flipwright_protect::placeholder_image;
use flipwright_store::{Draft, DraftStatus, DraftStore, KvDraftStore};

/// Flipwright - compose, protect and publish flips
#[derive(Parser)]
#[command(name = "flipwright")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flipwright)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Log filter used when RUST_LOG is not set
  #[arg(long, global = true, default_value = "info")]
  log_level: String,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Drive one flip from keywords to a mined publication
  Run {
    /// Word pair fixture (JSON array); updated when the flip is mined
    #[arg(long)]
    pairs: PathBuf,

    /// Flip configuration (JSON); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Epoch the flip is created for
    #[arg(long, default_value_t = 1)]
    epoch: u64,

    /// Seed for shuffles, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after the images step and keep the flip as a draft
    #[arg(long)]
    abort: bool,

    /// Give up waiting for a step after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
  },

  /// Print a shuffled order for a flip
  Shuffle {
    #[arg(long, default_value_t = 4)]
    slots: usize,

    #[arg(long)]
    seed: Option<u64>,
  },

  /// List the pairs still available for a new flip
  Pairs {
    /// Word pair fixture (JSON array)
    #[arg(long)]
    pairs: PathBuf,
  },
}

struct RunArgs {
  pairs: PathBuf,
  config: Option<PathBuf>,
  epoch: u64,
  seed: Option<u64>,
  abort: bool,
  timeout: Duration,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".flipwright"),
  };

  match cli.command {
    Some(Commands::Run {
      pairs,
      config,
      epoch,
      seed,
      abort,
      timeout_secs,
    }) => {
      let args = RunArgs {
        pairs,
        config,
        epoch,
        seed,
        abort,
        timeout: Duration::from_secs(timeout_secs),
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_flip(args, data_dir))?;
    }
    Some(Commands::Shuffle { slots, seed }) => {
      let mut rng = seeded_rng(seed);
      let original = identity_order(slots);
      let order = shuffle_order(&original, &mut rng).context("failed to shuffle")?;
      println!("{}", serde_json::to_string(&order)?);
    }
    Some(Commands::Pairs { pairs }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(list_pairs(pairs, data_dir))?;
    }
    None => {
      println!("flipwright - use --help to see available commands");
    }
  }

  Ok(())
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
  match seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  }
}

fn draft_store(data_dir: &Path) -> Arc<KvDraftStore> {
  let kv = Arc::new(JsonFileKvStore::new(data_dir.join("kv.json")));
  Arc::new(KvDraftStore::new(kv))
}

async fn read_pairs(path: &Path) -> Result<Vec<WordPair>> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read pairs file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse pairs file: {}", path.display()))
}

async fn write_pairs(path: &Path, pairs: &[WordPair]) -> Result<()> {
  let content = serde_json::to_string_pretty(pairs)?;
  tokio::fs::write(path, content)
    .await
    .with_context(|| format!("failed to write pairs file: {}", path.display()))
}

async fn list_pairs(pairs_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let pairs = read_pairs(&pairs_file).await?;
  let drafts = draft_store(&data_dir);
  let pending: HashSet<_> = drafts
    .list_pending_drafts()
    .await
    .context("failed to read pending drafts")?
    .into_iter()
    .map(|d| d.pair_id)
    .collect();

  for pair in available_pairs(&pairs, &pending) {
    let words: Vec<&str> = pair.words.iter().map(|w| w.name.as_str()).collect();
    println!("{}\t{}", pair.id, words.join(" / "));
  }
  Ok(())
}

/// Solid image of the decoy size, tinted per slot.
fn slot_image(config: &DecoyConfig, index: usize) -> Result<ImageBlob> {
  let shade = (40 + index * 50).min(255) as u8;
  let image = placeholder_image(&DecoyConfig {
    placeholder_rgb: [shade, 255 - shade, 128],
    ..config.clone()
  })?;
  Ok(image)
}

async fn run_flip(args: RunArgs, data_dir: PathBuf) -> Result<()> {
  let config = match &args.config {
    Some(path) => FlipConfig::load(path)
      .await
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => FlipConfig::default(),
  };

  let fixture = read_pairs(&args.pairs).await?;
  info!(pairs = fixture.len(), data_dir = %data_dir.display(), "loaded pairs");

  let kv = Arc::new(JsonFileKvStore::new(data_dir.join("kv.json")));
  let drafts = Arc::new(KvDraftStore::new(kv.clone()));
  let pairs = Arc::new(InMemoryPairSource::new(fixture.clone()));
  let search = Arc::new(InMemoryImageSearch::new());
  let publisher = Arc::new(InMemoryPublisher::new(ConfirmMode::Auto));

  // Every pair's query finds one source image for the decoy.
  for pair in &fixture {
    let query = Keywords::from_pair(pair).query(&config.search.query_separator);
    let image = placeholder_image(&DecoyConfig {
      placeholder_rgb: [(pair.id % 256) as u8, 90, 200],
      ..config.decoy.clone()
    })?;
    search.add_result(&query, &format!("memory://search/{}", pair.id), image);
  }

  let services = Services {
    pairs: pairs.clone(),
    translations: Arc::new(InMemoryTranslations::new()),
    images: search,
    publisher,
    drafts: drafts.clone(),
    kv,
  };

  let (sender, mut events) = mpsc::unbounded_channel();
  let runner = FlipRunner::with_rng(&config, services, ChannelNotifier::new(sender), seeded_rng(args.seed))
    .context("failed to create flip runner")?;
  let handle = runner.handle();
  let cancel = CancellationToken::new();
  let task = tokio::spawn(runner.start(cancel.clone()));

  tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      match event {
        RunnerEvent::StateChanged { from, to, event } => {
          info!(from = %from, to = %to, event = %event, "state changed");
        }
        RunnerEvent::Notification(Notification::Error { step, message }) => {
          warn!(step = %step, "{}", message);
        }
        RunnerEvent::Notification(Notification::Info { message }) => {
          info!("{}", message);
        }
        RunnerEvent::Accepted { tx_hash } => {
          info!(tx_hash = ?tx_hash.as_ref().map(|h| h.as_str()), "flip accepted");
        }
      }
    }
  });

  let outcome = drive(&handle, &config, &args, drafts.as_ref()).await;
  let snapshot = handle.snapshot();

  match outcome {
    Ok(true) => {
      if let Some(pair) = snapshot.context.current_pair() {
        pairs.mark_used(pair.id);
        write_pairs(&args.pairs, &pairs.pairs()).await?;
        drafts
          .delete_draft(pair.id)
          .await
          .context("failed to delete published draft")?;
      }
    }
    Ok(false) => {
      save_draft(drafts.as_ref(), &snapshot, DraftStatus::Draft).await?;
      cancel.cancel();
    }
    Err(e) => {
      save_draft(drafts.as_ref(), &snapshot, DraftStatus::Draft).await?;
      cancel.cancel();
      task.await?.context("flip runner failed")?;
      return Err(e);
    }
  }

  task.await?.context("flip runner failed")?;
  println!("{}", serde_json::to_string_pretty(&summary(&snapshot))?);
  Ok(())
}

/// Keep an unfinished flip around; a flip with no images is dropped.
async fn save_draft(drafts: &dyn DraftStore, snapshot: &FlipSnapshot, status: DraftStatus) -> Result<()> {
  if snapshot.state.is_final() || !snapshot.context.has_content() {
    return Ok(());
  }
  // A broadcast flip keeps its publishing record.
  if snapshot.context.tx_hash.is_some() {
    return Ok(());
  }
  if let Some(draft) = Draft::from_context(&snapshot.context, status) {
    drafts.save_draft(&draft).await.context("failed to save draft")?;
    info!(pair_id = draft.pair_id, "draft saved");
  }
  Ok(())
}

fn summary(snapshot: &FlipSnapshot) -> serde_json::Value {
  let ctx = &snapshot.context;
  serde_json::json!({
    "state": snapshot.label,
    "pair_id": ctx.current_pair().map(|p| p.id),
    "keywords": ctx.keywords.query(" "),
    "order": ctx.order,
    "tx_hash": ctx.tx_hash,
  })
}

async fn wait(
  handle: &FlipHandle,
  timeout: Duration,
  what: &str,
  predicate: impl FnMut(&FlipSnapshot) -> bool,
) -> Result<FlipSnapshot> {
  tokio::time::timeout(timeout, handle.wait_for(predicate))
    .await
    .with_context(|| format!("timed out waiting for {} at {}", what, handle.state_label()))?
    .with_context(|| format!("runner stopped while waiting for {}", what))
}

/// Step through the workflow the way a user would.
///
/// Returns `Ok(false)` when the run stopped early on request.
async fn drive(
  handle: &FlipHandle,
  config: &FlipConfig,
  args: &RunArgs,
  drafts: &dyn DraftStore,
) -> Result<bool> {
  let timeout = args.timeout;

  handle
    .send(FlipEvent::PrepareFlip {
      epoch: args.epoch,
      signing_key: SigningKey::new("cli"),
    })
    .await?;
  let snapshot = wait(handle, timeout, "keywords", |s| {
    s.state.matches("editing.keywords.loaded") || s.state.matches("editing.keywords.failure")
  })
  .await?;
  if snapshot.state.matches("editing.keywords.failure") {
    bail!("no word pair could be allocated");
  }

  handle.send(FlipEvent::Next).await?;
  wait(handle, timeout, "images", |s| s.state.matches("editing.images")).await?;
  for index in 0..config.slot_count {
    let image = slot_image(&config.decoy, index)?;
    handle
      .send(FlipEvent::ChangeImages {
        index,
        image: Some(image),
      })
      .await?;
  }
  wait(handle, timeout, "images", |s| {
    s.context.images_complete() && !s.context.decoy_search_pending
  })
  .await?;

  if args.abort {
    return Ok(false);
  }

  handle.send(FlipEvent::Next).await?;
  let snapshot = wait(handle, timeout, "protection", |s| {
    s.state.matches("editing.protect.idle") || s.state.matches("editing.protect.failure")
  })
  .await?;
  if snapshot.state.matches("editing.protect.failure") {
    bail!("images could not be protected");
  }

  handle.send(FlipEvent::Next).await?;
  wait(handle, timeout, "shuffle", |s| s.state.matches("editing.shuffle")).await?;
  handle.send(FlipEvent::Shuffle).await?;
  wait(handle, timeout, "shuffle", |s| s.state.matches("editing.shuffle.shuffled")).await?;

  handle.send(FlipEvent::Next).await?;
  wait(handle, timeout, "submit", |s| s.state.matches("editing.submit.idle")).await?;
  handle.send(FlipEvent::Submit).await?;
  let snapshot = wait(handle, timeout, "publication", |s| {
    s.context.tx_hash.is_some() || s.state.matches("editing.submit.failure")
  })
  .await?;
  if snapshot.context.tx_hash.is_none() {
    bail!("flip was not published");
  }

  if let Some(draft) = Draft::from_context(&snapshot.context, DraftStatus::Publishing) {
    drafts
      .save_draft(&draft)
      .await
      .context("failed to record publishing flip")?;
  }

  let snapshot = wait(handle, timeout, "confirmation", |s| {
    s.state.is_final() || s.state.matches("editing.submit.failure")
  })
  .await?;
  if !snapshot.state.is_final() {
    bail!("flip was not confirmed");
  }
  Ok(true)
}
