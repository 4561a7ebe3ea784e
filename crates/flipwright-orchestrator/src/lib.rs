//! Flipwright Orchestrator
//!
//! Runs a [`FlipMachine`](flipwright_engine::FlipMachine) against real
//! services.
//!
//! ```text
//! ┌──────────────┐  FlipEvent   ┌─────────────────────────────────────┐
//! │  FlipHandle  │ ───────────► │             FlipRunner              │
//! │  (UI / CLI)  │ ◄─────────── │  - single inbound mpsc channel      │
//! └──────────────┘   snapshot   │  - machine.handle(event) → commands │
//!                               │  - commands run as spawned tasks    │
//!                               └─────────────────────────────────────┘
//!                                     │ completion events ▲
//!                                     ▼                   │
//!                 pairs · translations · search · protect · submit
//! ```
//!
//! Every task reports back through the inbound channel, so the machine
//! sees exactly one event at a time and applies each result once.
//!
//! # Usage
//!
//! ```ignore
//! let runner = FlipRunner::new(&config, services, NoopNotifier)?;
//! let handle = runner.handle();
//! tokio::spawn(runner.start(cancel.clone()));
//!
//! handle.send(FlipEvent::PrepareFlip { epoch, signing_key }).await?;
//! handle.wait_for_state("editing.keywords.loaded").await?;
//! ```

mod allocate;
mod error;
mod events;
mod handle;
mod runner;
mod services;

pub use allocate::allocate;
pub use error::RunnerError;
pub use events::{ChannelNotifier, FlipNotifier, NoopNotifier, RunnerEvent};
pub use handle::{FlipHandle, FlipSnapshot};
pub use runner::FlipRunner;
pub use services::Services;
