//! Progress events for the jobs, carried on a `tokio::sync::broadcast`
//! channel.
//!
//! The batch driver publishes [`BatchEvent`]s (retry notices included), the
//! authorizer [`AuthEvent`]s and the folder walker [`InventoryEvent`]s.
//! Emitting never blocks the job; with nobody subscribed the event is dropped
//! and `emit` returns the `SendError`, which publishers ignore.
//!
//! ```rust
//! use core_runtime::events::{BatchEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut progress = bus.subscribe();
//!
//! bus.emit(CoreEvent::Batch(BatchEvent::RunStarted { total_items: 3 }))
//!     .ok();
//!
//! assert_eq!(progress.recv().await.unwrap().description(), "Batch run started");
//! # }
//! ```
//!
//! A subscriber that falls more than `capacity` events behind gets
//! `RecvError::Lagged` once and then continues with the newest events.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Per-subscriber backlog of [`EventBus::default`].
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Everything published on the [`EventBus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authorization and token lifecycle
    Auth(AuthEvent),
    /// Shortcut batch progress
    Batch(BatchEvent),
    /// Folder inventory progress
    Inventory(InventoryEvent),
}

impl CoreEvent {
    /// Short fixed label, used as a log message by subscribers.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Batch(e) => e.description(),
            CoreEvent::Inventory(e) => e.description(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A cached token was found and is still usable.
    TokenLoaded,
    /// No usable token; the interactive consent flow is needed.
    AuthorizationRequired,
    /// The interactive flow completed and tokens were cached.
    Authorized,
    /// Access token refreshed.
    TokenRefreshed {
        /// Unix epoch seconds
        expires_at: i64,
    },
    AuthError {
        message: String,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::TokenLoaded => "Cached token loaded",
            AuthEvent::AuthorizationRequired => "Authorization required",
            AuthEvent::Authorized => "Authorization completed",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

/// Progress of a shortcut batch run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BatchEvent {
    RunStarted {
        total_items: u64,
    },
    /// Emitted after every settled chunk; counters are cumulative.
    ChunkCompleted {
        chunk_index: u64,
        processed: u64,
        total: u64,
        succeeded: u64,
        skipped_existing: u64,
        skipped_invalid: u64,
        failed: u64,
    },
    /// A create attempt failed and another attempt follows after `delay_ms`.
    RetryScheduled {
        row_index: u64,
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        error: String,
    },
    /// An item failed permanently and was added to the failure ledger.
    ItemFailed {
        row_index: u64,
        source_id: String,
        error: String,
    },
    RunCompleted {
        succeeded: u64,
        skipped_existing: u64,
        skipped_invalid: u64,
        failed: u64,
        elapsed_ms: u64,
    },
}

impl BatchEvent {
    fn description(&self) -> &str {
        match self {
            BatchEvent::RunStarted { .. } => "Batch run started",
            BatchEvent::ChunkCompleted { .. } => "Chunk completed",
            BatchEvent::RetryScheduled { .. } => "Retry scheduled",
            BatchEvent::ItemFailed { .. } => "Item failed permanently",
            BatchEvent::RunCompleted { .. } => "Batch run completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum InventoryEvent {
    FolderEntered { path: String },
    Completed { folders: u64, files: u64 },
}

impl InventoryEvent {
    fn description(&self) -> &str {
        match self {
            InventoryEvent::FolderEntered { .. } => "Entering folder",
            InventoryEvent::Completed { .. } => "Inventory completed",
        }
    }
}

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` is the backlog each subscriber may accumulate before it
    /// starts losing the oldest events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of subscribers reached, or `SendError` when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Receives events emitted from now on.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
