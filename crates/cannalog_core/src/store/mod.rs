//! Entry store contract consumed by the view-models.
//!
//! # Responsibility
//! - Define the async CRUD and live-query contract over entries.
//! - Carry owner-scoped live snapshots to subscribers.
//!
//! # Invariants
//! - Every snapshot pushed to a subscription is sorted by
//!   `timestamp_ms DESC` and contains only entries of that owner.
//! - Reads and writes are scoped to the calling owner. Another owner's entry
//!   reads as not found and cannot be overwritten or deleted.
//! - `delete` of an unknown id succeeds.
//! - Dropping every handle of an `EntrySubscription` ends it, and so does
//!   `unsubscribe`; stores must not keep it alive.

use crate::model::entry::{Entry, EntryId, OwnerId};
use crate::repo::entry_repo::RepoError;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use tokio::sync::watch;

mod local;

pub use local::LocalEntryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by an entry store.
#[derive(Debug)]
pub enum StoreError {
    /// No entry exists with this id.
    NotFound(EntryId),
    /// The entry belongs to another owner, or the write carries no owner.
    PermissionDenied(String),
    /// Backend unreachable or refusing work.
    Unavailable(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::PermissionDenied(message) => write!(f, "permission denied: {message}"),
            Self::Unavailable(message) => write!(f, "entry store unavailable: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Live, owner-scoped view of the store.
///
/// Each push replaces the whole snapshot; readers never observe a partially
/// updated list. Clones share one feed: `unsubscribe` on any of them closes
/// all of them.
#[derive(Debug, Clone)]
pub struct EntrySubscription {
    feed_id: u64,
    owner_id: OwnerId,
    rx: watch::Receiver<Arc<Vec<Entry>>>,
}

impl EntrySubscription {
    pub fn new(feed_id: u64, owner_id: OwnerId, rx: watch::Receiver<Arc<Vec<Entry>>>) -> Self {
        Self {
            feed_id,
            owner_id,
            rx,
        }
    }

    /// Store-assigned id of the feed behind this handle.
    pub fn feed_id(&self) -> u64 {
        self.feed_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Latest pushed snapshot.
    pub fn snapshot(&self) -> Arc<Vec<Entry>> {
        self.rx.borrow().clone()
    }

    /// Waits for the next push. Returns `false` once the store has closed the feed.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// True once the store closed the feed.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }
}

/// Async entry persistence contract.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Opens a live query of all entries owned by `owner_id`.
    async fn subscribe(&self, owner_id: &str) -> StoreResult<EntrySubscription>;

    /// Closes `subscription` and every clone of it. Closing twice is a no-op.
    fn unsubscribe(&self, subscription: &EntrySubscription);

    /// Reads one of `owner_id`'s entries. Entries of other owners are
    /// reported as `NotFound`.
    async fn get(&self, owner_id: &str, id: EntryId) -> StoreResult<Entry>;

    /// Inserts or updates under `entry.owner_id`. Assigns an id when
    /// `entry.id` is `None` and returns the persisted entry.
    async fn upsert(&self, entry: &Entry) -> StoreResult<Entry>;

    /// Removes one of `owner_id`'s entries. Unknown ids succeed; another
    /// owner's entry is `PermissionDenied`.
    async fn delete(&self, owner_id: &str, id: EntryId) -> StoreResult<()>;
}
