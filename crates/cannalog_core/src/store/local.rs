//! SQLite-backed entry store with in-process live queries.
//!
//! # Invariants
//! - Lock order is `conn` then `feeds`; neither is held across an await.
//! - Every subscription owns its own feed. After every successful write each
//!   live feed of the affected owner receives a fresh snapshot read back
//!   from SQLite.
//! - Feeds without receivers are dropped on the next publish.

use super::{EntryStore, EntrySubscription, StoreError, StoreResult};
use crate::model::entry::{Entry, EntryId, OwnerId};
use crate::repo::entry_repo::{entry_owner, EntryRepository, SqliteEntryRepository};
use async_trait::async_trait;
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

struct Feed {
    id: u64,
    tx: watch::Sender<Arc<Vec<Entry>>>,
}

#[derive(Default)]
struct Feeds {
    next_id: u64,
    by_owner: HashMap<OwnerId, Vec<Feed>>,
}

/// Local entry store over one SQLite connection.
pub struct LocalEntryStore {
    conn: Mutex<Connection>,
    feeds: Mutex<Feeds>,
}

impl LocalEntryStore {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            feeds: Mutex::new(Feeds::default()),
        }
    }

    /// Number of live subscription handles for `owner_id`.
    pub fn subscriber_count(&self, owner_id: &str) -> usize {
        self.feeds.lock().by_owner.get(owner_id).map_or(0, |feeds| {
            feeds.iter().map(|feed| feed.tx.receiver_count()).sum()
        })
    }

    fn publish(&self, conn: &Connection, owner_id: &str) -> StoreResult<()> {
        let mut feeds = self.feeds.lock();
        let Some(owner_feeds) = feeds.by_owner.get_mut(owner_id) else {
            return Ok(());
        };
        owner_feeds.retain(|feed| feed.tx.receiver_count() > 0);
        if owner_feeds.is_empty() {
            feeds.by_owner.remove(owner_id);
            debug!("event=entry_feed_drop module=store status=ok");
            return Ok(());
        }

        let snapshot = Arc::new(SqliteEntryRepository::new(conn).list_entries_by_owner(owner_id)?);
        for feed in owner_feeds.iter() {
            feed.tx.send_replace(snapshot.clone());
        }
        debug!(
            "event=entry_feed_push module=store status=ok feeds={} entries={}",
            owner_feeds.len(),
            snapshot.len()
        );
        Ok(())
    }
}

#[async_trait]
impl EntryStore for LocalEntryStore {
    async fn subscribe(&self, owner_id: &str) -> StoreResult<EntrySubscription> {
        let conn = self.conn.lock();
        let snapshot = Arc::new(SqliteEntryRepository::new(&conn).list_entries_by_owner(owner_id)?);

        let mut feeds = self.feeds.lock();
        feeds.next_id += 1;
        let id = feeds.next_id;
        let (tx, rx) = watch::channel(snapshot);
        feeds
            .by_owner
            .entry(owner_id.to_string())
            .or_default()
            .push(Feed { id, tx });

        info!("event=entry_subscribe module=store status=ok feed={id}");
        Ok(EntrySubscription::new(id, owner_id.to_string(), rx))
    }

    fn unsubscribe(&self, subscription: &EntrySubscription) {
        let mut feeds = self.feeds.lock();
        let owner_id = subscription.owner_id();
        let Some(owner_feeds) = feeds.by_owner.get_mut(owner_id) else {
            return;
        };
        let before = owner_feeds.len();
        owner_feeds.retain(|feed| feed.id != subscription.feed_id());
        let closed = owner_feeds.len() != before;
        if owner_feeds.is_empty() {
            feeds.by_owner.remove(owner_id);
        }
        if closed {
            info!(
                "event=entry_unsubscribe module=store status=ok feed={}",
                subscription.feed_id()
            );
        }
    }

    async fn get(&self, owner_id: &str, id: EntryId) -> StoreResult<Entry> {
        let conn = self.conn.lock();
        match SqliteEntryRepository::new(&conn).get_entry(id)? {
            Some(entry) if entry.owner_id == owner_id => Ok(entry),
            Some(_) => {
                warn!("event=entry_get module=store status=hidden reason=foreign_owner");
                Err(StoreError::NotFound(id))
            }
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn upsert(&self, entry: &Entry) -> StoreResult<Entry> {
        if entry.owner_id.trim().is_empty() {
            return Err(StoreError::PermissionDenied(
                "entry has no owner".to_string(),
            ));
        }

        let conn = self.conn.lock();
        let repo = SqliteEntryRepository::new(&conn);
        let mut persisted = entry.clone();

        let (id, mode) = match entry.id {
            None => {
                let id = Uuid::new_v4();
                persisted.id = Some(id);
                repo.insert_entry(&persisted)?;
                (id, "insert")
            }
            Some(id) => match entry_owner(&conn, id)? {
                None => {
                    repo.insert_entry(&persisted)?;
                    (id, "insert")
                }
                Some(owner) if owner != entry.owner_id => {
                    return Err(StoreError::PermissionDenied(format!(
                        "entry {id} belongs to another identity"
                    )));
                }
                Some(_) => {
                    repo.update_entry(&persisted)?;
                    (id, "update")
                }
            },
        };

        let stored = repo.get_entry(id)?.ok_or(StoreError::NotFound(id))?;
        self.publish(&conn, &stored.owner_id)?;

        info!("event=entry_upsert module=store status=ok mode={mode}");
        Ok(stored)
    }

    async fn delete(&self, owner_id: &str, id: EntryId) -> StoreResult<()> {
        let conn = self.conn.lock();
        match entry_owner(&conn, id)? {
            None => {
                debug!("event=entry_delete module=store status=noop reason=absent");
                return Ok(());
            }
            Some(owner) if owner != owner_id => {
                warn!("event=entry_delete module=store status=denied reason=foreign_owner");
                return Err(StoreError::PermissionDenied(format!(
                    "entry {id} belongs to another identity"
                )));
            }
            Some(_) => {}
        }

        SqliteEntryRepository::new(&conn).delete_entry(id)?;
        self.publish(&conn, owner_id)?;

        info!("event=entry_delete module=store status=ok");
        Ok(())
    }
}
