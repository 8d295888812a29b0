//! Entry list view-model.
//!
//! Observes the store's live query for one owner. The visible sequence is
//! whatever snapshot the store pushed last, swapped in as a whole.
//!
//! Detaching closes the feed in the store, so handles obtained from
//! [`ListViewModel::updates`] stop with it.

use crate::model::entry::Entry;
use crate::store::{EntryStore, EntrySubscription, StoreResult};
use log::info;
use parking_lot::Mutex;
use std::sync::Arc;

pub struct ListViewModel {
    store: Arc<dyn EntryStore>,
    subscription: Mutex<Option<EntrySubscription>>,
}

impl ListViewModel {
    pub fn new(store: Arc<dyn EntryStore>) -> Self {
        Self {
            store,
            subscription: Mutex::new(None),
        }
    }

    /// Subscribes to `owner_id`'s entries, closing any previous
    /// subscription. Re-attaching to the same owner refreshes the feed.
    pub async fn attach(&self, owner_id: &str) -> StoreResult<()> {
        let subscription = self.store.subscribe(owner_id).await?;
        let previous = self.subscription.lock().replace(subscription);
        if let Some(previous) = previous {
            self.store.unsubscribe(&previous);
            if previous.owner_id() != owner_id {
                info!("event=list_detach module=list status=ok reason=identity_changed");
            }
        }
        Ok(())
    }

    /// Closes the live subscription, including handles given out by `updates`.
    pub fn detach(&self) {
        let previous = self.subscription.lock().take();
        if let Some(previous) = previous {
            self.store.unsubscribe(&previous);
            info!("event=list_detach module=list status=ok reason=teardown");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn owner_id(&self) -> Option<String> {
        self.subscription
            .lock()
            .as_ref()
            .map(|subscription| subscription.owner_id().to_string())
    }

    /// Current visible sequence, newest first. Empty when detached.
    pub fn entries(&self) -> Arc<Vec<Entry>> {
        self.subscription
            .lock()
            .as_ref()
            .map_or_else(|| Arc::new(Vec::new()), EntrySubscription::snapshot)
    }

    /// Handle a UI can await for the next push. Its `changed` returns
    /// `false` once the list detaches.
    pub fn updates(&self) -> Option<EntrySubscription> {
        self.subscription.lock().clone()
    }
}
