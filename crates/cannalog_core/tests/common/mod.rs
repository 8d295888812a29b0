#![allow(dead_code)]

use async_trait::async_trait;
use cannalog_core::db::open_db_in_memory;
use cannalog_core::{
    AuthError, AuthResult, CannaLogApp, Entry, EntryId, EntryStore, EntrySubscription, Identity,
    LocalEntryStore, LocalSessionProvider, SessionProvider, StoreError, StoreResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub fn memory_store() -> Arc<LocalEntryStore> {
    Arc::new(LocalEntryStore::new(open_db_in_memory().unwrap()))
}

pub fn memory_session() -> Arc<LocalSessionProvider> {
    Arc::new(LocalSessionProvider::restore(open_db_in_memory().unwrap()).unwrap())
}

pub fn entry(owner: &str, title: &str, timestamp_ms: i64) -> Entry {
    let mut entry = Entry::draft_at(timestamp_ms);
    entry.owner_id = owner.to_string();
    entry.title = title.to_string();
    entry
}

/// App over in-memory collaborators, already signed in and on the list.
pub async fn signed_in_app(user: &str) -> (CannaLogApp, Arc<LocalEntryStore>) {
    let store = memory_store();
    let app = CannaLogApp::new(store.clone(), memory_session());
    app.sign_in(user).await.unwrap();
    (app, store)
}

/// Store whose upserts, and optionally gets, block until the test releases
/// them.
pub struct GatedStore {
    pub inner: Arc<LocalEntryStore>,
    pub upsert_started: Notify,
    pub upsert_calls: AtomicUsize,
    pub get_started: Notify,
    gate: Semaphore,
    gets_gated: AtomicBool,
    get_gate: Semaphore,
}

impl GatedStore {
    pub fn new(inner: Arc<LocalEntryStore>) -> Self {
        Self {
            inner,
            upsert_started: Notify::new(),
            upsert_calls: AtomicUsize::new(0),
            get_started: Notify::new(),
            gate: Semaphore::new(0),
            gets_gated: AtomicBool::new(false),
            get_gate: Semaphore::new(0),
        }
    }

    pub fn release(&self, upserts: usize) {
        self.gate.add_permits(upserts);
    }

    /// Makes every following `get` wait for `release_gets`.
    pub fn gate_gets(&self) {
        self.gets_gated.store(true, Ordering::SeqCst);
    }

    pub fn release_gets(&self, gets: usize) {
        self.get_gate.add_permits(gets);
    }
}

#[async_trait]
impl EntryStore for GatedStore {
    async fn subscribe(&self, owner_id: &str) -> StoreResult<EntrySubscription> {
        self.inner.subscribe(owner_id).await
    }

    fn unsubscribe(&self, subscription: &EntrySubscription) {
        self.inner.unsubscribe(subscription);
    }

    async fn get(&self, owner_id: &str, id: EntryId) -> StoreResult<Entry> {
        if self.gets_gated.load(Ordering::SeqCst) {
            self.get_started.notify_one();
            let permit = self
                .get_gate
                .acquire()
                .await
                .map_err(|err| StoreError::Unavailable(err.to_string()))?;
            permit.forget();
        }
        self.inner.get(owner_id, id).await
    }

    async fn upsert(&self, entry: &Entry) -> StoreResult<Entry> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.upsert_started.notify_one();
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        permit.forget();
        self.inner.upsert(entry).await
    }

    async fn delete(&self, owner_id: &str, id: EntryId) -> StoreResult<()> {
        self.inner.delete(owner_id, id).await
    }
}

/// Store whose reads/writes fail while `offline` is set.
pub struct FlakyStore {
    pub inner: Arc<LocalEntryStore>,
    pub offline: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: Arc<LocalEntryStore>) -> Self {
        Self {
            inner,
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("network down".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntryStore for FlakyStore {
    async fn subscribe(&self, owner_id: &str) -> StoreResult<EntrySubscription> {
        self.check()?;
        self.inner.subscribe(owner_id).await
    }

    fn unsubscribe(&self, subscription: &EntrySubscription) {
        self.inner.unsubscribe(subscription);
    }

    async fn get(&self, owner_id: &str, id: EntryId) -> StoreResult<Entry> {
        self.check()?;
        self.inner.get(owner_id, id).await
    }

    async fn upsert(&self, entry: &Entry) -> StoreResult<Entry> {
        self.check()?;
        self.inner.upsert(entry).await
    }

    async fn delete(&self, owner_id: &str, id: EntryId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(owner_id, id).await
    }
}

/// Session provider with a sign-out the test resolves by hand.
pub struct ScriptedSession {
    current: Mutex<Option<Identity>>,
    sign_out_gate: Semaphore,
    pub sign_out_started: Notify,
    pub fail_sign_out: AtomicBool,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            sign_out_gate: Semaphore::new(0),
            sign_out_started: Notify::new(),
            fail_sign_out: AtomicBool::new(false),
        }
    }

    pub fn release_sign_out(&self) {
        self.sign_out_gate.add_permits(1);
    }
}

#[async_trait]
impl SessionProvider for ScriptedSession {
    async fn sign_in(&self, identity_token: &str) -> AuthResult<Identity> {
        if identity_token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let identity = Identity::new(identity_token);
        *self.current.lock() = Some(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.sign_out_started.notify_one();
        let permit = self
            .sign_out_gate
            .acquire()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string()))?;
        permit.forget();
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Unavailable("identity provider timeout".to_string()));
        }
        *self.current.lock() = None;
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().clone()
    }
}
