//! Entry editor view-model.
//!
//! # Responsibility
//! - Own the draft being edited and expose local mutations.
//! - Commit the draft through the entry store (save/delete).
//!
//! # Invariants
//! - The draft is never shared; callers receive clones.
//! - At most one load/save/delete runs at a time. A concurrent request fails
//!   with `EditorError::Busy` before reaching the store.
//! - Load, save and delete act as the current session identity only.
//! - Setters are ignored while an operation is in flight, so a finishing
//!   load never overwrites edits.
//! - A failed save/delete leaves the draft untouched.

use crate::model::entry::{Entry, EntryId, Stage};
use crate::session::SessionProvider;
use crate::store::{EntryStore, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Editor operation failures.
#[derive(Debug)]
pub enum EditorError {
    /// Store rejected or failed the operation.
    Store(StoreError),
    /// No identity is signed in.
    NotAuthenticated,
    /// Delete requested on a draft that was never saved.
    NotPersisted,
    /// Another load/save/delete is still in flight.
    Busy,
    /// No editor screen is open.
    NoOpenEditor,
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotAuthenticated => write!(f, "sign in before editing entries"),
            Self::NotPersisted => write!(f, "entry has not been saved yet"),
            Self::Busy => write!(f, "another operation is still running"),
            Self::NoOpenEditor => write!(f, "no entry is being edited"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for EditorError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Where the current draft came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftSource {
    New,
    Loaded,
    /// Requested id was missing; an empty draft replaced it.
    MissingFallback,
}

/// Editor state for one editor screen visit.
pub struct EditorViewModel {
    store: Arc<dyn EntryStore>,
    session: Arc<dyn SessionProvider>,
    draft: Mutex<Entry>,
    existing: AtomicBool,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EditorViewModel {
    /// Creates an editor holding a fresh empty draft.
    pub fn new(store: Arc<dyn EntryStore>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            store,
            session,
            draft: Mutex::new(Entry::draft()),
            existing: AtomicBool::new(false),
            busy: AtomicBool::new(false),
        }
    }

    pub fn draft(&self) -> Entry {
        self.draft.lock().clone()
    }

    /// True iff the draft mirrors a persisted entry.
    pub fn is_existing_entry(&self) -> bool {
        self.existing.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard<'_>, EditorError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EditorError::Busy)?;
        Ok(BusyGuard(&self.busy))
    }

    fn reset_draft(&self) {
        *self.draft.lock() = Entry::draft();
        self.existing.store(false, Ordering::Release);
    }

    /// Loads `id` into the draft, or starts an empty draft when `id` is `None`.
    ///
    /// A missing entry, or one owned by another identity, falls back to an
    /// empty draft and still returns `Ok`.
    ///
    /// # Errors
    /// - `Busy` when another operation is in flight.
    /// - `NotAuthenticated` when an id is given but nobody is signed in.
    /// - `Store` for failures other than not-found.
    ///
    /// The draft is reset to empty on every error except `Busy`, so the
    /// screen stays usable.
    pub async fn load(&self, id: Option<EntryId>) -> Result<DraftSource, EditorError> {
        let _guard = self.begin()?;

        let Some(id) = id else {
            self.reset_draft();
            return Ok(DraftSource::New);
        };
        let Some(identity) = self.session.current_identity() else {
            self.reset_draft();
            return Err(EditorError::NotAuthenticated);
        };

        match self.store.get(&identity.user_id, id).await {
            Ok(entry) => {
                *self.draft.lock() = entry;
                self.existing.store(true, Ordering::Release);
                Ok(DraftSource::Loaded)
            }
            Err(StoreError::NotFound(_)) => {
                warn!("event=entry_load module=editor status=fallback reason=not_found");
                self.reset_draft();
                Ok(DraftSource::MissingFallback)
            }
            Err(err) => {
                warn!("event=entry_load module=editor status=error error={err}");
                self.reset_draft();
                Err(err.into())
            }
        }
    }

    /// Applies `change` unless an operation is in flight. Returns whether it
    /// was applied.
    fn edit(&self, change: impl FnOnce(&mut Entry)) -> bool {
        let mut draft = self.draft.lock();
        if self.is_loading() {
            debug!("event=draft_edit module=editor status=ignored reason=busy");
            return false;
        }
        change(&mut draft);
        true
    }

    pub fn set_title(&self, title: impl Into<String>) -> bool {
        let title = title.into();
        self.edit(|draft| draft.title = title)
    }

    pub fn set_description(&self, description: impl Into<String>) -> bool {
        let description = description.into();
        self.edit(|draft| draft.description = description)
    }

    pub fn set_timestamp(&self, at: DateTime<Utc>) -> bool {
        self.edit(|draft| draft.set_timestamp(at))
    }

    pub fn set_timestamp_ms(&self, timestamp_ms: i64) -> bool {
        self.edit(|draft| draft.timestamp_ms = timestamp_ms)
    }

    pub fn set_stage(&self, stage: Stage) -> bool {
        self.edit(|draft| draft.stage = stage)
    }

    /// Sets the stage from the paged selector's current page.
    pub fn set_stage_page(&self, page: usize) -> bool {
        self.set_stage(Stage::from_page(page))
    }

    /// Upserts the draft under the current identity.
    ///
    /// On success the draft adopts the stored id, so a second save updates
    /// the same entry.
    pub async fn save(&self) -> Result<Entry, EditorError> {
        let _guard = self.begin()?;
        let identity = self
            .session
            .current_identity()
            .ok_or(EditorError::NotAuthenticated)?;

        let mut submission = self.draft();
        submission.owner_id = identity.user_id;

        let persisted = self.store.upsert(&submission).await.map_err(|err| {
            warn!("event=entry_save module=editor status=error error={err}");
            err
        })?;

        {
            let mut draft = self.draft.lock();
            draft.id = persisted.id;
            draft.owner_id = persisted.owner_id.clone();
        }
        self.existing.store(true, Ordering::Release);

        info!("event=entry_save module=editor status=ok");
        Ok(persisted)
    }

    /// Deletes the persisted entry as the current identity and discards the
    /// draft.
    pub async fn delete(&self) -> Result<(), EditorError> {
        let _guard = self.begin()?;
        let identity = self
            .session
            .current_identity()
            .ok_or(EditorError::NotAuthenticated)?;
        if !self.is_existing_entry() {
            return Err(EditorError::NotPersisted);
        }
        let id = self.draft.lock().id.ok_or(EditorError::NotPersisted)?;

        self.store
            .delete(&identity.user_id, id)
            .await
            .map_err(|err| {
                warn!("event=entry_delete module=editor status=error error={err}");
                err
            })?;
        self.reset_draft();

        info!("event=entry_delete module=editor status=ok");
        Ok(())
    }
}
