//! Application controller composing navigation, session gate and view-models.
//!
//! # Responsibility
//! - Drive the Authentication / List / Editor flows from UI actions.
//! - Turn operation failures into dismissible messages; nothing is fatal.
//!
//! # Invariants
//! - Navigation changes only after the triggering operation resolved.
//! - Leaving the editor drops its view-model and cancels a pending load.
//! - After sign-out resolves the screen is `Authentication` and the list
//!   holds no subscription.
//! - The internal state lock is never held across an await.

mod editor;
mod list;
mod messages;
mod session_gate;

pub use editor::{DraftSource, EditorError, EditorViewModel};
pub use list::ListViewModel;
pub use messages::{Message, MessageBar, MessageKind, MESSAGE_CAPACITY};
pub use session_gate::SessionGate;

use crate::db::{open_db, DbError};
use crate::model::entry::{Entry, EntryId};
use crate::navigation::{NavEvent, Navigator, Screen};
use crate::session::{AuthError, AuthResult, Identity, LocalSessionProvider, SessionProvider};
use crate::store::{EntryStore, LocalEntryStore};
use log::{info, warn};
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Failure to assemble a local application instance.
#[derive(Debug)]
pub enum AppOpenError {
    Db(DbError),
    Session(AuthError),
}

impl Display for AppOpenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "cannot open entry database: {err}"),
            Self::Session(err) => write!(f, "cannot restore session: {err}"),
        }
    }
}

impl Error for AppOpenError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Session(err) => Some(err),
        }
    }
}

impl From<DbError> for AppOpenError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<AuthError> for AppOpenError {
    fn from(value: AuthError) -> Self {
        Self::Session(value)
    }
}

struct AppState {
    nav: Navigator,
    editor: Option<Arc<EditorViewModel>>,
    sign_out_prompt: bool,
    messages: MessageBar,
}

/// Top-level controller a UI binds to.
pub struct CannaLogApp {
    store: Arc<dyn EntryStore>,
    session: Arc<dyn SessionProvider>,
    list: Arc<ListViewModel>,
    gate: SessionGate,
    state: Mutex<AppState>,
    screen_tx: watch::Sender<Screen>,
    auth_pending: AtomicBool,
}

impl CannaLogApp {
    pub fn new(store: Arc<dyn EntryStore>, session: Arc<dyn SessionProvider>) -> Self {
        let list = Arc::new(ListViewModel::new(store.clone()));
        let gate = SessionGate::new(session.clone(), list.clone());
        let nav = Navigator::new();
        let (screen_tx, _) = watch::channel(nav.current());
        Self {
            store,
            session,
            list,
            gate,
            state: Mutex::new(AppState {
                nav,
                editor: None,
                sign_out_prompt: false,
                messages: MessageBar::default(),
            }),
            screen_tx,
            auth_pending: AtomicBool::new(false),
        }
    }

    /// Opens the SQLite file at `db_path` and wires the local store and
    /// session provider over it.
    pub fn open_local(db_path: impl AsRef<Path>) -> Result<Self, AppOpenError> {
        let db_path = db_path.as_ref();
        let store = LocalEntryStore::new(open_db(db_path)?);
        let session = LocalSessionProvider::restore(open_db(db_path)?)?;
        Ok(Self::new(Arc::new(store), Arc::new(session)))
    }

    /// Resumes a restored session by entering the list.
    ///
    /// Returns whether a session was resumed.
    pub async fn start(&self) -> bool {
        match self.session.current_identity() {
            Some(identity) => self.enter_list(&identity).await,
            None => false,
        }
    }

    pub fn screen(&self) -> Screen {
        self.state.lock().nav.current()
    }

    /// Receiver that observes every screen change.
    pub fn watch_screen(&self) -> watch::Receiver<Screen> {
        self.screen_tx.subscribe()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.gate.current_identity()
    }

    pub fn list(&self) -> &ListViewModel {
        &self.list
    }

    /// Visible list rows, newest first.
    pub fn entries(&self) -> Arc<Vec<Entry>> {
        self.list.entries()
    }

    /// Open editor view-model, if the editor screen is showing.
    pub fn editor(&self) -> Option<Arc<EditorViewModel>> {
        self.state.lock().editor.clone()
    }

    pub fn draft(&self) -> Option<Entry> {
        self.editor().map(|editor| editor.draft())
    }

    pub fn is_loading(&self) -> bool {
        self.auth_pending.load(Ordering::Acquire)
            || self.editor().is_some_and(|editor| editor.is_loading())
    }

    pub fn sign_out_prompt_open(&self) -> bool {
        self.state.lock().sign_out_prompt
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().messages.pending().to_vec()
    }

    pub fn dismiss_message(&self, id: u64) -> bool {
        self.state.lock().messages.dismiss(id)
    }

    fn post_error(&self, text: impl Into<String>) {
        self.state.lock().messages.error(text);
    }

    fn transition(&self, state: &mut AppState, event: NavEvent) -> bool {
        if !state.nav.apply(event) {
            return false;
        }
        let screen = state.nav.current();
        if !screen.is_editor() {
            state.editor = None;
        }
        if screen != Screen::List {
            state.sign_out_prompt = false;
        }
        self.screen_tx.send_replace(screen);
        true
    }

    fn begin_auth(&self) -> bool {
        self.auth_pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn end_auth(&self) {
        self.auth_pending.store(false, Ordering::Release);
    }

    async fn enter_list(&self, identity: &Identity) -> bool {
        {
            let mut state = self.state.lock();
            if !self.transition(&mut state, NavEvent::Authenticated) {
                return false;
            }
        }
        if let Err(err) = self.gate.enter_list(identity).await {
            warn!("event=list_attach module=app status=error error={err}");
            self.post_error(format!("Could not load entries: {err}"));
        }
        true
    }

    /// Signs in with an identity-provider token.
    ///
    /// On failure the error is also posted as a message and the screen stays
    /// on `Authentication`.
    pub async fn sign_in(&self, identity_token: &str) -> AuthResult<Identity> {
        if self.screen() != Screen::Authentication || !self.begin_auth() {
            return Err(AuthError::Unavailable(
                "sign-in is not available right now".to_string(),
            ));
        }

        let result = self.session.sign_in(identity_token).await;
        let outcome = match result {
            Ok(identity) => {
                self.state.lock().messages.success("Success");
                self.enter_list(&identity).await;
                Ok(identity)
            }
            Err(err) => {
                warn!("event=sign_in module=app status=error error={err}");
                self.post_error(err.to_string());
                Err(err)
            }
        };
        self.end_auth();
        outcome
    }

    /// Opens the editor on a fresh draft. Returns whether it opened.
    pub async fn create_entry(&self) -> bool {
        self.open_editor(None).await
    }

    /// Opens the editor on an existing entry. Returns whether it opened.
    ///
    /// A missing entry silently opens an empty draft instead.
    pub async fn open_entry(&self, id: EntryId) -> bool {
        self.open_editor(Some(id)).await
    }

    async fn open_editor(&self, id: Option<EntryId>) -> bool {
        if self.auth_pending.load(Ordering::Acquire) {
            return false;
        }
        let event = id.map_or(NavEvent::CreateEntry, NavEvent::OpenEntry);

        let (editor, mut screen_rx) = {
            let mut state = self.state.lock();
            if !self.transition(&mut state, event) {
                return false;
            }
            let editor = Arc::new(EditorViewModel::new(
                self.store.clone(),
                self.session.clone(),
            ));
            state.editor = Some(editor.clone());
            (editor, self.screen_tx.subscribe())
        };

        tokio::select! {
            loaded = editor.load(id) => match loaded {
                Ok(source) => {
                    info!("event=editor_open module=app status=ok source={source:?}");
                }
                Err(err) => {
                    self.post_error(format!("Could not load entry: {err}"));
                }
            },
            _ = screen_rx.changed() => {
                info!("event=editor_open module=app status=cancelled");
            }
        }
        true
    }

    /// Leaves the editor without committing. Returns whether it navigated.
    pub fn back(&self) -> bool {
        let mut state = self.state.lock();
        self.transition(&mut state, NavEvent::Back)
    }

    fn open_editor_handle(&self) -> Result<Arc<EditorViewModel>, EditorError> {
        self.editor().ok_or(EditorError::NoOpenEditor)
    }

    fn finish_editor(&self, editor: &Arc<EditorViewModel>, event: NavEvent) {
        let mut state = self.state.lock();
        let still_open = state
            .editor
            .as_ref()
            .is_some_and(|open| Arc::ptr_eq(open, editor));
        if still_open {
            self.transition(&mut state, event);
        }
    }

    /// Saves the draft and returns to the list on success.
    ///
    /// Failures keep the editor and draft and post an error message. A
    /// duplicate tap while a save runs returns `Busy` silently.
    pub async fn save(&self) -> Result<Entry, EditorError> {
        let editor = self.open_editor_handle()?;
        match editor.save().await {
            Ok(entry) => {
                self.finish_editor(&editor, NavEvent::SaveSucceeded);
                Ok(entry)
            }
            Err(EditorError::Busy) => Err(EditorError::Busy),
            Err(err) => {
                self.post_error(err.to_string());
                Err(err)
            }
        }
    }

    /// Deletes the entry being edited and returns to the list on success.
    pub async fn delete(&self) -> Result<(), EditorError> {
        let editor = self.open_editor_handle()?;
        match editor.delete().await {
            Ok(()) => {
                self.state.lock().messages.success("Deleted");
                self.finish_editor(&editor, NavEvent::DeleteSucceeded);
                Ok(())
            }
            Err(EditorError::Busy) => Err(EditorError::Busy),
            Err(err) => {
                self.post_error(err.to_string());
                Err(err)
            }
        }
    }

    /// Shows the sign-out confirmation prompt. Only available on `List`.
    pub fn request_sign_out(&self) -> bool {
        let mut state = self.state.lock();
        if state.nav.current() != Screen::List {
            return false;
        }
        state.sign_out_prompt = true;
        true
    }

    pub fn cancel_sign_out(&self) {
        self.state.lock().sign_out_prompt = false;
    }

    /// Runs the confirmed sign-out.
    ///
    /// Returns `Ok(false)` when no prompt was open. The screen stays on
    /// `List` until the provider confirms.
    pub async fn confirm_sign_out(&self) -> AuthResult<bool> {
        {
            let mut state = self.state.lock();
            if !state.sign_out_prompt {
                return Ok(false);
            }
            state.sign_out_prompt = false;
        }
        if !self.begin_auth() {
            return Ok(false);
        }

        let result = self
            .gate
            .sign_out(|| {
                let mut state = self.state.lock();
                self.transition(&mut state, NavEvent::SignedOut);
            })
            .await;
        self.end_auth();

        match result {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!("event=sign_out module=app status=error error={err}");
                self.post_error(err.to_string());
                Err(err)
            }
        }
    }
}
