//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the application controller's actions and read model to Dart via FRB.
//! - Flatten core types into plain envelopes with string ids and labels.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - One process-wide `CannaLogApp`, opened by `app_open`. Actions before
//!   that return a failure envelope.

use cannalog_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    CannaLogApp, Entry, EntryId, Message, MessageKind, Screen, Stage,
};
use log::info;
use once_cell::sync::OnceCell;

static APP: OnceCell<CannaLogApp> = OnceCell::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Returns empty string on success and the error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Stage labels in selector page order.
#[flutter_rust_bridge::frb(sync)]
pub fn stage_labels() -> Vec<String> {
    Stage::ALL
        .iter()
        .map(|stage| stage.as_str().to_string())
        .collect()
}

/// One entry row or draft as seen by Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryItem {
    /// Empty for unsaved drafts.
    pub id: String,
    pub title: String,
    pub description: String,
    pub stage: String,
    pub stage_page: u32,
    pub timestamp_ms: i64,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageItem {
    pub id: u64,
    /// `success` or `error`.
    pub kind: String,
    pub text: String,
}

/// Full read model for rendering the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppSnapshot {
    /// `authentication`, `list` or `editor`.
    pub screen: String,
    /// Entry id when the editor was opened on an existing entry.
    pub editor_entry_id: Option<String>,
    pub entries: Vec<EntryItem>,
    pub draft: Option<EntryItem>,
    pub is_loading: bool,
    pub sign_out_prompt_open: bool,
    pub messages: Vec<MessageItem>,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub ok: bool,
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    fn from_flag(applied: bool, action: &str) -> Self {
        if applied {
            Self::success(format!("{action} applied."))
        } else {
            Self::failure(format!("{action} ignored on the current screen."))
        }
    }
}

fn app() -> Result<&'static CannaLogApp, ActionResponse> {
    APP.get()
        .ok_or_else(|| ActionResponse::failure("app is not open; call app_open first"))
}

/// Opens the process-wide app over the SQLite file at `db_path` and resumes
/// a persisted session when present.
///
/// # FFI contract
/// - Repeated calls after a successful open are no-ops.
pub async fn app_open(db_path: String) -> ActionResponse {
    if APP.get().is_none() {
        let opened = match CannaLogApp::open_local(db_path.trim()) {
            Ok(app) => app,
            Err(err) => return ActionResponse::failure(format!("app_open failed: {err}")),
        };
        // A concurrent open may have won; keep the first instance.
        let _ = APP.set(opened);
    }
    let Ok(app) = app() else {
        return ActionResponse::failure("app_open failed: app unavailable");
    };

    let resumed = app.start().await;
    info!("event=ffi_app_open module=ffi status=ok resumed={resumed}");
    ActionResponse::success(if resumed {
        "Session resumed."
    } else {
        "Sign in to continue."
    })
}

pub async fn app_sign_in(identity_token: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.sign_in(identity_token.as_str()).await {
        Ok(_) => ActionResponse::success("Signed in."),
        Err(err) => ActionResponse::failure(format!("app_sign_in failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn app_request_sign_out() -> ActionResponse {
    match app() {
        Ok(app) => ActionResponse::from_flag(app.request_sign_out(), "Sign-out prompt"),
        Err(response) => response,
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn app_cancel_sign_out() -> ActionResponse {
    match app() {
        Ok(app) => {
            app.cancel_sign_out();
            ActionResponse::success("Sign-out cancelled.")
        }
        Err(response) => response,
    }
}

pub async fn app_confirm_sign_out() -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.confirm_sign_out().await {
        Ok(applied) => ActionResponse::from_flag(applied, "Sign-out"),
        Err(err) => ActionResponse::failure(format!("app_confirm_sign_out failed: {err}")),
    }
}

pub async fn app_create_entry() -> ActionResponse {
    match app() {
        Ok(app) => ActionResponse::from_flag(app.create_entry().await, "Create entry"),
        Err(response) => response,
    }
}

pub async fn app_open_entry(entry_id: String) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    let Some(id) = parse_entry_id(&entry_id) else {
        return ActionResponse::failure(format!("invalid entry id `{entry_id}`"));
    };
    ActionResponse::from_flag(app.open_entry(id).await, "Open entry")
}

#[flutter_rust_bridge::frb(sync)]
pub fn app_back() -> ActionResponse {
    match app() {
        Ok(app) => ActionResponse::from_flag(app.back(), "Back"),
        Err(response) => response,
    }
}

/// Applies editor field changes; `None` leaves a field untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn app_edit_draft(
    title: Option<String>,
    description: Option<String>,
    timestamp_ms: Option<i64>,
    stage_page: Option<u32>,
) -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    let Some(editor) = app.editor() else {
        return ActionResponse::failure("no entry is being edited");
    };
    let applied = [
        title.map(|title| editor.set_title(title)),
        description.map(|description| editor.set_description(description)),
        timestamp_ms.map(|timestamp_ms| editor.set_timestamp_ms(timestamp_ms)),
        stage_page.map(|page| editor.set_stage_page(page as usize)),
    ];
    if applied.contains(&Some(false)) {
        return ActionResponse::failure("entry is still loading or saving; edit ignored");
    }
    ActionResponse::success("Draft updated.")
}

pub async fn app_save() -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.save().await {
        Ok(_) => ActionResponse::success("Saved."),
        Err(err) => ActionResponse::failure(format!("app_save failed: {err}")),
    }
}

pub async fn app_delete() -> ActionResponse {
    let app = match app() {
        Ok(app) => app,
        Err(response) => return response,
    };
    match app.delete().await {
        Ok(()) => ActionResponse::success("Deleted."),
        Err(err) => ActionResponse::failure(format!("app_delete failed: {err}")),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn app_dismiss_message(message_id: u64) -> ActionResponse {
    match app() {
        Ok(app) => ActionResponse::from_flag(app.dismiss_message(message_id), "Dismiss"),
        Err(response) => response,
    }
}

/// Returns the current read model, or `None` before `app_open`.
#[flutter_rust_bridge::frb(sync)]
pub fn app_snapshot() -> Option<AppSnapshot> {
    APP.get().map(snapshot_of)
}

fn snapshot_of(app: &CannaLogApp) -> AppSnapshot {
    let screen = app.screen();
    let (screen_label, editor_entry_id) = match screen {
        Screen::Authentication => ("authentication", None),
        Screen::List => ("list", None),
        Screen::Editor(id) => ("editor", id.map(|id| id.to_string())),
    };

    AppSnapshot {
        screen: screen_label.to_string(),
        editor_entry_id,
        entries: app.entries().iter().map(to_entry_item).collect(),
        draft: app.draft().as_ref().map(to_entry_item),
        is_loading: app.is_loading(),
        sign_out_prompt_open: app.sign_out_prompt_open(),
        messages: app.messages().iter().map(to_message_item).collect(),
    }
}

fn to_entry_item(entry: &Entry) -> EntryItem {
    EntryItem {
        id: entry.id.map(|id| id.to_string()).unwrap_or_default(),
        title: entry.title.clone(),
        description: entry.description.clone(),
        stage: entry.stage.as_str().to_string(),
        stage_page: entry.stage.page() as u32,
        timestamp_ms: entry.timestamp_ms,
        images: entry.images.clone(),
    }
}

fn to_message_item(message: &Message) -> MessageItem {
    MessageItem {
        id: message.id,
        kind: match message.kind {
            MessageKind::Success => "success",
            MessageKind::Error => "error",
        }
        .to_string(),
        text: message.text.clone(),
    }
}

fn parse_entry_id(raw: &str) -> Option<EntryId> {
    uuid::Uuid::parse_str(raw.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::{
        app_back, app_create_entry, app_edit_draft, app_open, app_save, app_sign_in,
        app_snapshot, core_version, init_logging, parse_entry_id, ping, snapshot_of,
        stage_labels,
    };
    use cannalog_core::CannaLogApp;

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let dir = tempfile::tempdir().unwrap();
        let error = init_logging("verbose".to_string(), dir.path().display().to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn stage_labels_follow_page_order() {
        assert_eq!(
            stage_labels(),
            vec!["SEED", "VEGETATIVE", "FLOWERING", "HARVEST", "CURING"]
        );
    }

    #[test]
    fn parse_entry_id_rejects_garbage() {
        assert!(parse_entry_id("not-a-uuid").is_none());
        assert!(parse_entry_id(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").is_some());
    }

    #[tokio::test]
    async fn snapshot_reflects_editor_draft() {
        let dir = tempfile::tempdir().unwrap();
        let app = CannaLogApp::open_local(dir.path().join("snapshot.sqlite3")).unwrap();
        app.sign_in("grower").await.unwrap();
        app.create_entry().await;
        app.editor().unwrap().set_stage_page(3);

        let snapshot = snapshot_of(&app);
        assert_eq!(snapshot.screen, "editor");
        assert_eq!(snapshot.editor_entry_id, None);
        let draft = snapshot.draft.unwrap();
        assert_eq!(draft.stage, "HARVEST");
        assert_eq!(draft.stage_page, 3);
        assert!(draft.id.is_empty());
        assert_eq!(snapshot.messages[0].kind, "success");
    }

    #[tokio::test]
    async fn global_app_drives_full_write_flow() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("global.sqlite3");
        assert!(app_open(db_path.display().to_string()).await.ok);
        assert!(app_sign_in("ffi-grower".to_string()).await.ok);

        assert!(app_create_entry().await.ok);
        let edit = app_edit_draft(Some("Day 1".to_string()), None, Some(1_000), Some(0));
        assert!(edit.ok, "{}", edit.message);
        assert!(app_save().await.ok);

        let snapshot = app_snapshot().unwrap();
        assert_eq!(snapshot.screen, "list");
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].title, "Day 1");
        assert_eq!(snapshot.entries[0].stage, "SEED");
        assert!(!app_back().ok);
    }
}
