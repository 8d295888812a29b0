mod common;

use cannalog_core::{
    CannaLogApp, EditorError, EntryStore, MessageKind, Screen, SessionProvider, Stage,
};
use common::{
    entry, memory_session, memory_store, signed_in_app, FlakyStore, GatedStore, ScriptedSession,
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn sign_in_moves_to_list_and_attaches_subscription() {
    let store = memory_store();
    let app = CannaLogApp::new(store.clone(), memory_session());
    assert_eq!(app.screen(), Screen::Authentication);

    let identity = app.sign_in("grower").await.unwrap();
    assert_eq!(identity.user_id, "grower");
    assert_eq!(app.screen(), Screen::List);
    assert_eq!(store.subscriber_count("grower"), 1);
    assert!(app
        .messages()
        .iter()
        .any(|message| message.kind == MessageKind::Success));
}

#[tokio::test]
async fn rejected_token_stays_on_authentication_with_error_message() {
    let app = CannaLogApp::new(memory_store(), memory_session());

    assert!(app.sign_in("not a token").await.is_err());
    assert_eq!(app.screen(), Screen::Authentication);
    let messages = app.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Error);

    assert!(app.dismiss_message(messages[0].id));
    assert!(app.messages().is_empty());
}

#[tokio::test]
async fn create_edit_delete_scenario_is_reflected_in_list() {
    let (app, _store) = signed_in_app("grower").await;

    assert!(app.create_entry().await);
    assert_eq!(app.screen(), Screen::Editor(None));
    let editor = app.editor().unwrap();
    editor.set_title("Day 1");
    editor.set_stage(Stage::Seed);
    let saved = app.save().await.unwrap();
    let id = saved.id.unwrap();

    assert_eq!(app.screen(), Screen::List);
    let rows = app.entries();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "Day 1");
    assert_eq!(rows[0].stage, Stage::Seed);

    assert!(app.open_entry(id).await);
    assert_eq!(app.screen(), Screen::Editor(Some(id)));
    assert_eq!(app.draft().unwrap().title, "Day 1");
    app.editor().unwrap().set_stage(Stage::Flowering);
    app.save().await.unwrap();

    let rows = app.entries();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, Some(id));
    assert_eq!(rows[0].stage, Stage::Flowering);

    assert!(app.open_entry(id).await);
    app.delete().await.unwrap();
    assert_eq!(app.screen(), Screen::List);
    assert!(app.entries().is_empty());
    assert!(app
        .messages()
        .iter()
        .any(|message| message.text == "Deleted"));
}

#[tokio::test]
async fn list_reacts_to_writes_made_outside_the_editor() {
    let (app, store) = signed_in_app("grower").await;
    let mut updates = app.list().updates().unwrap();

    store.upsert(&entry("grower", "older", 10)).await.unwrap();
    store.upsert(&entry("grower", "newer", 20)).await.unwrap();
    assert!(updates.changed().await);

    let titles: Vec<String> = app.entries().iter().map(|e| e.title.clone()).collect();
    assert_eq!(titles, vec!["newer", "older"]);
}

#[tokio::test]
async fn opening_a_deleted_entry_shows_empty_draft_without_error() {
    let (app, _store) = signed_in_app("grower").await;
    let before = app.messages().len();

    assert!(app.open_entry(Uuid::new_v4()).await);
    let draft = app.draft().unwrap();
    assert!(draft.id.is_none());
    assert!(draft.title.is_empty());
    assert_eq!(app.messages().len(), before);
}

#[tokio::test]
async fn back_discards_editor_without_saving() {
    let (app, store) = signed_in_app("grower").await;

    app.create_entry().await;
    app.editor().unwrap().set_title("never saved");
    assert!(app.back());

    assert_eq!(app.screen(), Screen::List);
    assert!(app.editor().is_none());
    assert!(app.entries().is_empty());
    assert_eq!(store.subscriber_count("grower"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn leaving_the_editor_cancels_a_pending_load() {
    let inner = memory_store();
    let saved = inner.upsert(&entry("grower", "Day 1", 1)).await.unwrap();
    let gated = Arc::new(GatedStore::new(inner));
    gated.gate_gets();
    let app = Arc::new(CannaLogApp::new(gated.clone(), memory_session()));
    app.sign_in("grower").await.unwrap();
    let before = app.messages().len();

    let opening = tokio::spawn({
        let app = app.clone();
        async move { app.open_entry(saved.id.unwrap()).await }
    });
    gated.get_started.notified().await;
    assert!(app.is_loading());

    assert!(app.back());
    gated.release_gets(1);
    assert!(opening.await.unwrap());

    assert_eq!(app.screen(), Screen::List);
    assert!(app.editor().is_none());
    assert!(!app.is_loading());
    assert_eq!(app.messages().len(), before);
}

#[tokio::test]
async fn save_failure_keeps_editor_and_draft() {
    let flaky = Arc::new(FlakyStore::new(memory_store()));
    let app = CannaLogApp::new(flaky.clone(), memory_session());
    app.sign_in("grower").await.unwrap();
    app.create_entry().await;
    app.editor().unwrap().set_title("Day 1");

    flaky.set_offline(true);
    let err = app.save().await.unwrap_err();
    assert!(matches!(err, EditorError::Store(_)));
    assert_eq!(app.screen(), Screen::Editor(None));
    assert_eq!(app.draft().unwrap().title, "Day 1");
    assert!(app
        .messages()
        .iter()
        .any(|message| message.kind == MessageKind::Error));

    flaky.set_offline(false);
    app.save().await.unwrap();
    assert_eq!(app.screen(), Screen::List);
}

#[tokio::test]
async fn editor_actions_without_open_editor_fail_quietly() {
    let (app, _store) = signed_in_app("grower").await;
    assert!(matches!(app.save().await, Err(EditorError::NoOpenEditor)));
    assert!(matches!(app.delete().await, Err(EditorError::NoOpenEditor)));
    assert!(!app.back());
}

#[tokio::test]
async fn sign_out_requires_confirmation_prompt() {
    let (app, store) = signed_in_app("grower").await;

    assert!(!app.confirm_sign_out().await.unwrap());
    assert_eq!(app.screen(), Screen::List);

    assert!(app.request_sign_out());
    app.cancel_sign_out();
    assert!(!app.sign_out_prompt_open());
    assert!(!app.confirm_sign_out().await.unwrap());

    assert!(app.request_sign_out());
    assert!(app.confirm_sign_out().await.unwrap());
    assert_eq!(app.screen(), Screen::Authentication);
    assert!(app.current_identity().is_none());
    assert!(!app.list().is_attached());
    assert_eq!(store.subscriber_count("grower"), 0);
    assert!(app.entries().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sign_out_navigates_only_after_provider_confirms() {
    let store = memory_store();
    let session = Arc::new(ScriptedSession::new());
    let app = Arc::new(CannaLogApp::new(store.clone(), session.clone()));
    app.sign_in("grower").await.unwrap();
    assert!(app.request_sign_out());

    let pending = tokio::spawn({
        let app = app.clone();
        async move { app.confirm_sign_out().await }
    });
    session.sign_out_started.notified().await;

    assert_eq!(app.screen(), Screen::List);
    assert!(app.is_loading());
    assert!(!app.create_entry().await);

    session.release_sign_out();
    assert!(pending.await.unwrap().unwrap());
    assert_eq!(app.screen(), Screen::Authentication);
    assert_eq!(store.subscriber_count("grower"), 0);
    assert!(!app.is_loading());
}

#[tokio::test]
async fn failed_sign_out_stays_on_list_with_live_subscription() {
    let store = memory_store();
    let session = Arc::new(ScriptedSession::new());
    session
        .fail_sign_out
        .store(true, std::sync::atomic::Ordering::SeqCst);
    session.release_sign_out();
    let app = CannaLogApp::new(store.clone(), session.clone());
    app.sign_in("grower").await.unwrap();

    assert!(app.request_sign_out());
    assert!(app.confirm_sign_out().await.is_err());
    assert_eq!(app.screen(), Screen::List);
    assert_eq!(store.subscriber_count("grower"), 1);
    assert!(session.current_identity().is_some());
}

#[tokio::test]
async fn signing_in_as_another_identity_rescopes_the_list() {
    let (app, store) = signed_in_app("alice").await;
    store.upsert(&entry("alice", "alice entry", 1)).await.unwrap();
    store.upsert(&entry("bob", "bob entry", 2)).await.unwrap();
    assert_eq!(app.entries().len(), 1);

    app.request_sign_out();
    app.confirm_sign_out().await.unwrap();
    app.sign_in("bob").await.unwrap();

    let rows = app.entries();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "bob entry");
    assert_eq!(store.subscriber_count("alice"), 0);
    assert_eq!(store.subscriber_count("bob"), 1);
}

#[tokio::test]
async fn sign_out_closes_list_handles_held_by_the_ui() {
    let (app, store) = signed_in_app("grower").await;
    let mut held = app.list().updates().unwrap();
    assert_eq!(store.subscriber_count("grower"), 2);

    app.request_sign_out();
    assert!(app.confirm_sign_out().await.unwrap());

    assert_eq!(app.screen(), Screen::Authentication);
    assert_eq!(store.subscriber_count("grower"), 0);
    assert!(!held.changed().await);

    store.upsert(&entry("grower", "written after sign-out", 1)).await.unwrap();
    assert!(held.snapshot().is_empty());
}

#[tokio::test]
async fn another_identity_cannot_open_or_delete_foreign_entries() {
    let (app, store) = signed_in_app("alice").await;
    app.create_entry().await;
    app.editor().unwrap().set_title("alice secret");
    let saved = app.save().await.unwrap();
    let id = saved.id.unwrap();

    app.request_sign_out();
    app.confirm_sign_out().await.unwrap();
    app.sign_in("bob").await.unwrap();

    assert!(app.open_entry(id).await);
    let draft = app.draft().unwrap();
    assert!(draft.id.is_none());
    assert!(draft.title.is_empty());
    assert!(!app.editor().unwrap().is_existing_entry());
    assert!(matches!(app.delete().await, Err(EditorError::NotPersisted)));

    assert_eq!(store.get("alice", id).await.unwrap().title, "alice secret");
    assert!(app.entries().is_empty());
}

#[tokio::test]
async fn screen_watch_observes_transitions() {
    let (app, _store) = signed_in_app("grower").await;
    let mut screens = app.watch_screen();
    assert_eq!(*screens.borrow(), Screen::List);

    app.create_entry().await;
    assert!(screens.changed().await.is_ok());
    assert_eq!(*screens.borrow_and_update(), Screen::Editor(None));
}

#[tokio::test]
async fn restored_session_resumes_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cannalog.sqlite3");

    {
        let app = CannaLogApp::open_local(&path).unwrap();
        assert!(!app.start().await);
        app.sign_in("grower").await.unwrap();
        app.create_entry().await;
        app.editor().unwrap().set_title("persisted");
        app.save().await.unwrap();
    }

    let app = CannaLogApp::open_local(&path).unwrap();
    assert!(app.start().await);
    assert_eq!(app.screen(), Screen::List);
    assert_eq!(app.entries().len(), 1);
    assert_eq!(app.entries()[0].title, "persisted");
}
