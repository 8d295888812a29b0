//! Core domain logic for CannaLog, a personal grow-log.
//! This crate is the single source of truth for entry, navigation and
//! session invariants; UI shells bind to `CannaLogApp`.

pub mod app;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod navigation;
pub mod repo;
pub mod session;
pub mod store;

pub use app::{
    AppOpenError, CannaLogApp, DraftSource, EditorError, EditorViewModel, ListViewModel, Message,
    MessageKind, SessionGate,
};
pub use config::{AppConfig, ConfigError};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LogLevel, LoggingError,
};
pub use model::entry::{Entry, EntryId, EntryValidationError, OwnerId, Stage};
pub use navigation::{NavEvent, Navigator, Screen};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use session::{AuthError, AuthResult, Identity, LocalSessionProvider, SessionProvider};
pub use store::{EntryStore, EntrySubscription, LocalEntryStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
