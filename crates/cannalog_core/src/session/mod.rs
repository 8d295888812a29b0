//! Session provider contract and identity types.
//!
//! # Responsibility
//! - Define sign-in/sign-out and current-identity queries used by the
//!   session gate and the editor.
//!
//! # Invariants
//! - After `sign_out` resolves with `Ok`, `current_identity` is `None`.
//! - Token verification belongs to the provider, never to view-models.

use crate::db::DbError;
use crate::model::entry::OwnerId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod local;

pub use local::LocalSessionProvider;

pub type AuthResult<T> = Result<T, AuthError>;

/// Authenticated-user handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id; becomes `Entry::owner_id`.
    pub user_id: OwnerId,
}

impl Identity {
    pub fn new(user_id: impl Into<OwnerId>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Sign-in/sign-out failures.
#[derive(Debug)]
pub enum AuthError {
    /// Identity token rejected by the provider.
    InvalidToken,
    /// Operation requires a signed-in identity.
    NotSignedIn,
    /// Identity provider unreachable.
    Unavailable(String),
    /// Session persistence failure.
    Storage(DbError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "identity token was rejected"),
            Self::NotSignedIn => write!(f, "no identity is signed in"),
            Self::Unavailable(message) => write!(f, "identity provider unavailable: {message}"),
            Self::Storage(err) => write!(f, "session storage failed: {err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for AuthError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for AuthError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Authentication collaborator.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn sign_in(&self, identity_token: &str) -> AuthResult<Identity>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current_identity(&self) -> Option<Identity>;
}
