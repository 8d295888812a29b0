//! Local session provider with SQLite-persisted session state.
//!
//! Accepts any well-formed identity token and uses it verbatim as the user
//! id. Token cryptography is the identity provider's job and is not done here.

use super::{AuthError, AuthResult, Identity, SessionProvider};
use async_trait::async_trait;
use log::{info, warn};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._@-]{0,127}$").expect("valid token regex")
});

/// Session provider backed by the `session_state` table.
pub struct LocalSessionProvider {
    conn: Mutex<Connection>,
    current: Mutex<Option<Identity>>,
}

impl LocalSessionProvider {
    /// Wraps a migrated connection and restores any persisted session.
    pub fn restore(conn: Connection) -> AuthResult<Self> {
        let current = conn
            .query_row(
                "SELECT user_id FROM session_state WHERE slot = 1;",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(Identity::new);

        info!(
            "event=session_restore module=session status=ok restored={}",
            current.is_some()
        );
        Ok(Self {
            conn: Mutex::new(conn),
            current: Mutex::new(current),
        })
    }
}

/// Returns whether a token has the shape the local provider accepts.
pub fn is_well_formed_token(token: &str) -> bool {
    TOKEN_RE.is_match(token)
}

#[async_trait]
impl SessionProvider for LocalSessionProvider {
    async fn sign_in(&self, identity_token: &str) -> AuthResult<Identity> {
        let token = identity_token.trim();
        if !is_well_formed_token(token) {
            warn!("event=sign_in module=session status=error error_code=invalid_token");
            return Err(AuthError::InvalidToken);
        }

        let identity = Identity::new(token);
        self.conn.lock().execute(
            "INSERT INTO session_state (slot, user_id) VALUES (1, ?1)
             ON CONFLICT(slot) DO UPDATE SET
                user_id = excluded.user_id,
                signed_in_at = (strftime('%s', 'now') * 1000);",
            [identity.user_id.as_str()],
        )?;
        *self.current.lock() = Some(identity.clone());

        info!("event=sign_in module=session status=ok");
        Ok(identity)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        if self.current.lock().is_none() {
            return Err(AuthError::NotSignedIn);
        }

        self.conn
            .lock()
            .execute("DELETE FROM session_state WHERE slot = 1;", [])?;
        *self.current.lock() = None;

        info!("event=sign_out module=session status=ok");
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.current.lock().clone()
    }
}
