//! Session gate: ties the list subscription to the signed-in identity.
//!
//! # Invariants
//! - The list is attached only for the current identity.
//! - Sign-out navigates only after the provider confirms, then tears the
//!   list subscription down.

use super::list::ListViewModel;
use crate::session::{AuthError, AuthResult, Identity, SessionProvider};
use crate::store::StoreResult;
use log::{info, warn};
use std::sync::Arc;

pub struct SessionGate {
    session: Arc<dyn SessionProvider>,
    list: Arc<ListViewModel>,
}

impl SessionGate {
    pub fn new(session: Arc<dyn SessionProvider>, list: Arc<ListViewModel>) -> Self {
        Self { session, list }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.session.current_identity()
    }

    /// (Re)attaches the list to `identity`'s entries.
    pub async fn enter_list(&self, identity: &Identity) -> StoreResult<()> {
        self.list.attach(&identity.user_id).await
    }

    /// Signs out, then runs `navigate_to_auth`, then detaches the list.
    ///
    /// A provider reporting `NotSignedIn` counts as already signed out.
    pub async fn sign_out<F>(&self, navigate_to_auth: F) -> AuthResult<()>
    where
        F: FnOnce() + Send,
    {
        match self.session.sign_out().await {
            Ok(()) => {}
            Err(AuthError::NotSignedIn) => {
                warn!("event=sign_out module=gate status=noop reason=not_signed_in");
            }
            Err(err) => return Err(err),
        }

        navigate_to_auth();
        self.list.detach();
        info!("event=sign_out module=gate status=ok");
        Ok(())
    }
}
