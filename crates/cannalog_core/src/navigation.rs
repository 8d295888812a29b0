//! Three-screen navigation state machine.
//!
//! # Invariants
//! - Initial screen is `Authentication` with an empty history.
//! - Only the transitions listed on `NavEvent` are applied; anything else
//!   is ignored and leaves state untouched.
//! - Sign-out clears the history, so nothing can navigate back into `List`.

use crate::model::entry::EntryId;
use log::debug;
use std::fmt::{Display, Formatter};

/// Navigable screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    Authentication,
    List,
    /// `None` opens a new draft.
    Editor(Option<EntryId>),
}

impl Screen {
    pub fn is_editor(self) -> bool {
        matches!(self, Self::Editor(_))
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::List => write!(f, "list"),
            Self::Editor(None) => write!(f, "editor(new)"),
            Self::Editor(Some(id)) => write!(f, "editor({id})"),
        }
    }
}

/// Navigation triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    /// Session provider reported a newly authenticated identity.
    Authenticated,
    CreateEntry,
    OpenEntry(EntryId),
    Back,
    SaveSucceeded,
    DeleteSucceeded,
    /// Sign-out confirmed and completed.
    SignedOut,
}

/// Finite router among `Screen`s with a back-stack history.
#[derive(Debug, Clone)]
pub struct Navigator {
    current: Screen,
    history: Vec<Screen>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            current: Screen::Authentication,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    /// Screens reachable by going back, oldest first.
    pub fn history(&self) -> &[Screen] {
        &self.history
    }

    /// Applies `event` when legal from the current screen.
    ///
    /// Returns whether the screen changed.
    pub fn apply(&mut self, event: NavEvent) -> bool {
        let next = match (self.current, event) {
            (Screen::Authentication, NavEvent::Authenticated) => {
                self.history.clear();
                Screen::List
            }
            (Screen::List, NavEvent::CreateEntry) => {
                self.history.push(Screen::List);
                Screen::Editor(None)
            }
            (Screen::List, NavEvent::OpenEntry(id)) => {
                self.history.push(Screen::List);
                Screen::Editor(Some(id))
            }
            (
                Screen::Editor(_),
                NavEvent::Back | NavEvent::SaveSucceeded | NavEvent::DeleteSucceeded,
            ) => {
                self.history.pop();
                Screen::List
            }
            (Screen::List, NavEvent::SignedOut) => {
                self.history.clear();
                Screen::Authentication
            }
            (current, event) => {
                debug!("event=nav_ignored module=navigation status=noop screen={current} trigger={event:?}");
                return false;
            }
        };

        debug!(
            "event=nav module=navigation status=ok from={} to={}",
            self.current, next
        );
        self.current = next;
        true
    }
}
