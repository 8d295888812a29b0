//! Transient, dismissible user-facing messages.

/// Message severity shown by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u64,
    pub kind: MessageKind,
    pub text: String,
}

/// Pending messages kept before the oldest are dropped.
pub const MESSAGE_CAPACITY: usize = 20;

/// Ordered queue of pending messages, oldest first.
#[derive(Debug, Default)]
pub struct MessageBar {
    next_id: u64,
    items: Vec<Message>,
}

impl MessageBar {
    /// Queues a message, dropping the oldest once `MESSAGE_CAPACITY` are
    /// pending.
    pub fn push(&mut self, kind: MessageKind, text: impl Into<String>) -> u64 {
        if self.items.len() >= MESSAGE_CAPACITY {
            let overflow = self.items.len() + 1 - MESSAGE_CAPACITY;
            self.items.drain(..overflow);
        }
        self.next_id += 1;
        self.items.push(Message {
            id: self.next_id,
            kind,
            text: text.into(),
        });
        self.next_id
    }

    pub fn success(&mut self, text: impl Into<String>) -> u64 {
        self.push(MessageKind::Success, text)
    }

    pub fn error(&mut self, text: impl Into<String>) -> u64 {
        self.push(MessageKind::Error, text)
    }

    /// Removes one message. Returns whether it was pending.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|message| message.id != id);
        self.items.len() != before
    }

    pub fn pending(&self) -> &[Message] {
        &self.items
    }
}
