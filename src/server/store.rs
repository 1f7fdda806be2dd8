//! Authoritative counter and chat history
//!
//! Owned by the event router inside the hub task. Nothing else mutates it, so
//! it carries no locks.

use crate::protocol::messages::ChatMessage;

/// The shared state every session converges on
#[derive(Debug, Default)]
pub struct SharedState {
    counter: i64,
    history: Vec<ChatMessage>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value
    pub fn current_counter(&self) -> i64 {
        self.counter
    }

    /// Full chat history in receipt order
    pub fn current_history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Raise the counter by one and return the new value
    pub fn apply_increment(&mut self) -> i64 {
        self.counter = self.counter.wrapping_add(1);
        self.counter
    }

    /// Lower the counter by one and return the new value
    pub fn apply_decrement(&mut self) -> i64 {
        self.counter = self.counter.wrapping_sub(1);
        self.counter
    }

    /// Append a chat line. Returns `None` without touching the history when
    /// `text` is missing or empty.
    pub fn append_message(
        &mut self,
        author_name: impl Into<String>,
        text: Option<String>,
    ) -> Option<ChatMessage> {
        let text = text.filter(|t| !t.is_empty())?;
        let message = ChatMessage::new(author_name, text);
        self.history.push(message.clone());
        Some(message)
    }
}
