//! Client-side mirror of the synchronized state
//!
//! Applies server events the way a front-end would: the counter is replaced
//! wholesale by every `number:change`, chat lines are appended from live
//! `message` events and from the one-time `old messages` replay.

use crate::protocol::codec::ServerMessage;
use crate::protocol::messages::ChatMessage;

/// Local state held by one connected client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientView {
    /// Last counter value received
    pub counter: i64,
    /// Chat lines in display order
    pub texts: Vec<ChatMessage>,
    /// Name the server assigned to this client
    pub me: Option<String>,
    /// Participants announced as joined since this client connected
    pub joined: Vec<String>,
    /// Participants announced as gone
    pub left: Vec<String>,
}

impl ClientView {
    /// A view whose log starts with the local greeting line
    pub fn welcome() -> Self {
        Self {
            texts: vec![ChatMessage::new("computer", "welcome to my chat")],
            ..Self::default()
        }
    }

    /// Fold one server event into the view
    pub fn apply(&mut self, event: &ServerMessage) {
        match event {
            ServerMessage::NumberChange(value) => self.counter = *value,
            ServerMessage::Message(message) => self.texts.push(message.clone()),
            ServerMessage::OldMessages(messages) => self.texts.extend(messages.iter().cloned()),
            ServerMessage::UserMe(name) => self.me = Some(name.clone()),
            ServerMessage::UserNew(name) => self.joined.push(name.clone()),
            ServerMessage::UserLeft(name) => self.left.push(name.clone()),
        }
    }
}
