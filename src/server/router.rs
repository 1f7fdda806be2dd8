//! Event router: the only path by which shared state changes
//!
//! Every inbound mutation produces exactly one state change followed by
//! exactly one broadcast, or nothing at all when the input is rejected.
//! Counter changes carry the new absolute value, so a client that missed an
//! earlier broadcast is corrected by the next one. Chat lines are discrete
//! appends; a client that misses one only recovers it through catch-up.

use tracing::{info, warn};

use crate::protocol::codec::ServerMessage;
use crate::server::registry::{ConnectionHandle, SessionRegistry};
use crate::server::store::SharedState;

/// Mutation requested by a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    Increment,
    Decrement,
    Message {
        author_name: Option<String>,
        text: Option<String>,
    },
}

/// Applies inbound events to the store it owns and fans the result out
#[derive(Debug, Default)]
pub struct EventRouter {
    store: SharedState,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the state, for catch-up and stats
    pub fn store(&self) -> &SharedState {
        &self.store
    }

    /// Apply one event from `origin` and broadcast the outcome.
    ///
    /// Returns the broadcast event, or `None` when the input was dropped.
    pub fn route(
        &mut self,
        registry: &SessionRegistry,
        origin: ConnectionHandle,
        event: InboundEvent,
    ) -> Option<ServerMessage> {
        let outcome = match event {
            InboundEvent::Increment => {
                let value = self.store.apply_increment();
                info!("number has changed: {}", value);
                ServerMessage::NumberChange(value)
            }
            InboundEvent::Decrement => {
                let value = self.store.apply_decrement();
                info!("number has changed: {}", value);
                ServerMessage::NumberChange(value)
            }
            InboundEvent::Message { author_name, text } => {
                let author_name = match author_name {
                    Some(name) => name,
                    None => registry
                        .get(origin)
                        .map(|s| s.display_name.clone())
                        .unwrap_or_default(),
                };

                match self.store.append_message(author_name, text) {
                    Some(message) => {
                        info!("message from {}: {}", message.author_name, message.text);
                        ServerMessage::Message(message)
                    }
                    None => {
                        warn!("Dropped empty message from session {}", origin);
                        return None;
                    }
                }
            }
        };

        registry.broadcast(outcome.clone());
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::ChatMessage;
    use tokio::sync::mpsc;

    fn registry_with(
        names: &'static [&'static str],
    ) -> (
        SessionRegistry,
        Vec<mpsc::UnboundedReceiver<ServerMessage>>,
    ) {
        let mut iter = names.iter();
        let mut registry =
            SessionRegistry::with_names(move || iter.next().copied().unwrap_or("Anon").to_string());
        let mut receivers = Vec::new();
        for handle in 0..names.len() {
            let (tx, rx) = mpsc::unbounded_channel();
            registry.admit(handle, tx);
            receivers.push(rx);
        }
        // Drop the admission announcements
        for rx in receivers.iter_mut() {
            while rx.try_recv().is_ok() {}
        }
        (registry, receivers)
    }

    #[test]
    fn test_counter_broadcast_reaches_everyone() {
        let (registry, mut receivers) = registry_with(&["A", "B"]);
        let mut router = EventRouter::new();

        let sent = router.route(&registry, 0, InboundEvent::Increment);
        assert_eq!(sent, Some(ServerMessage::NumberChange(1)));

        for rx in receivers.iter_mut() {
            assert_eq!(rx.try_recv().unwrap(), ServerMessage::NumberChange(1));
            assert!(rx.try_recv().is_err());
        }

        router.route(&registry, 1, InboundEvent::Decrement);
        router.route(&registry, 1, InboundEvent::Decrement);
        assert_eq!(router.store().current_counter(), -1);
    }

    #[test]
    fn test_message_uses_supplied_author() {
        let (registry, mut receivers) = registry_with(&["Whiskers"]);
        let mut router = EventRouter::new();

        router.route(
            &registry,
            0,
            InboundEvent::Message {
                author_name: Some("alice".to_string()),
                text: Some("hi".to_string()),
            },
        );

        assert_eq!(
            receivers[0].try_recv().unwrap(),
            ServerMessage::Message(ChatMessage::new("alice", "hi"))
        );
    }

    #[test]
    fn test_message_without_author_uses_display_name() {
        let (registry, _receivers) = registry_with(&["Whiskers"]);
        let mut router = EventRouter::new();

        router.route(
            &registry,
            0,
            InboundEvent::Message {
                author_name: None,
                text: Some("hello".to_string()),
            },
        );

        assert_eq!(
            router.store().current_history(),
            &[ChatMessage::new("Whiskers", "hello")]
        );
    }

    #[test]
    fn test_empty_message_is_not_broadcast() {
        let (registry, mut receivers) = registry_with(&["A", "B"]);
        let mut router = EventRouter::new();

        for text in [Some(String::new()), None] {
            let sent = router.route(
                &registry,
                0,
                InboundEvent::Message {
                    author_name: Some("bob".to_string()),
                    text,
                },
            );
            assert_eq!(sent, None);
        }

        assert!(router.store().current_history().is_empty());
        for rx in receivers.iter_mut() {
            assert!(rx.try_recv().is_err());
        }
    }
}
