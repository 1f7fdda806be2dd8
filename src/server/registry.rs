//! Session registry for the sync server
//!
//! Tracks the connected sessions, hands each one a display name at admission,
//! and fans events out over their outbound queues.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::debug;

use crate::current_timestamp;
use crate::names::{NameSource, RandomNames};
use crate::protocol::codec::ServerMessage;

/// Opaque per-connection handle assigned by the transport
pub type ConnectionHandle = usize;

/// Queue feeding a session's writer task
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// One connected client
#[derive(Debug, Clone)]
pub struct Session {
    /// Transport handle
    pub handle: ConnectionHandle,
    /// Name assigned at admission
    pub display_name: String,
    /// When the session was admitted
    pub connected_at: u64,
    /// Sender half of the session's outbound queue (not the connection itself)
    outbound: Outbound,
}

impl Session {
    pub fn new(handle: ConnectionHandle, display_name: String, outbound: Outbound) -> Self {
        Self {
            handle,
            display_name,
            connected_at: current_timestamp(),
            outbound,
        }
    }

    /// Queue an event for this session. Best effort: returns false when the
    /// writer side is already gone.
    pub fn send(&self, msg: ServerMessage) -> bool {
        match self.outbound.send(msg) {
            Ok(()) => true,
            Err(err) => {
                debug!(
                    "Dropped {} for closed session {}",
                    err.0.event_name(),
                    self.handle
                );
                false
            }
        }
    }
}

/// Registry of connected sessions keyed by connection handle
pub struct SessionRegistry {
    sessions: HashMap<ConnectionHandle, Session>,
    names: Box<dyn NameSource>,
}

impl SessionRegistry {
    /// Create a registry drawing random pronounceable names
    pub fn new() -> Self {
        Self::with_names(RandomNames::new())
    }

    /// Create a registry with a custom name source
    pub fn with_names(names: impl NameSource + 'static) -> Self {
        Self {
            sessions: HashMap::new(),
            names: Box::new(names),
        }
    }

    /// Register a new session and announce it.
    ///
    /// The new session privately learns its own name (`user:me`); every other
    /// session is told someone joined (`user:new`). A stale entry under the
    /// same handle is replaced.
    pub fn admit(&mut self, handle: ConnectionHandle, outbound: Outbound) -> &Session {
        let display_name = self.names.next_name();
        let session = Session::new(handle, display_name.clone(), outbound);

        session.send(ServerMessage::UserMe(display_name.clone()));
        self.broadcast_except(handle, ServerMessage::UserNew(display_name));

        self.sessions.insert(handle, session);
        &self.sessions[&handle]
    }

    /// Remove a session. No announcement is made here.
    pub fn remove(&mut self, handle: ConnectionHandle) -> Option<Session> {
        self.sessions.remove(&handle)
    }

    /// Get a session by handle
    pub fn get(&self, handle: ConnectionHandle) -> Option<&Session> {
        self.sessions.get(&handle)
    }

    /// Number of connected sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Display names of everyone connected
    pub fn display_names(&self) -> Vec<String> {
        self.sessions
            .values()
            .map(|s| s.display_name.clone())
            .collect()
    }

    /// Send an event to one session
    pub fn send_to(&self, handle: ConnectionHandle, msg: ServerMessage) -> bool {
        self.sessions
            .get(&handle)
            .map(|s| s.send(msg))
            .unwrap_or(false)
    }

    /// Send an event to every connected session
    pub fn broadcast(&self, msg: ServerMessage) {
        for session in self.sessions.values() {
            session.send(msg.clone());
        }
    }

    /// Send an event to every connected session but one
    pub fn broadcast_except(&self, excluded: ConnectionHandle, msg: ServerMessage) {
        for session in self.sessions.values() {
            if session.handle != excluded {
                session.send(msg.clone());
            }
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_names(names: &[&str]) -> impl NameSource + 'static {
        let mut names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        names.reverse();
        move || names.pop().unwrap_or_else(|| "Anon".to_string())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_admit_announces() {
        let mut registry = SessionRegistry::with_names(fixed_names(&["Whiskers", "Biscuit"]));

        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let a = registry.admit(1, tx_a);
        assert_eq!(a.display_name, "Whiskers");
        assert_eq!(
            drain(&mut rx_a),
            vec![ServerMessage::UserMe("Whiskers".to_string())]
        );

        registry.admit(2, tx_b);
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerMessage::UserMe("Biscuit".to_string())]
        );
        assert_eq!(
            drain(&mut rx_a),
            vec![ServerMessage::UserNew("Biscuit".to_string())]
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remove_is_silent() {
        let mut registry = SessionRegistry::with_names(fixed_names(&["A", "B"]));
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();

        registry.admit(1, tx_a);
        registry.admit(2, tx_b);
        drain(&mut rx_a);

        let removed = registry.remove(2).unwrap();
        assert_eq!(removed.display_name, "B");
        assert!(drain(&mut rx_a).is_empty());
        assert!(registry.remove(2).is_none());
        assert_eq!(registry.display_names(), vec!["A".to_string()]);
    }

    #[test]
    fn test_readmit_same_handle_overwrites() {
        let mut registry = SessionRegistry::with_names(fixed_names(&["Old", "New"]));
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();

        registry.admit(7, tx1);
        registry.admit(7, tx2);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(7).unwrap().display_name, "New");
    }

    #[test]
    fn test_send_to_closed_session() {
        let mut registry = SessionRegistry::with_names(fixed_names(&["Gone"]));
        let (tx, rx) = mpsc::unbounded_channel();
        registry.admit(3, tx);
        drop(rx);

        assert!(!registry.send_to(3, ServerMessage::NumberChange(1)));
        assert!(!registry.send_to(99, ServerMessage::NumberChange(1)));
        // Broadcasting to a dead queue is not an error
        registry.broadcast(ServerMessage::NumberChange(2));
    }
}
