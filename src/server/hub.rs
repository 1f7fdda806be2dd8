//! The hub: single worker that serializes every lifecycle and mutation event
//!
//! Connection handlers never touch state directly. They push [`HubEvent`]s
//! into one queue, and the hub task handles them one at a time in arrival
//! order. Apply-then-broadcast is therefore atomic with respect to every other
//! event, and each session's outbound queue sees events in processing order.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::protocol::codec::ServerMessage;
use crate::server::catch_up;
use crate::server::registry::{ConnectionHandle, Outbound, SessionRegistry};
use crate::server::router::{EventRouter, InboundEvent};

/// Events consumed by the hub
#[derive(Debug)]
pub enum HubEvent {
    /// Transport connect: admit and catch up
    Connected {
        handle: ConnectionHandle,
        outbound: Outbound,
    },
    /// Transport disconnect
    Disconnected { handle: ConnectionHandle },
    /// Mutation request from a session
    Inbound {
        handle: ConnectionHandle,
        event: InboundEvent,
    },
    /// Snapshot of hub counters
    Stats { reply: oneshot::Sender<HubStats> },
}

/// Hub statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    pub sessions: usize,
    pub counter: i64,
    pub history_len: usize,
}

/// Owner of the registry and the router (and through it, the store)
pub struct Hub {
    registry: SessionRegistry,
    router: EventRouter,
    announce_departures: bool,
}

impl Hub {
    /// Create a hub with random display names
    pub fn new(announce_departures: bool) -> Self {
        Self::with_registry(SessionRegistry::new(), announce_departures)
    }

    /// Create a hub around an existing registry
    pub fn with_registry(registry: SessionRegistry, announce_departures: bool) -> Self {
        Self {
            registry,
            router: EventRouter::new(),
            announce_departures,
        }
    }

    /// Handle one event to completion
    pub fn handle_event(&mut self, event: HubEvent) {
        match event {
            HubEvent::Connected { handle, outbound } => {
                let session = self.registry.admit(handle, outbound);
                info!("a user connected: {} ({})", session.display_name, handle);
                catch_up::on_admit(session, self.router.store());
            }

            HubEvent::Disconnected { handle } => match self.registry.remove(handle) {
                Some(session) => {
                    info!("user disconnected: {} ({})", session.display_name, handle);
                    if self.announce_departures {
                        self.registry
                            .broadcast(ServerMessage::UserLeft(session.display_name));
                    }
                }
                None => debug!("Disconnect for unknown session {}", handle),
            },

            HubEvent::Inbound { handle, event } => {
                if self.registry.get(handle).is_none() {
                    warn!("Ignoring {:?} from unknown session {}", event, handle);
                    return;
                }
                self.router.route(&self.registry, handle, event);
            }

            HubEvent::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    /// Current hub statistics
    pub fn stats(&self) -> HubStats {
        let store = self.router.store();
        HubStats {
            sessions: self.registry.len(),
            counter: store.current_counter(),
            history_len: store.current_history().len(),
        }
    }

    /// Start the worker task
    pub fn spawn(self) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        (HubHandle { tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<HubEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle_event(event);
        }
        debug!("Hub stopped with {} sessions", self.registry.len());
    }
}

/// Cloneable sender side of the hub queue
#[derive(Debug, Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

impl HubHandle {
    fn send(&self, event: HubEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| SyncError::internal("Hub is not running"))
    }

    /// Report a new connection
    pub fn connect(&self, handle: ConnectionHandle, outbound: Outbound) -> Result<()> {
        self.send(HubEvent::Connected { handle, outbound })
    }

    /// Report a closed connection
    pub fn disconnect(&self, handle: ConnectionHandle) -> Result<()> {
        self.send(HubEvent::Disconnected { handle })
    }

    /// Forward a mutation request
    pub fn dispatch(&self, handle: ConnectionHandle, event: InboundEvent) -> Result<()> {
        self.send(HubEvent::Inbound { handle, event })
    }

    /// Ask the hub for its statistics
    pub async fn stats(&self) -> Result<HubStats> {
        let (reply, rx) = oneshot::channel();
        self.send(HubEvent::Stats { reply })?;
        rx.await
            .map_err(|_| SyncError::internal("Hub dropped stats request"))
    }
}
