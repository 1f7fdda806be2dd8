//! Counter and chat sync server
//!
//! ## Layout
//!
//! - **Store**: the counter and the append-only chat history
//! - **Registry**: live sessions and their outbound queues
//! - **Router**: applies mutations and broadcasts the results
//! - **Catch-up**: state snapshot for a newly admitted session
//! - **Hub**: the single worker that serializes all of the above
//! - **QUIC server / connection handler**: transport, one sync stream per client

pub mod catch_up;
pub mod connection_handler;
pub mod hub;
pub mod quic_server;
pub mod registry;
pub mod router;
pub mod store;

pub use connection_handler::ConnectionHandler;
pub use hub::{Hub, HubEvent, HubHandle, HubStats};
pub use quic_server::{ServerStats, SyncServer};
pub use registry::{ConnectionHandle, Session, SessionRegistry};
pub use router::{EventRouter, InboundEvent};
pub use store::SharedState;
