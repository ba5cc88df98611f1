//! Network side of the client.
//!
//! ## Protocol
//!
//! 1. Log in with a form post and receive a signed user id
//! 2. Fetch the full account snapshot as one CBOR payload
//! 3. Submit item changes as CBOR operation batches
//! 4. Keep a listener socket open; the server pushes a refresh frame
//!    whenever account state changes and the client sends heartbeats

mod client;
mod error;
pub mod protocol;
mod realtime;
mod transport;

pub use client::{GrocerClient, ListsUpdated};
pub use error::SyncError;
pub use realtime::{
    listener_url, ConnectionState, Connector, PushHandler, RealtimeChannel, RealtimeConfig,
    ReconnectPolicy, Socket, WsConnector, WsSocket, DEFAULT_HEARTBEAT_INTERVAL,
    MIN_HEARTBEAT_INTERVAL, MIN_RECONNECT_DELAY,
};
pub use transport::{Acknowledgement, Credentials, HttpTransport, Session, Transport};
