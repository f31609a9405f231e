//! Outbound side of the connection.
//!
//! The engine only needs to enqueue lines; the inbound side is any stream of
//! decoded lines handed to [`Client::run`](crate::Client::run). Enqueueing
//! never blocks on the network.

#[cfg(feature = "transport")]
mod tcp;

#[cfg(feature = "transport")]
pub use self::tcp::{LineReader, TcpTransport};

use crate::message::Message;

/// Maximum inbound line length, tags included.
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// A connection the engine can write to.
pub trait Transport: Send + Sync {
    /// Queue a line behind everything already waiting.
    fn send(&self, msg: &Message);

    /// Queue a line ahead of ordinary traffic.
    fn priority_send(&self, msg: &Message);

    fn is_connected(&self) -> bool;

    /// Flush what is queued and close the connection.
    fn disconnect(&self);
}
