//! Transport seam between the request manager and the byte channel.
//!
//! The manager only needs to push outbound frames; inbound frames are fed
//! back to it by whoever owns the receive side (see
//! [`RequestManager::on_text`](crate::RequestManager::on_text) and
//! [`on_binary`](crate::RequestManager::on_binary)). Implementations must be
//! callable from any thread.

mod memory;

pub use memory::{MemoryTransport, SentFrame};

use crate::error::Result;

/// Outbound half of a session's byte channel.
pub trait Transport: Send + Sync {
    /// Send one complete text frame.
    fn send_text(&self, frame: &str) -> Result<()>;

    /// Send one complete binary frame.
    fn send_binary(&self, frame: &[u8]) -> Result<()>;
}
