//! Protocol layer - wire primitives, message envelopes, and push events.
//!
//! [`wire`] holds the little-endian read/write primitives the binary codec
//! is built on. [`envelope`] frames complete messages: the type tag, request
//! id, and result code that wrap every request and response. [`event`]
//! classifies unsolicited text frames pushed by the peer.

pub mod envelope;
pub mod event;
pub mod wire;
