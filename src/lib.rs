//! scenewire - typed message codec and request/response correlation for a
//! remote compositing service.
//!
//! The crate has three layers:
//!
//! - **Metadata** ([`meta`]): every wire-visible struct and enum declares a
//!   static field table via the [`wire_struct!`] and [`wire_enum!`] macros;
//!   the tables are collected into an explicit [`TypeRegistry`].
//! - **Codecs** ([`codec`]): two interchangeable formats, JSON text and a
//!   compact little-endian binary form, both driven field-by-field from the
//!   metadata tables. A value encoded in one format decodes field-wise equal
//!   through the other.
//! - **Correlation** ([`RequestManager`]): requests are wrapped in an
//!   envelope carrying a type tag and a fresh request id; inbound frames are
//!   matched back to the waiting [`ResponseHandle`], which supports polling,
//!   blocking with a timeout, and cancellation. Each request completes at
//!   most once.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use scenewire::{MemoryTransport, RequestManager, TypeRegistry};
//!
//! scenewire::wire_struct! {
//!     pub struct CreateNode: 0x1001 {
//!         name: String,
//!         optional tags: Vec<String>,
//!     }
//! }
//!
//! scenewire::wire_struct! {
//!     pub struct NodeCreated: 0x1002 {
//!         node_id: u64,
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register(CreateNode::descriptor());
//! registry.register(NodeCreated::descriptor());
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let manager = RequestManager::builder(transport).registry(registry).build();
//!
//! let mut handle = manager.send(&mut CreateNode {
//!     name: "quad-1".to_string(),
//!     tags: vec![],
//! });
//! // ... feed inbound frames via manager.on_text / manager.on_binary ...
//! let response = handle.take(Duration::from_secs(1));
//! if let Some(created) = response.payload_as::<NodeCreated>() {
//!     println!("node {}", created.node_id);
//! }
//! ```

pub mod codec;
pub mod error;
pub mod meta;
pub mod protocol;
pub mod transport;

mod handle;
mod manager;

pub use error::{Result, WireError};
pub use handle::ResponseHandle;
pub use manager::{RequestManager, RequestManagerBuilder, WireFormat};
pub use meta::{FieldKind, KvMap, ObjectRef, TypeRegistry, WireEnum, WireStruct};
pub use protocol::envelope::{Response, ResponseHead, ResultCode};
pub use protocol::event::Event;
pub use transport::{MemoryTransport, SentFrame, Transport};
