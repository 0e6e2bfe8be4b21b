//! Request manager - correlation of concurrent requests with their
//! responses.
//!
//! Every outbound request is assigned a fresh id from an atomic counter and
//! parked in a pending table keyed by that id. Inbound frames are fed in via
//! [`RequestManager::on_text`] / [`RequestManager::on_binary`]; the envelope
//! header identifies the waiting entry, which is removed under the lock and
//! completed outside it. Each entry is completed at most once: a response, a
//! cancellation, or a shutdown, whichever removes it first.
//!
//! # Design
//!
//! Serialization happens before the pending lock is taken and body decoding
//! happens after it is released, so the lock only ever guards table
//! membership. Completion uses a single-slot channel per request; the
//! matching [`ResponseHandle`] blocks on its receiving end.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::handle::ResponseHandle;
use crate::meta::{TypeRegistry, WireStruct};
use crate::protocol::envelope::{
    decode_response_body_binary, decode_response_body_json, encode_request_binary,
    encode_request_json, peek_response_binary, peek_response_json, Response, ResultCode,
};
use crate::protocol::event::{parse_text_event, Event};
use crate::transport::Transport;

/// Which wire format outbound requests use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    Binary,
}

struct PendingOperation {
    tx: Sender<Response>,
}

pub(crate) struct ManagerInner {
    registry: TypeRegistry,
    transport: Arc<dyn Transport>,
    format: WireFormat,
    next_id: AtomicU32,
    pending: Mutex<HashMap<u32, PendingOperation>>,
}

impl ManagerInner {
    /// Remove a pending entry without completing it. Used by the handle's
    /// timeout path, where nobody is left to receive a completion.
    pub(crate) fn abandon(&self, request_id: u32) {
        if self.pending.lock().remove(&request_id).is_some() {
            debug!(request_id, "abandoned pending request");
        }
    }
}

/// Issues requests over a [`Transport`] and routes responses back to their
/// callers.
///
/// Cloning is cheap and shares the pending table; feed inbound frames from
/// the read loop thread while other threads send.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use scenewire::{MemoryTransport, RequestManager, TypeRegistry, WireFormat};
///
/// let transport = Arc::new(MemoryTransport::new());
/// let manager = RequestManager::builder(transport)
///     .registry(TypeRegistry::new())
///     .format(WireFormat::Json)
///     .build();
/// ```
#[derive(Clone)]
pub struct RequestManager {
    inner: Arc<ManagerInner>,
}

/// Builder for [`RequestManager`].
pub struct RequestManagerBuilder {
    registry: TypeRegistry,
    transport: Arc<dyn Transport>,
    format: WireFormat,
    first_request_id: u32,
}

impl RequestManagerBuilder {
    /// Registry used to decode response and event bodies.
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Wire format for outbound requests. Defaults to JSON.
    pub fn format(mut self, format: WireFormat) -> Self {
        self.format = format;
        self
    }

    /// First request id to issue. Defaults to 1.
    pub fn first_request_id(mut self, id: u32) -> Self {
        self.first_request_id = id;
        self
    }

    pub fn build(self) -> RequestManager {
        RequestManager {
            inner: Arc::new(ManagerInner {
                registry: self.registry,
                transport: self.transport,
                format: self.format,
                next_id: AtomicU32::new(self.first_request_id),
                pending: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl RequestManager {
    pub fn builder(transport: Arc<dyn Transport>) -> RequestManagerBuilder {
        RequestManagerBuilder {
            registry: TypeRegistry::new(),
            transport,
            format: WireFormat::default(),
            first_request_id: 1,
        }
    }

    /// Send one request and return the handle its response arrives on.
    ///
    /// Never returns an error: failures before the request leaves the
    /// process (serialization, transport) complete the handle immediately
    /// with the matching failure code.
    pub fn send(&self, body: &mut dyn WireStruct) -> ResponseHandle {
        let inner = &self.inner;
        let request_id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = bounded(1);
        let handle = ResponseHandle::new(request_id, rx, Arc::downgrade(inner));

        // Serialize outside the pending lock.
        let frame = match inner.format {
            WireFormat::Json => encode_request_json(request_id, body).map(Frame::Text),
            WireFormat::Binary => encode_request_binary(request_id, body).map(Frame::Binary),
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!(request_id, error = %err, "request failed to serialize");
                let _ = tx.send(Response::synthetic(request_id, ResultCode::MalformedParameters));
                return handle;
            }
        };

        debug!(
            request_id,
            type_name = body.descriptor().name,
            "sending request"
        );

        // Park the entry before the frame leaves, so a fast response on
        // another thread always finds it.
        inner
            .pending
            .lock()
            .insert(request_id, PendingOperation { tx: tx.clone() });

        let sent = match &frame {
            Frame::Text(text) => inner.transport.send_text(text),
            Frame::Binary(bytes) => inner.transport.send_binary(bytes),
        };
        if let Err(err) = sent {
            warn!(request_id, error = %err, "transport rejected request");
            inner.pending.lock().remove(&request_id);
            let _ = tx.send(Response::synthetic(request_id, ResultCode::TransportFailure));
        }

        handle
    }

    /// Feed one inbound text frame.
    ///
    /// Frames with a response envelope complete the matching pending
    /// request; anything else is classified as an unsolicited [`Event`] and
    /// returned to the caller.
    pub fn on_text(&self, frame: &str) -> Option<Event> {
        match peek_response_json(frame) {
            Ok((head, root)) => {
                let Some(pending) = self.take_pending(head.request_id) else {
                    debug!(
                        request_id = head.request_id,
                        "response for unknown or already-completed request"
                    );
                    return None;
                };
                // Decode outside the lock.
                let response = decode_response_body_json(&self.inner.registry, &head, &root);
                let _ = pending.tx.send(response);
                None
            }
            Err(_) => parse_text_event(&self.inner.registry, frame),
        }
    }

    /// Feed one inbound binary frame. Binary frames are always responses.
    pub fn on_binary(&self, frame: &[u8]) {
        let (head, body_offset) = match peek_response_binary(frame) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "dropping unparseable binary frame");
                return;
            }
        };
        let Some(pending) = self.take_pending(head.request_id) else {
            debug!(
                request_id = head.request_id,
                "response for unknown or already-completed request"
            );
            return;
        };
        let response =
            decode_response_body_binary(&self.inner.registry, &head, frame, body_offset);
        let _ = pending.tx.send(response);
    }

    /// Cancel one in-flight request.
    ///
    /// The waiting handle completes with [`ResultCode::Canceled`]; the peer
    /// is not notified, and a response arriving later is dropped. Returns
    /// whether the request was still pending.
    pub fn cancel(&self, request_id: u32) -> bool {
        let Some(pending) = self.take_pending(request_id) else {
            return false;
        };
        debug!(request_id, "canceled request");
        let _ = pending
            .tx
            .send(Response::synthetic(request_id, ResultCode::Canceled));
        true
    }

    /// Complete every in-flight request with [`ResultCode::Canceled`].
    pub fn shutdown(&self) {
        let drained: Vec<(u32, PendingOperation)> =
            self.inner.pending.lock().drain().collect();
        if !drained.is_empty() {
            debug!(count = drained.len(), "shutdown canceled pending requests");
        }
        for (request_id, pending) in drained {
            let _ = pending
                .tx
                .send(Response::synthetic(request_id, ResultCode::Canceled));
        }
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    fn take_pending(&self, request_id: u32) -> Option<PendingOperation> {
        self.inner.pending.lock().remove(&request_id)
    }
}

enum Frame {
    Text(String),
    Binary(bytes::Bytes),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::envelope::encode_response_json;
    use crate::transport::{MemoryTransport, SentFrame};
    use std::time::Duration;

    crate::wire_struct! {
        pub struct CreateQuad: 0x7301 {
            name: String,
        }
    }

    crate::wire_struct! {
        pub struct QuadCreated: 0x7302 {
            node_id: u64,
        }
    }

    fn manager_with_transport() -> (RequestManager, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = TypeRegistry::new();
        registry.register(CreateQuad::descriptor());
        registry.register(QuadCreated::descriptor());
        let manager = RequestManager::builder(transport.clone())
            .registry(registry)
            .build();
        (manager, transport)
    }

    #[test]
    fn test_request_ids_are_unique_and_increasing() {
        let (manager, _transport) = manager_with_transport();
        let a = manager.send(&mut CreateQuad::default());
        let b = manager.send(&mut CreateQuad::default());
        assert!(b.request_id() > a.request_id());
        assert_eq!(manager.pending_count(), 2);
    }

    #[test]
    fn test_first_request_id_is_configurable() {
        let transport = Arc::new(MemoryTransport::new());
        let manager = RequestManager::builder(transport)
            .first_request_id(100)
            .build();
        let handle = manager.send(&mut CreateQuad::default());
        assert_eq!(handle.request_id(), 100);
    }

    #[test]
    fn test_response_completes_matching_request() {
        let (manager, transport) = manager_with_transport();
        let mut handle = manager.send(&mut CreateQuad {
            name: "quad-1".to_string(),
        });
        assert_eq!(transport.sent_count(), 1);

        let mut body = QuadCreated { node_id: 99 };
        let frame =
            encode_response_json(handle.request_id(), ResultCode::Success, &mut body).unwrap();
        assert!(manager.on_text(&frame).is_none());

        let response = handle.take(Duration::from_millis(100));
        assert!(response.is_success());
        assert_eq!(response.payload_as::<QuadCreated>().unwrap().node_id, 99);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_late_response_after_cancel_is_dropped() {
        let (manager, _transport) = manager_with_transport();
        let mut handle = manager.send(&mut CreateQuad::default());
        let id = handle.request_id();

        assert!(manager.cancel(id));
        assert!(!manager.cancel(id));

        let response = handle.take(Duration::from_millis(100));
        assert_eq!(response.result, ResultCode::Canceled);

        // The real response arrives after cancellation: nobody is waiting.
        let mut body = QuadCreated { node_id: 1 };
        let frame = encode_response_json(id, ResultCode::Success, &mut body).unwrap();
        assert!(manager.on_text(&frame).is_none());
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_transport_failure_completes_immediately() {
        let (manager, transport) = manager_with_transport();
        transport.fail_next_send();

        let mut handle = manager.send(&mut CreateQuad::default());
        let response = handle.take(Duration::from_millis(100));
        assert_eq!(response.result, ResultCode::TransportFailure);
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_shutdown_cancels_all_pending() {
        let (manager, _transport) = manager_with_transport();
        let mut a = manager.send(&mut CreateQuad::default());
        let mut b = manager.send(&mut CreateQuad::default());

        manager.shutdown();
        assert_eq!(manager.pending_count(), 0);
        assert_eq!(a.take(Duration::from_millis(100)).result, ResultCode::Canceled);
        assert_eq!(b.take(Duration::from_millis(100)).result, ResultCode::Canceled);
    }

    #[test]
    fn test_binary_format_sends_binary_frames() {
        let transport = Arc::new(MemoryTransport::new());
        let mut registry = TypeRegistry::new();
        registry.register(CreateQuad::descriptor());
        let manager = RequestManager::builder(transport.clone())
            .registry(registry)
            .format(WireFormat::Binary)
            .build();

        let _handle = manager.send(&mut CreateQuad {
            name: "x".to_string(),
        });
        match &transport.sent()[..] {
            [SentFrame::Binary(_)] => {}
            other => panic!("unexpected frames {other:?}"),
        }
    }

    #[test]
    fn test_unsolicited_event_passes_through() {
        let (manager, _transport) = manager_with_transport();
        let event = manager.on_text("disconnect:2:going away").unwrap();
        assert!(matches!(event, Event::Disconnected { code: 2, .. }));
    }
}
