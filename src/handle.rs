//! Response handles - the caller's side of one in-flight request.
//!
//! A handle is a single-use receiver: poll it with [`ResponseHandle::is_ready`]
//! or [`try_take`](ResponseHandle::try_take), or block with
//! [`take`](ResponseHandle::take). Whatever the path, a handle yields exactly
//! one [`Response`]; taking it twice is a programming error and panics.

use std::sync::Weak;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::debug;

use crate::manager::ManagerInner;
use crate::protocol::envelope::{Response, ResultCode};

/// Pending result of one request issued through a
/// [`RequestManager`](crate::RequestManager).
pub struct ResponseHandle {
    request_id: u32,
    rx: Receiver<Response>,
    manager: Weak<ManagerInner>,
    taken: bool,
}

impl ResponseHandle {
    pub(crate) fn new(
        request_id: u32,
        rx: Receiver<Response>,
        manager: Weak<ManagerInner>,
    ) -> Self {
        Self {
            request_id,
            rx,
            manager,
            taken: false,
        }
    }

    /// Correlation id of the request this handle belongs to.
    pub fn request_id(&self) -> u32 {
        self.request_id
    }

    /// Whether a response is waiting. Never blocks.
    pub fn is_ready(&self) -> bool {
        !self.taken && !self.rx.is_empty()
    }

    /// Take the response if one is already waiting. Never blocks.
    ///
    /// # Panics
    ///
    /// Panics if the response was already taken.
    pub fn try_take(&mut self) -> Option<Response> {
        self.assert_not_taken();
        match self.rx.try_recv() {
            Ok(response) => {
                self.taken = true;
                Some(response)
            }
            Err(_) => None,
        }
    }

    /// Block until the response arrives or `timeout` elapses.
    ///
    /// On timeout the pending entry is withdrawn from the manager, so a
    /// response arriving later is dropped, and a synthesized
    /// [`ResultCode::Timeout`] response is returned. If the manager was
    /// dropped while waiting, the result is [`ResultCode::Canceled`].
    ///
    /// # Panics
    ///
    /// Panics if the response was already taken.
    pub fn take(&mut self, timeout: Duration) -> Response {
        self.assert_not_taken();
        self.taken = true;
        match self.rx.recv_timeout(timeout) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                if let Some(manager) = self.manager.upgrade() {
                    manager.abandon(self.request_id);
                }
                debug!(request_id = self.request_id, "request timed out");
                Response::synthetic(self.request_id, ResultCode::Timeout)
            }
            Err(RecvTimeoutError::Disconnected) => {
                Response::synthetic(self.request_id, ResultCode::Canceled)
            }
        }
    }

    fn assert_not_taken(&self) {
        assert!(
            !self.taken,
            "response for request {} already taken",
            self.request_id
        );
    }
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("request_id", &self.request_id)
            .field("taken", &self.taken)
            .finish()
    }
}
