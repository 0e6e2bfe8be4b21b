//! In-memory transport capturing outbound frames.
//!
//! Stands in for a real byte channel in tests: records every frame for
//! inspection and can be armed to fail the next send.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::error::{Result, WireError};
use crate::transport::Transport;

/// One captured outbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SentFrame {
    Text(String),
    Binary(Vec<u8>),
}

/// Transport double that records frames instead of sending them.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<SentFrame>>,
    fail_next: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next send fail with a transport error.
    pub fn fail_next_send(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Frames captured so far, in send order.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    fn record(&self, frame: SentFrame) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(WireError::Transport("injected send failure".to_string()));
        }
        self.sent.lock().push(frame);
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn send_text(&self, frame: &str) -> Result<()> {
        self.record(SentFrame::Text(frame.to_string()))
    }

    fn send_binary(&self, frame: &[u8]) -> Result<()> {
        self.record(SentFrame::Binary(frame.to_vec()))
    }
}
