//! Transport that records outbound packets and replays queued inbound ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::protocol::Packet;
use crate::transport::{Transport, TransportError};

use super::inbox::Inbox;

/// Transport with no remote behind it.
///
/// Outbound packets are recorded for assertions; inbound packets are whatever
/// the test queues with `push_inbound`.
pub struct RecordingTransport {
    sent: Mutex<Vec<Packet>>,
    inbox: Inbox,
    fail_sends: AtomicBool,
    closed: AtomicBool,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbox: Inbox::new(),
            fail_sends: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Packets sent so far, in order.
    pub fn sent(&self) -> Vec<Packet> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Make subsequent sends fail with `NotConnected`.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Queue an inbound packet.
    pub fn push_inbound(&self, packet: Packet) {
        self.inbox.push(packet);
    }

    /// Simulate the remote dropping the connection.
    pub fn disconnect(&self) {
        self.inbox.disconnect();
    }

    /// Whether `close` was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, packet: Packet) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet);
        Ok(())
    }

    async fn recv(&self) -> Option<Packet> {
        self.inbox.recv().await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.inbox.disconnect();
    }
}
