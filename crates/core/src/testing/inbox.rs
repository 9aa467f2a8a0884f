//! Inbound packet queue shared by the test transports.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::protocol::Packet;

pub(crate) struct Inbox {
    tx: Mutex<Option<mpsc::UnboundedSender<Packet>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Packet>>,
}

impl Inbox {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Queue a packet. Returns false once disconnected.
    pub(crate) fn push(&self, packet: Packet) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|tx| tx.send(packet).is_ok())
    }

    /// Drop the sending side. Queued packets are still delivered, then `recv`
    /// returns `None`.
    pub(crate) fn disconnect(&self) {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub(crate) fn is_disconnected(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    pub(crate) async fn recv(&self) -> Option<Packet> {
        self.rx.lock().await.recv().await
    }
}
