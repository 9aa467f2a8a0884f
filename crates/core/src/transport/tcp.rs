//! Plain TCP transport.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::protocol::Packet;

use super::frame::{decode_frame_header, encode_frame};
use super::{Transport, TransportError};

/// Inbound packets buffered between the socket reader and the pump.
const INBOUND_BUFFER: usize = 64;

/// TCP transport using length-prefixed frames.
///
/// A background task owns the read half and forwards decoded packets over a
/// channel, which keeps `recv` cancel-safe.
pub struct TcpTransport {
    config: ConnectionConfig,
    writer: Mutex<Option<OwnedWriteHalf>>,
    inbound: Mutex<Option<mpsc::Receiver<Packet>>>,
    reader: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TcpTransport {
    /// Create a new, unconnected TCP transport.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            writer: Mutex::new(None),
            inbound: Mutex::new(None),
            reader: std::sync::Mutex::new(None),
        }
    }

    async fn read_loop(mut read: OwnedReadHalf, tx: mpsc::Sender<Packet>) {
        loop {
            let mut header = [0u8; 8];
            if let Err(e) = read.read_exact(&mut header).await {
                debug!("TCP read ended: {}", e);
                break;
            }

            let len = match decode_frame_header(header) {
                Ok(len) => len,
                Err(e) => {
                    warn!("Dropping connection on malformed frame: {}", e);
                    break;
                }
            };

            let mut payload = vec![0u8; len];
            if let Err(e) = read.read_exact(&mut payload).await {
                debug!("TCP read ended mid-frame: {}", e);
                break;
            }

            match Packet::decode(&payload) {
                Ok(packet) => {
                    if tx.send(packet).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Dropping connection on malformed packet: {}", e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn name(&self) -> &str {
        "tcp"
    }

    async fn connect(&self) -> Result<(), TransportError> {
        let timeout_secs = self.config.connect_timeout_secs;
        let stream = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            TcpStream::connect(&self.config.server),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout(timeout_secs))?
        .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", self.config.server, e)))?;

        stream.set_nodelay(true)?;
        let (read, write) = stream.into_split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        *self.writer.lock().await = Some(write);
        *self.inbound.lock().await = Some(rx);

        let task = tokio::spawn(Self::read_loop(read, tx));
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(old) = reader.replace(task) {
                old.abort();
            }
        }

        debug!("TCP transport connected to {}", self.config.server);
        Ok(())
    }

    async fn send(&self, packet: Packet) -> Result<(), TransportError> {
        let frame = encode_frame(&packet)?;
        let mut writer = self.writer.lock().await;
        let write = writer.as_mut().ok_or(TransportError::NotConnected)?;
        write.write_all(&frame).await?;
        Ok(())
    }

    async fn recv(&self) -> Option<Packet> {
        let mut inbound = self.inbound.lock().await;
        inbound.as_mut()?.recv().await
    }

    async fn close(&self) {
        if let Some(mut write) = self.writer.lock().await.take() {
            let _ = write.shutdown().await;
        }
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(task) = reader.take() {
                task.abort();
            }
        }
    }
}
