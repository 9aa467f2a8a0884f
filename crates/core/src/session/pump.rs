use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::dispatch::Dispatcher;
use crate::jobs::JobCorrelator;
use crate::protocol::{Outbound, Packet};
use crate::transport::Transport;

use super::{PumpStatus, SessionError};

/// Packets dispatched per pump iteration before yielding.
const MAX_DRAIN: usize = 64;

struct SessionInner {
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    jobs: JobCorrelator,
    poll_wait: Duration,
    closed: watch::Sender<bool>,
}

/// A single connection to the remote.
///
/// Cheaply cloneable; the pump and the flow hold clones of the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session over `transport` with the default decoder set.
    ///
    /// `poll_wait` bounds how long one pump iteration waits for inbound data.
    pub fn new(transport: Arc<dyn Transport>, poll_wait: Duration) -> Self {
        let jobs = JobCorrelator::new(Arc::clone(&transport));
        let dispatcher = Dispatcher::with_default_decoders(jobs.clone());
        let (closed, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionInner {
                transport,
                dispatcher,
                jobs,
                poll_wait,
                closed,
            }),
        }
    }

    pub async fn connect(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        self.inner.transport.connect().await?;
        info!("Connected via {}", self.inner.transport.name());
        Ok(())
    }

    /// Send an uncorrelated message.
    pub async fn send<M: Outbound>(&self, message: &M) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }
        let packet = Packet::notification(message)?;
        debug!("Sending {}", M::KIND);
        self.inner.transport.send(packet).await?;
        Ok(())
    }

    pub fn jobs(&self) -> &JobCorrelator {
        &self.inner.jobs
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn is_closed(&self) -> bool {
        *self.inner.closed.borrow()
    }

    /// Receiver that observes `true` once the session closes.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.inner.closed.subscribe()
    }

    /// Wait up to the poll wait for inbound data, then dispatch it and
    /// whatever else is already queued.
    pub async fn pump_once(&self) -> PumpStatus {
        if self.is_closed() {
            return PumpStatus::Closed;
        }

        let transport = &self.inner.transport;
        let first = match tokio::time::timeout(self.inner.poll_wait, transport.recv()).await {
            Err(_) => return PumpStatus::Idle,
            Ok(None) => {
                info!("Transport {} disconnected", transport.name());
                self.close().await;
                return PumpStatus::Closed;
            }
            Ok(Some(packet)) => packet,
        };

        let mut dispatched = 1;
        self.inner.dispatcher.dispatch(&first);

        while dispatched < MAX_DRAIN {
            match transport.recv().now_or_never() {
                Some(Some(packet)) => {
                    self.inner.dispatcher.dispatch(&packet);
                    dispatched += 1;
                }
                Some(None) => {
                    info!("Transport {} disconnected", transport.name());
                    self.close().await;
                    return PumpStatus::Closed;
                }
                None => break,
            }
        }

        trace!("Pump dispatched {} packet(s)", dispatched);
        // Let tasks woken by the dispatched messages run before the next wait.
        tokio::task::yield_now().await;
        PumpStatus::Dispatched(dispatched)
    }

    /// Pump until the session closes.
    pub async fn run_pump(self) {
        while self.pump_once().await != PumpStatus::Closed {}
        debug!("Pump stopped");
    }

    /// Close the session: cancel every pending job and close the transport.
    ///
    /// Idempotent.
    pub async fn close(&self) {
        if self.inner.closed.send_replace(true) {
            return;
        }
        self.inner.jobs.cancel_all();
        self.inner.transport.close().await;
        info!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobError;
    use crate::protocol::{
        AccountInfo, ChangeStatus, GetAppOwnershipTicket, JobId, MessageKind,
        OwnershipTicketResponse, ResultCode, PERSONA_STATE_ONLINE,
    };
    use crate::testing::RecordingTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn session() -> (Session, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let session = Session::new(transport.clone(), Duration::from_millis(50));
        (session, transport)
    }

    fn account_info() -> Packet {
        Packet::response(MessageKind::ClientAccountInfo, &AccountInfo::default(), JobId::NONE)
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_pump_idle_without_traffic() {
        let (session, _transport) = session();
        assert_eq!(session.pump_once().await, PumpStatus::Idle);
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_pump_drains_queued_packets() {
        let (session, transport) = session();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        session
            .dispatcher()
            .subscribe(MessageKind::ClientAccountInfo, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        for _ in 0..3 {
            transport.push_inbound(account_info());
        }

        assert_eq!(session.pump_once().await, PumpStatus::Dispatched(3));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_disconnect_closes_and_cancels_jobs() {
        let (session, transport) = session();
        let handle = session
            .jobs()
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();
        let mut closed = session.closed();

        transport.disconnect();
        assert_eq!(session.pump_once().await, PumpStatus::Closed);

        assert!(session.is_closed());
        assert!(*closed.borrow_and_update());
        assert!(matches!(handle.await, Err(JobError::SessionClosed)));
        assert!(transport.is_closed());
    }

    #[tokio::test]
    async fn test_pump_resolves_job_response() {
        let (session, transport) = session();
        let handle = session
            .jobs()
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();

        transport.push_inbound(
            Packet::response(
                MessageKind::ClientGetAppOwnershipTicketResponse,
                &OwnershipTicketResponse {
                    eresult: ResultCode::OK,
                    app_id: 730,
                    ticket: vec![9],
                },
                handle.job_id(),
            )
            .unwrap(),
        );

        assert_eq!(session.pump_once().await, PumpStatus::Dispatched(1));
        assert!(handle.await.is_ok());
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (session, transport) = session();
        session
            .send(&ChangeStatus {
                persona_state: PERSONA_STATE_ONLINE,
            })
            .await
            .unwrap();
        assert_eq!(transport.sent().len(), 1);

        session.close().await;
        session.close().await;

        let result = session
            .send(&ChangeStatus {
                persona_state: PERSONA_STATE_ONLINE,
            })
            .await;
        assert!(matches!(result, Err(SessionError::Closed)));
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(session.pump_once().await, PumpStatus::Closed);
    }

    #[tokio::test]
    async fn test_run_pump_stops_on_disconnect() {
        let (session, transport) = session();
        transport.push_inbound(account_info());
        transport.disconnect();
        session.clone().run_pump().await;
        assert!(session.is_closed());
    }
}
