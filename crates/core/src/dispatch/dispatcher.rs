//! Inbound packet routing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::jobs::{JobCorrelator, JobError};
use crate::protocol::{Inbound, JobId, MessageKind, Packet};

use super::registry::{default_decoders, DecodeFn};

/// Callback invoked for broadcast messages. Runs synchronously inside
/// `dispatch`, so it must not block.
pub type Handler = Arc<dyn Fn(&Inbound) + Send + Sync>;

/// Identifies a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// What `dispatch` did with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The kind tag is not known to the client.
    UnknownKind(u32),
    /// Known kind without a registered decoder.
    NoDecoder(MessageKind),
    /// The body failed to decode.
    Malformed(MessageKind),
    /// Delivered to the pending job.
    Resolved(JobId),
    /// Delivered to this many subscribers (possibly zero).
    Broadcast(usize),
}

/// Classifies inbound packets and routes them to pending jobs or subscribers.
pub struct Dispatcher {
    jobs: JobCorrelator,
    decoders: RwLock<HashMap<MessageKind, DecodeFn>>,
    subscribers: RwLock<HashMap<MessageKind, Vec<(SubscriptionId, Handler)>>>,
    next_subscription: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher with no decoders.
    pub fn new(jobs: JobCorrelator) -> Self {
        Self {
            jobs,
            decoders: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Create a dispatcher with decoders for every inbound kind the flow uses.
    pub fn with_default_decoders(jobs: JobCorrelator) -> Self {
        let dispatcher = Self::new(jobs);
        for (kind, decode) in default_decoders() {
            dispatcher.register(kind, decode);
        }
        dispatcher
    }

    /// Install (or replace) the decoder for `kind`.
    pub fn register(&self, kind: MessageKind, decode: DecodeFn) {
        self.decoders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, decode);
    }

    /// Remove the decoder for `kind`. Packets of that kind are then discarded.
    pub fn unregister(&self, kind: MessageKind) {
        self.decoders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }

    /// Whether packets of `kind` can be decoded.
    pub fn supports(&self, kind: MessageKind) -> bool {
        self.decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&kind)
    }

    /// Register `handler` for broadcast messages of `kind`.
    ///
    /// Handlers of one kind run in subscription order.
    pub fn subscribe<F>(&self, kind: MessageKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Inbound) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Route one inbound packet.
    ///
    /// A packet whose target job matches a pending job awaiting exactly this
    /// kind resolves that job and is not broadcast. Everything else that
    /// decodes goes to the subscribers of its kind.
    pub fn dispatch(&self, packet: &Packet) -> DispatchOutcome {
        let Some(kind) = packet.message_kind() else {
            trace!("Discarding packet with unknown kind {}", packet.kind);
            return DispatchOutcome::UnknownKind(packet.kind);
        };

        let decode = self
            .decoders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied();
        let Some(decode) = decode else {
            trace!("Discarding {}: no decoder registered", kind);
            return DispatchOutcome::NoDecoder(kind);
        };

        let target = packet.target_job;
        let message = match decode(&packet.body) {
            Ok(message) => message,
            Err(e) => {
                if !target.is_none() && self.jobs.claims(target, kind) {
                    warn!("Failing job {} on malformed {}: {}", target, kind, e);
                    self.jobs.fail(
                        target,
                        JobError::Malformed {
                            job_id: target,
                            kind,
                            reason: e.to_string(),
                        },
                    );
                } else {
                    warn!("Discarding malformed {}: {}", kind, e);
                }
                return DispatchOutcome::Malformed(kind);
            }
        };

        let message = if target.is_none() {
            message
        } else {
            match self.jobs.resolve(target, kind, message) {
                Ok(()) => {
                    debug!("{} resolved job {}", kind, target);
                    return DispatchOutcome::Resolved(target);
                }
                Err(unclaimed) => {
                    debug!("{} for job {} not claimed, broadcasting", kind, target);
                    unclaimed
                }
            }
        };

        // Clone the handler list so handlers may subscribe without deadlocking.
        let handlers: Vec<Handler> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map(|subs| subs.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(&message);
        }
        DispatchOutcome::Broadcast(handlers.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{
        AccountInfo, GetAppOwnershipTicket, LoggedOff, OwnershipTicketResponse, ResultCode,
    };
    use crate::testing::RecordingTransport;
    use std::sync::Mutex;

    fn dispatcher() -> (Dispatcher, JobCorrelator) {
        let jobs = JobCorrelator::new(Arc::new(RecordingTransport::new()));
        (Dispatcher::with_default_decoders(jobs.clone()), jobs)
    }

    fn ticket_packet(target: JobId, app_id: u32) -> Packet {
        Packet::response(
            MessageKind::ClientGetAppOwnershipTicketResponse,
            &OwnershipTicketResponse {
                eresult: ResultCode::OK,
                app_id,
                ticket: vec![1, 2, 3],
            },
            target,
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_kind_is_discarded() {
        let (dispatcher, _) = dispatcher();
        let packet = Packet {
            kind: 4,
            source_job: JobId::NONE,
            target_job: JobId::NONE,
            body: vec![],
        };
        assert_eq!(dispatcher.dispatch(&packet), DispatchOutcome::UnknownKind(4));
    }

    #[test]
    fn test_subscribers_run_in_order() {
        let (dispatcher, _) = dispatcher();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let calls = Arc::clone(&calls);
            dispatcher.subscribe(MessageKind::ClientAccountInfo, move |_| {
                calls.lock().unwrap().push(label);
            });
        }

        let packet = Packet::response(
            MessageKind::ClientAccountInfo,
            &AccountInfo::default(),
            JobId::NONE,
        )
        .unwrap();
        assert_eq!(dispatcher.dispatch(&packet), DispatchOutcome::Broadcast(3));
        assert_eq!(*calls.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_subscribers_only_see_their_kind() {
        let (dispatcher, _) = dispatcher();
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        dispatcher.subscribe(MessageKind::ClientLoggedOff, move |_| {
            *counter.lock().unwrap() += 1;
        });

        let info = Packet::response(
            MessageKind::ClientAccountInfo,
            &AccountInfo::default(),
            JobId::NONE,
        )
        .unwrap();
        dispatcher.dispatch(&info);
        assert_eq!(*seen.lock().unwrap(), 0);

        let logged_off = Packet::response(
            MessageKind::ClientLoggedOff,
            &LoggedOff {
                eresult: ResultCode::LOGGED_IN_ELSEWHERE,
            },
            JobId::NONE,
        )
        .unwrap();
        dispatcher.dispatch(&logged_off);
        assert_eq!(*seen.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_matching_job_consumes_message() {
        let (dispatcher, jobs) = dispatcher();
        let broadcasts = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&broadcasts);
        dispatcher.subscribe(MessageKind::ClientGetAppOwnershipTicketResponse, move |_| {
            *counter.lock().unwrap() += 1;
        });

        let handle = jobs
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();
        let job_id = handle.job_id();

        assert_eq!(
            dispatcher.dispatch(&ticket_packet(job_id, 730)),
            DispatchOutcome::Resolved(job_id)
        );
        assert_eq!(*broadcasts.lock().unwrap(), 0);
        assert!(matches!(handle.await.unwrap(), Inbound::OwnershipTicket(t) if t.app_id == 730));

        // Replaying the same job id is no longer a job result.
        assert_eq!(
            dispatcher.dispatch(&ticket_packet(job_id, 730)),
            DispatchOutcome::Broadcast(1)
        );
    }

    #[tokio::test]
    async fn test_mismatched_job_id_resolves_nothing() {
        let (dispatcher, jobs) = dispatcher();
        let handle = jobs
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();

        let stale = JobId(handle.job_id().0.wrapping_add(7_000_000));
        assert_eq!(
            dispatcher.dispatch(&ticket_packet(stale, 1)),
            DispatchOutcome::Broadcast(0)
        );
        assert_eq!(jobs.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_matching_id_with_other_kind_is_broadcast() {
        let (dispatcher, jobs) = dispatcher();
        let handle = jobs
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();

        let packet = Packet::response(
            MessageKind::ClientAccountInfo,
            &AccountInfo::default(),
            handle.job_id(),
        )
        .unwrap();
        assert_eq!(dispatcher.dispatch(&packet), DispatchOutcome::Broadcast(0));
        assert!(jobs.claims(
            handle.job_id(),
            MessageKind::ClientGetAppOwnershipTicketResponse
        ));
    }

    #[tokio::test]
    async fn test_malformed_response_fails_claiming_job() {
        let (dispatcher, jobs) = dispatcher();
        let handle = jobs
            .send(
                &GetAppOwnershipTicket { app_id: 730 },
                MessageKind::ClientGetAppOwnershipTicketResponse,
                None,
            )
            .await
            .unwrap();

        let packet = Packet {
            kind: MessageKind::ClientGetAppOwnershipTicketResponse.tag(),
            source_job: JobId::NONE,
            target_job: handle.job_id(),
            body: b"{truncated".to_vec(),
        };
        assert_eq!(
            dispatcher.dispatch(&packet),
            DispatchOutcome::Malformed(MessageKind::ClientGetAppOwnershipTicketResponse)
        );
        assert!(matches!(handle.await, Err(JobError::Malformed { .. })));
    }

    #[test]
    fn test_unregistered_decoder_discards() {
        let (dispatcher, _) = dispatcher();
        assert!(dispatcher.supports(MessageKind::ClientAccountInfo));
        dispatcher.unregister(MessageKind::ClientAccountInfo);
        assert!(!dispatcher.supports(MessageKind::ClientAccountInfo));

        let packet = Packet::response(
            MessageKind::ClientAccountInfo,
            &AccountInfo::default(),
            JobId::NONE,
        )
        .unwrap();
        assert_eq!(
            dispatcher.dispatch(&packet),
            DispatchOutcome::NoDecoder(MessageKind::ClientAccountInfo)
        );
    }

    #[test]
    fn test_subscription_ids_are_distinct() {
        let (dispatcher, _) = dispatcher();
        let a = dispatcher.subscribe(MessageKind::ClientLogOnResponse, |_| {});
        let b = dispatcher.subscribe(MessageKind::ClientLogOnResponse, |_| {});
        assert_ne!(a, b);
    }
}
