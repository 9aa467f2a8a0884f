//! Job correlation table and awaitable job handles.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Sleep;
use tracing::{debug, warn};

use crate::protocol::{Inbound, JobId, MessageKind, Outbound, Packet, Response};
use crate::transport::Transport;

use super::JobError;

type Completion = oneshot::Sender<Result<Inbound, JobError>>;

/// A request waiting for its response.
struct PendingJob {
    expected: MessageKind,
    slot: Completion,
}

/// Pending-job table shared by the correlator and every live handle.
struct JobTable {
    pending: Mutex<HashMap<JobId, PendingJob>>,
    closed: AtomicBool,
}

impl JobTable {
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, PendingJob>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn forget(&self, job_id: JobId) -> bool {
        self.lock().remove(&job_id).is_some()
    }
}

/// Issues job ids, tracks pending requests and resolves them against responses.
///
/// Cheaply cloneable; clones share the same table.
#[derive(Clone)]
pub struct JobCorrelator {
    table: Arc<JobTable>,
    transport: Arc<dyn Transport>,
}

impl JobCorrelator {
    /// Create a correlator sending through `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            table: Arc::new(JobTable {
                pending: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
            transport,
        }
    }

    /// Send `message` as a correlated request expecting a response of `expected` kind.
    ///
    /// The job is registered before the packet is transmitted, so a response
    /// can never arrive ahead of its registration.
    pub async fn send<M: Outbound>(
        &self,
        message: &M,
        expected: MessageKind,
        deadline: Option<Duration>,
    ) -> Result<JobHandle, JobError> {
        let job_id = JobId::next();
        let packet = Packet::request(message, job_id)?;
        let (tx, rx) = oneshot::channel();

        {
            // Checked under the table lock so `cancel_all` cannot drain in between.
            let mut pending = self.table.lock();
            if self.is_closed() {
                return Err(JobError::SessionClosed);
            }
            pending.insert(
                job_id,
                PendingJob {
                    expected,
                    slot: tx,
                },
            );
        }

        debug!("Sending {} as job {} (awaiting {})", M::KIND, job_id, expected);

        if let Err(e) = self.transport.send(packet).await {
            self.table.forget(job_id);
            return Err(JobError::Transport(e));
        }

        Ok(JobHandle {
            job_id,
            expected,
            rx,
            deadline: deadline.map(|d| Box::pin(tokio::time::sleep(d))),
            table: Arc::downgrade(&self.table),
            finished: false,
        })
    }

    /// Send a request and await its typed response.
    pub async fn call<R: Response, M: Outbound>(
        &self,
        message: &M,
        deadline: Option<Duration>,
    ) -> Result<R, JobError> {
        let handle = self.send(message, R::KIND, deadline).await?;
        let job_id = handle.job_id();
        let inbound = handle.await?;
        R::from_inbound(inbound).map_err(|other| JobError::UnexpectedResponse {
            job_id,
            expected: std::any::type_name::<R>(),
            actual: other.kind(),
        })
    }

    /// Whether a pending job with this id awaits a response of `kind`.
    pub fn claims(&self, job_id: JobId, kind: MessageKind) -> bool {
        self.table
            .lock()
            .get(&job_id)
            .is_some_and(|job| job.expected == kind)
    }

    /// Deliver `message` to the job `job_id` if it awaits exactly `kind`.
    ///
    /// The job is removed on delivery. Returns the message back when no
    /// pending job claims it.
    pub fn resolve(&self, job_id: JobId, kind: MessageKind, message: Inbound) -> Result<(), Inbound> {
        let job = {
            let mut pending = self.table.lock();
            let claimed = pending.get(&job_id).is_some_and(|job| job.expected == kind);
            if claimed {
                pending.remove(&job_id)
            } else {
                None
            }
        };

        match job {
            Some(job) => {
                if job.slot.send(Ok(message)).is_err() {
                    debug!("Job {} resolved after its handle was dropped", job_id);
                }
                Ok(())
            }
            None => Err(message),
        }
    }

    /// Fail the job `job_id` with `error`. Returns false if no such job is pending.
    pub fn fail(&self, job_id: JobId, error: JobError) -> bool {
        match self.table.lock().remove(&job_id) {
            Some(job) => {
                let _ = job.slot.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fail every pending job with `SessionClosed` and reject further sends.
    pub fn cancel_all(&self) {
        let drained: Vec<(JobId, PendingJob)> = {
            let mut pending = self.table.lock();
            self.table.closed.store(true, Ordering::SeqCst);
            pending.drain().collect()
        };
        if !drained.is_empty() {
            warn!("Cancelling {} pending job(s)", drained.len());
        }
        for (_, job) in drained {
            let _ = job.slot.send(Err(JobError::SessionClosed));
        }
    }

    /// Whether `cancel_all` has been called.
    pub fn is_closed(&self) -> bool {
        self.table.closed.load(Ordering::SeqCst)
    }

    /// Number of jobs currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.table.lock().len()
    }
}

/// Awaitable handle for a correlated request.
///
/// Resolves with the response, or fails with `Timeout` once the deadline
/// elapses, or with `SessionClosed`. Dropping an unresolved handle removes the
/// pending job.
pub struct JobHandle {
    job_id: JobId,
    expected: MessageKind,
    rx: oneshot::Receiver<Result<Inbound, JobError>>,
    deadline: Option<Pin<Box<Sleep>>>,
    table: Weak<JobTable>,
    finished: bool,
}

impl JobHandle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    fn forget(&self) {
        if let Some(table) = self.table.upgrade() {
            table.forget(self.job_id);
        }
    }
}

impl Future for JobHandle {
    type Output = Result<Inbound, JobError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if let Poll::Ready(result) = this.rx.poll_unpin(cx) {
            this.finished = true;
            // A dropped sender means the table itself went away.
            return Poll::Ready(result.unwrap_or(Err(JobError::SessionClosed)));
        }

        if let Some(deadline) = this.deadline.as_mut() {
            if deadline.as_mut().poll(cx).is_ready() {
                this.finished = true;
                this.forget();
                return Poll::Ready(Err(JobError::Timeout {
                    job_id: this.job_id,
                    expected: this.expected,
                }));
            }
        }

        Poll::Pending
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.forget();
        }
    }
}
