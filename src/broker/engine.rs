//! Broker engine
//!
//! The broker binds the submission endpoint with a ZeroMQ REP socket and
//! relays every valid submission to all configured publishers:
//!
//! 1. decode and validate the request; a malformed request is answered with
//!    `[FSUBMIT1, ERROR_MALFORMED]` and never reaches a publisher
//! 2. dispatch the (topic, headers, body) triple to every worker, in
//!    configuration order
//! 3. wait for exactly one outcome per worker, in the same order
//! 4. reply with `[FSUBMIT1, JSON(outcomes)]`
//!
//! Concurrency and usage notes:
//! - Submissions are handled strictly one at a time; the REP socket will not
//!   deliver the next request before the previous reply is sent.
//! - The broker never calls a publisher directly. Slow backends only hold up
//!   the broker through the outcome barrier.
//! - No timeout exists unless a backend sets `publish_timeout_ms`; a hung
//!   publisher otherwise blocks the barrier and therefore the whole broker.
//!   Shutdown still gets through: the pending submission is abandoned without
//!   a reply and the stuck worker is aborted after a grace period.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;
use zeromq::{RepSocket, SocketRecv, SocketSend};

use super::message::PublishOutcome;
use super::worker::{SHUTDOWN_GRACE, WORKER_UNAVAILABLE, WorkerHandle};
use crate::config::{BackendSettings, Settings};
use crate::publisher::build_publisher;
use crate::transport::TransportContext;
use crate::transport::message::{Reply, SubmissionRequest, to_multipart};
use crate::utils::Result;

#[derive(Debug)]
pub struct BrokerService {
    workers: Vec<WorkerHandle>,
}

impl BrokerService {
    pub fn new(workers: Vec<WorkerHandle>) -> Self {
        Self { workers }
    }

    /// Build one publisher per backend, in order, and start its worker.
    /// Any backend that cannot set up its transport aborts startup.
    pub async fn from_settings(
        backends: &[BackendSettings],
        ctx: &TransportContext,
    ) -> Result<Self> {
        let mut workers = Vec::with_capacity(backends.len());
        for backend in backends {
            let publisher = match build_publisher(backend, ctx).await {
                Ok(publisher) => publisher,
                Err(e) => {
                    for worker in workers {
                        WorkerHandle::shutdown(worker).await;
                    }
                    return Err(e);
                }
            };
            info!(
                backend = backend.name(),
                kind = backend.kind().as_str(),
                "starting publisher worker"
            );
            workers.push(WorkerHandle::spawn(publisher, backend.publish_timeout()));
        }
        Ok(Self::new(workers))
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.workers.iter().map(WorkerHandle::name).collect()
    }

    /// Run one submission through validation, fan-out and the outcome barrier.
    pub async fn handle_submission(&mut self, frames: Vec<Bytes>) -> Reply {
        debug!("Received message submission: {frames:?}");

        let request = match SubmissionRequest::decode(&frames) {
            Ok(request) => request,
            Err(reason) => {
                error!("The submitted message is malformed: {reason}");
                return Reply::Malformed;
            }
        };

        Reply::Aggregate(self.fan_out(Arc::new(request)).await)
    }

    async fn fan_out(&mut self, request: Arc<SubmissionRequest>) -> Vec<PublishOutcome> {
        let mut delivered = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let sent = worker.dispatch(request.clone()).await;
            if sent {
                info!("Sent message to {}", worker.name());
            }
            delivered.push(sent);
        }

        // Block until everyone is done
        let mut outcomes = Vec::with_capacity(self.workers.len());
        for (worker, sent) in self.workers.iter_mut().zip(delivered) {
            let outcome = if sent {
                worker.collect().await
            } else {
                error!("{} is not running, nothing was published", worker.name());
                PublishOutcome::failure(worker.name(), WORKER_UNAVAILABLE)
            };
            info!("{} finished publishing and reported {:?}", worker.name(), outcome.status);
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Answer submissions on `socket` until the context is shut down.
    pub async fn serve(&mut self, mut socket: RepSocket, ctx: &TransportContext) -> Result<()> {
        loop {
            let message = tokio::select! {
                _ = ctx.shutdown_signal() => {
                    info!("Shutdown requested, no longer accepting submissions");
                    return Ok(());
                }
                received = socket.recv() => received?,
            };

            let span = info_span!("submission", id = %Uuid::new_v4());
            // A hung backend must not keep the broker from stopping
            let reply = tokio::select! {
                _ = ctx.shutdown_signal() => {
                    warn!("Shutdown requested mid-submission, the submitter gets no reply");
                    return Ok(());
                }
                reply = self.handle_submission(message.into_vec()).instrument(span) => reply,
            };

            let Some(reply) = to_multipart(reply.encode()?) else {
                continue;
            };
            if let Err(e) = socket.send(reply).await {
                warn!("Failed to send reply to submitter: {e}");
            }
        }
    }

    /// Stop every worker. Publishers are dropped with their tasks. A worker
    /// stuck in a publish is aborted after [`SHUTDOWN_GRACE`].
    pub async fn shutdown(self) {
        for worker in self.workers {
            worker.shutdown().await;
        }
    }
}

/// Bind the submission endpoint, start every configured publisher and serve
/// submissions until `ctx` is shut down.
pub async fn start_broker(settings: &Settings, ctx: &TransportContext) -> Result<()> {
    let endpoint = &settings.broker.submission_endpoint;
    info!("Binding to {endpoint} as the publisher submission socket");
    let socket = ctx.bind::<RepSocket>(endpoint).await?;

    let mut service = BrokerService::from_settings(&settings.publishers, ctx).await?;
    info!(backends = ?service.backend_names(), "broker ready");

    let result = service.serve(socket, ctx).await;
    service.shutdown().await;
    result
}
