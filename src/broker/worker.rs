//! Publisher worker
//!
//! Each configured backend runs in its own tokio task that exclusively owns
//! its `Publisher` and a private pair of channels shared only with the broker:
//! commands flow in, outcomes flow out.
//!
//! The worker reports exactly one outcome per `Publish` command. A publish
//! error, a panic inside the publisher, or an elapsed publish timeout all
//! become failure outcomes; the worker keeps running afterwards. A worker that
//! went silent would leave the broker waiting at its barrier forever.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::message::PublishOutcome;
use crate::publisher::{PublishError, Publisher};
use crate::transport::SubmissionRequest;

pub const PUBLISHER_PANICKED: &str = "publisher panicked";
pub const WORKER_UNAVAILABLE: &str = "worker unavailable";

/// How long `shutdown` waits for a worker before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum WorkerCommand {
    Publish(Arc<SubmissionRequest>),
    /// Stop after the current publish.
    Shutdown,
}

struct PublisherWorker {
    name: String,
    publisher: Box<dyn Publisher>,
    publish_timeout: Option<Duration>,
    commands: mpsc::Receiver<WorkerCommand>,
    outcomes: mpsc::Sender<PublishOutcome>,
}

impl PublisherWorker {
    async fn run(mut self) {
        info!(backend = %self.name, "publisher worker ready");

        while let Some(command) = self.commands.recv().await {
            match command {
                WorkerCommand::Publish(request) => {
                    let outcome = self.publish(&request).await;
                    if self.outcomes.send(outcome).await.is_err() {
                        warn!(backend = %self.name, "broker dropped the outcome channel");
                        break;
                    }
                }
                WorkerCommand::Shutdown => break,
            }
        }

        debug!(backend = %self.name, "publisher worker stopped");
    }

    async fn publish(&mut self, request: &SubmissionRequest) -> PublishOutcome {
        let attempt = AssertUnwindSafe(self.publisher.publish(
            &request.topic,
            &request.headers,
            &request.body,
        ))
        .catch_unwind();

        let result = match self.publish_timeout {
            Some(limit) => match tokio::time::timeout(limit, attempt).await {
                Ok(result) => result,
                Err(_) => Ok(Err(PublishError::Timeout(limit))),
            },
            None => attempt.await,
        };

        match result {
            Ok(Ok(())) => PublishOutcome::success(&self.name),
            Ok(Err(e)) => {
                error!(backend = %self.name, "publish failed: {e}");
                PublishOutcome::failure(&self.name, e.to_string())
            }
            Err(_) => {
                error!(backend = %self.name, "publisher panicked while publishing");
                PublishOutcome::failure(&self.name, PUBLISHER_PANICKED)
            }
        }
    }
}

/// The broker's end of one worker binding.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    commands: mpsc::Sender<WorkerCommand>,
    outcomes: mpsc::Receiver<PublishOutcome>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn a worker task around `publisher`. Must be called inside a tokio runtime.
    pub fn spawn(publisher: Box<dyn Publisher>, publish_timeout: Option<Duration>) -> Self {
        // one submission is in flight at a time, so a single slot is enough
        let (command_tx, command_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = mpsc::channel(1);
        let name = publisher.name().to_string();

        let worker = PublisherWorker {
            name: name.clone(),
            publisher,
            publish_timeout,
            commands: command_rx,
            outcomes: outcome_tx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            name,
            commands: command_tx,
            outcomes: outcome_rx,
            task,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hand a submission to the worker. Returns `false` if the worker is gone.
    pub async fn dispatch(&self, request: Arc<SubmissionRequest>) -> bool {
        self.commands
            .send(WorkerCommand::Publish(request))
            .await
            .is_ok()
    }

    /// Wait for the outcome of the last dispatch.
    pub async fn collect(&mut self) -> PublishOutcome {
        match self.outcomes.recv().await {
            Some(outcome) => outcome,
            None => {
                error!(backend = %self.name, "worker exited without reporting");
                PublishOutcome::failure(&self.name, WORKER_UNAVAILABLE)
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Kill the task without the shutdown handshake.
    #[cfg(test)]
    pub(crate) async fn kill(&mut self) {
        self.task.abort();
        while !self.task.is_finished() {
            tokio::task::yield_now().await;
        }
    }

    /// Ask the worker to stop and wait for its task to end. A worker still
    /// busy after [`SHUTDOWN_GRACE`] is aborted.
    pub async fn shutdown(self) {
        self.shutdown_within(SHUTDOWN_GRACE).await
    }

    pub(crate) async fn shutdown_within(self, grace: Duration) {
        let Self {
            name,
            commands,
            outcomes,
            mut task,
        } = self;
        drop(outcomes);

        let stopped = tokio::time::timeout(grace, async {
            let _ = commands.send(WorkerCommand::Shutdown).await;
            (&mut task).await
        })
        .await;

        match stopped {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(backend = %name, "worker task ended abnormally: {e}"),
            Err(_) => {
                warn!(backend = %name, "worker did not stop in time, aborting it");
                task.abort();
            }
        }
    }
}
