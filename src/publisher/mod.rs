//! Publisher contract
//!
//! A `Publisher` turns a (topic, headers, body) triple into a backend-specific
//! wire message and sends it. Each instance is owned by exactly one publisher
//! worker and is only ever called sequentially, so `publish` takes `&mut self`
//! and implementations need not be `Sync`.
//!
//! Backends form a closed set selected by the `kind` tag in configuration and
//! built through [`build_publisher`].

pub mod amqp;
pub mod zmq;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::BackendSettings;
use crate::transport::TransportContext;
use crate::utils::Result;

pub use amqp::AmqpPublisher;
pub use zmq::ZmqPublisher;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("publish timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
}

#[async_trait]
pub trait Publisher: Send + std::fmt::Debug {
    /// Name reported as `backendName` in outcomes.
    fn name(&self) -> &str;

    async fn publish(
        &mut self,
        topic: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> std::result::Result<(), PublishError>;
}

/// Construct the publisher described by `settings`.
///
/// Transport setup that can fail (binding a PUB socket, parsing an AMQP URL)
/// happens here so startup aborts before the broker starts accepting submissions.
pub async fn build_publisher(
    settings: &BackendSettings,
    ctx: &TransportContext,
) -> Result<Box<dyn Publisher>> {
    let name = settings.name().to_string();
    let publisher: Box<dyn Publisher> = match settings {
        BackendSettings::Zmq(zmq) => {
            Box::new(ZmqPublisher::bind(name, &zmq.publish_endpoint, ctx).await?)
        }
        BackendSettings::Amqp(amqp) => Box::new(AmqpPublisher::new(name, &amqp.amqp_url)?),
    };
    Ok(publisher)
}
