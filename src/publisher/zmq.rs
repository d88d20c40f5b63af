//! ZeroMQ publisher
//!
//! Sends every message on a single PUB socket bound at startup. Messages are
//! re-encoded into the 4-frame publication envelope:
//!
//! `[topic, FEDPUB1, headers JSON, body JSON]`
//!
//! The topic comes first so SUB sockets can filter on its prefix.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tracing::info;
use zeromq::{PubSocket, SocketSend, ZmqMessage};

use super::{PublishError, Publisher};
use crate::transport::TransportContext;
use crate::utils::Result;

pub const PUBLISHER_V1: &[u8] = b"FEDPUB1";

pub struct ZmqPublisher {
    name: String,
    publish_endpoint: String,
    socket: PubSocket,
}

impl ZmqPublisher {
    pub async fn bind(
        name: impl Into<String>,
        publish_endpoint: &str,
        ctx: &TransportContext,
    ) -> Result<Self> {
        info!("Binding to {publish_endpoint} for ZeroMQ publication");
        let socket = ctx.bind::<PubSocket>(publish_endpoint).await?;
        Ok(Self {
            name: name.into(),
            publish_endpoint: publish_endpoint.to_string(),
            socket,
        })
    }

    pub fn publish_endpoint(&self) -> &str {
        &self.publish_endpoint
    }
}

impl std::fmt::Debug for ZmqPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZmqPublisher")
            .field("name", &self.name)
            .field("publish_endpoint", &self.publish_endpoint)
            .finish()
    }
}

#[async_trait]
impl Publisher for ZmqPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(
        &mut self,
        topic: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> std::result::Result<(), PublishError> {
        info!(
            "Publishing message on \"{topic}\" to the ZeroMQ PUB socket \"{}\"",
            self.publish_endpoint
        );
        let frames = encode_publication(topic, headers, body)?;
        let message = ZmqMessage::try_from(frames)
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        self.socket
            .send(message)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))
    }
}

pub fn encode_publication(
    topic: &str,
    headers: &HashMap<String, String>,
    body: &Value,
) -> std::result::Result<Vec<Bytes>, PublishError> {
    Ok(vec![
        Bytes::copy_from_slice(topic.as_bytes()),
        Bytes::from_static(PUBLISHER_V1),
        Bytes::from(serde_json::to_vec(headers)?),
        Bytes::from(serde_json::to_vec(body)?),
    ])
}

/// Inverse of [`encode_publication`], as a compliant subscriber would decode it.
pub fn decode_publication(
    frames: &[Bytes],
) -> std::result::Result<(String, HashMap<String, String>, Value), PublishError> {
    let [topic, version, headers, body] = frames else {
        return Err(PublishError::Transport(format!(
            "expected 4 publication frames, got {}",
            frames.len()
        )));
    };

    if &version[..] != PUBLISHER_V1 {
        return Err(PublishError::Transport(format!(
            "unrecognized publication version {:?}",
            String::from_utf8_lossy(version)
        )));
    }

    let topic = std::str::from_utf8(topic)
        .map_err(|e| PublishError::Transport(e.to_string()))?
        .to_string();
    Ok((
        topic,
        serde_json::from_slice(headers)?,
        serde_json::from_slice(body)?,
    ))
}
