use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;
use zeromq::{ReqSocket, SocketRecv, SocketSend};

use crate::broker::message::PublishOutcome;
use crate::transport::TransportContext;
use crate::transport::message::{Reply, SubmissionRequest, to_multipart};
use crate::utils::{RelayError, Result};

/// Producer-side connection to a broker's submission endpoint.
///
/// Calls are strictly request/reply: `submit` does not return until every
/// backend behind the broker has reported.
pub struct SubmissionClient {
    endpoint: String,
    socket: ReqSocket,
}

impl SubmissionClient {
    pub async fn connect(endpoint: &str, ctx: &TransportContext) -> Result<Self> {
        let socket = ctx.connect::<ReqSocket>(endpoint).await?;
        Ok(Self {
            endpoint: endpoint.to_string(),
            socket,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one message and return the per-backend outcomes in configuration order.
    pub async fn submit(
        &mut self,
        topic: &str,
        headers: HashMap<String, String>,
        body: Value,
    ) -> Result<Vec<PublishOutcome>> {
        let request = SubmissionRequest::new(topic, headers, body);
        match self.send_frames(request.encode()?).await? {
            Reply::Aggregate(outcomes) => Ok(outcomes),
            Reply::Malformed => Err(RelayError::Rejected(topic.to_string())),
        }
    }

    /// Send raw frames, bypassing request encoding.
    pub async fn send_frames(&mut self, frames: Vec<Bytes>) -> Result<Reply> {
        let message = to_multipart(frames).ok_or(RelayError::EmptyRequest)?;
        self.socket.send(message).await?;
        let reply = self.socket.recv().await?;
        Ok(Reply::decode(&reply.into_vec())?)
    }
}

impl std::fmt::Debug for SubmissionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
