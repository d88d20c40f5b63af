//! Submission protocol
//!
//! A submission is a 4-frame multipart message sent on a REQ socket:
//!
//! - Frame 0: the protocol version tag, currently only `FSUBMIT1`
//! - Frame 1: the topic, UTF-8
//! - Frame 2: the headers, a JSON object of string keys to string values
//! - Frame 3: the body, any JSON value
//!
//! The broker answers with 2 frames: the version tag followed by either a
//! JSON array of per-backend outcomes or the literal `ERROR_MALFORMED`.

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use zeromq::ZmqMessage;

use crate::broker::message::PublishOutcome;

pub const SUBMISSION_V1: &[u8] = b"FSUBMIT1";
pub const ERROR_MALFORMED: &[u8] = b"ERROR_MALFORMED";

/// Why a submission was rejected. Every variant results in the same
/// `ERROR_MALFORMED` reply; the reason is only logged.
#[derive(Debug, Error)]
pub enum MalformedSubmission {
    #[error("expected 4 frames, got {0}")]
    FrameCount(usize),
    #[error("unrecognized protocol version {0:?}")]
    Version(String),
    #[error("topic is not valid UTF-8")]
    Topic,
    #[error("headers are not a JSON object of strings: {0}")]
    Headers(#[source] serde_json::Error),
    #[error("body is not valid JSON: {0}")]
    Body(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("expected 2 reply frames, got {0}")]
    FrameCount(usize),
    #[error("unrecognized reply version {0:?}")]
    Version(String),
    #[error("reply payload is not an outcome array: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub topic: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl SubmissionRequest {
    pub fn new(topic: impl Into<String>, headers: HashMap<String, String>, body: Value) -> Self {
        Self {
            topic: topic.into(),
            headers,
            body,
        }
    }

    /// Validate and decode a raw submission. Nothing is dispatched unless this succeeds.
    pub fn decode(frames: &[Bytes]) -> Result<Self, MalformedSubmission> {
        let [version, topic, headers, body] = frames else {
            return Err(MalformedSubmission::FrameCount(frames.len()));
        };

        if &version[..] != SUBMISSION_V1 {
            return Err(MalformedSubmission::Version(
                String::from_utf8_lossy(version).into_owned(),
            ));
        }

        let topic = std::str::from_utf8(topic)
            .map_err(|_| MalformedSubmission::Topic)?
            .to_string();
        let headers = serde_json::from_slice(headers).map_err(MalformedSubmission::Headers)?;
        let body = serde_json::from_slice(body).map_err(MalformedSubmission::Body)?;

        Ok(Self {
            topic,
            headers,
            body,
        })
    }

    pub fn encode(&self) -> serde_json::Result<Vec<Bytes>> {
        Ok(vec![
            Bytes::from_static(SUBMISSION_V1),
            Bytes::from(self.topic.clone()),
            Bytes::from(serde_json::to_vec(&self.headers)?),
            Bytes::from(serde_json::to_vec(&self.body)?),
        ])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Aggregate(Vec<PublishOutcome>),
    Malformed,
}

impl Reply {
    pub fn encode(&self) -> serde_json::Result<Vec<Bytes>> {
        let payload = match self {
            Reply::Aggregate(outcomes) => Bytes::from(serde_json::to_vec(outcomes)?),
            Reply::Malformed => Bytes::from_static(ERROR_MALFORMED),
        };
        Ok(vec![Bytes::from_static(SUBMISSION_V1), payload])
    }

    pub fn decode(frames: &[Bytes]) -> Result<Self, ReplyError> {
        let [version, payload] = frames else {
            return Err(ReplyError::FrameCount(frames.len()));
        };

        if &version[..] != SUBMISSION_V1 {
            return Err(ReplyError::Version(
                String::from_utf8_lossy(version).into_owned(),
            ));
        }

        if &payload[..] == ERROR_MALFORMED {
            return Ok(Reply::Malformed);
        }

        Ok(Reply::Aggregate(serde_json::from_slice(payload)?))
    }
}

/// Build a multipart message from frames. Returns `None` for an empty frame list,
/// which ZeroMQ cannot send.
pub fn to_multipart(frames: Vec<Bytes>) -> Option<ZmqMessage> {
    ZmqMessage::try_from(frames).ok()
}
