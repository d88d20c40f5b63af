//! The `error` module defines the error types shared across the `relay` crate.
//!
//! Only startup and client-side failures surface as [`RelayError`]. Malformed
//! submissions and backend publish failures are handled inside the broker and
//! reported to the submitter as reply payloads instead.

use std::path::PathBuf;

use config::ConfigError;
use thiserror::Error;
use zeromq::ZmqError;

use crate::transport::message::ReplyError;

pub type Result<T> = std::result::Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    /// A socket could not be bound to its endpoint. Fatal at startup.
    #[error("failed to bind {endpoint}: {source}")]
    EndpointBind {
        endpoint: String,
        #[source]
        source: ZmqError,
    },

    /// The parent directory of an `ipc://` endpoint could not be created.
    #[error("failed to create socket directory {}: {source}", .path.display())]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid backend '{name}': {reason}")]
    InvalidBackend { name: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] ZmqError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ReplyError),

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// A request with no frames cannot be put on the wire.
    #[error("cannot send an empty request")]
    EmptyRequest,

    /// The broker answered with the malformed-submission reply.
    #[error("submission rejected by broker: {0}")]
    Rejected(String),
}
