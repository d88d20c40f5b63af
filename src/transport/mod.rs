//! The `transport` module owns everything that touches ZeroMQ framing on the
//! submission side: the submission/reply wire protocol and the explicit
//! transport context that creates and binds sockets.

pub mod context;
pub mod message;


pub use context::TransportContext;
pub use message::{Reply, SubmissionRequest};
