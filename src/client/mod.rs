//! The `client` module is what producers use to talk to the broker.
//!
//! `SubmissionClient` wraps a ZeroMQ REQ socket connected to the broker's
//! submission endpoint and speaks the `FSUBMIT1` protocol.

pub mod submission_client;
pub use submission_client::SubmissionClient;
