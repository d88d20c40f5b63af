//! # Relay
//!
//! `relay` is a message-relay broker. Producers submit messages over a
//! ZeroMQ request/reply socket; the broker fans every submission out to all
//! configured publication backends (a ZeroMQ PUB socket, an AMQP broker) and
//! only replies once each backend has reported success or failure.
//!
//! ## Core Modules
//!
//! - `broker`: the submission loop, the fan-out/barrier logic and the per-backend
//!   publisher workers.
//! - `publisher`: the `Publisher` contract and the ZeroMQ and AMQP backends.
//! - `transport`: the submission wire protocol and the transport context that binds sockets.
//! - `client`: a submission client for producers.
//! - `config`: loading settings from files and environment.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod publisher;
pub mod transport;
pub mod utils;
