pub mod engine;
pub mod message;
pub mod worker;

pub use engine::{BrokerService, start_broker};
pub use message::{PublishOutcome, PublishStatus};
pub use worker::WorkerHandle;
