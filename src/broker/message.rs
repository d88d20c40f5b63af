//! Outcome definitions for the broker
//!
//! A `PublishOutcome` is produced by a publisher worker after every publish
//! attempt and aggregated by the broker into the reply sent to the submitter.
//!
//! Wire shape (JSON, camelCase):
//! - `backendName`: the configured backend name, e.g. `"zmq"`
//! - `status`: `"success"` or `"failure"`
//! - `detail`: optional human readable reason, omitted when absent

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    pub backend_name: String,
    pub status: PublishStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PublishOutcome {
    pub fn success(backend_name: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            status: PublishStatus::Success,
            detail: None,
        }
    }

    pub fn failure(backend_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            backend_name: backend_name.into(),
            status: PublishStatus::Failure,
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}
