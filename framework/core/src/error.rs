use std::time::Duration;

/// Every way a scenario can go wrong once it has been handed to the gateway.
///
/// Lines of the response stream that cannot be decoded are not errors. They surface as
/// [`crate::prelude::StreamEvent::Unrecognized`] and are dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// The token refresh failed, or the retried call was unauthorized again.
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("session creation failed: {0}")]
    SessionCreation(String),
    /// A transport or non-auth HTTP failure.
    #[error("request failed: {0}")]
    Request(String),
    #[error("no stream data received within the {window:?} inactivity window")]
    StreamTimeout { window: Duration },
    /// A blank answer or one or more error signatures in the transcript.
    #[error("content error: {}", .signatures.join(", "))]
    Content { signatures: Vec<String> },
    #[error("failed to persist report row: {0}")]
    Persistence(String),
    #[error("webhook delivery failed: {0}")]
    Webhook(String),
}

impl HarnessError {
    /// Whether this error halts the remaining scenarios of the suite.
    ///
    /// Only a failed report write is tolerated. It is reported in the summary, earlier rows are
    /// left intact and the suite moves on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HarnessError::Persistence(_))
    }
}
