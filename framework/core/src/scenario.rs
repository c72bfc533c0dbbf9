use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// One named query, and the tools it may use, to submit to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub tool_ids: Vec<String>,
}

/// A server side session created for a single scenario and dropped once it completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
        }
    }
}

/// The outcome of one scenario, which the orchestrator branches on.
///
/// A result that is not a success is always fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioResult {
    pub success: bool,
    pub fatal: bool,
    pub error: Option<HarnessError>,
    pub session_id: Option<String>,
    pub detected_signatures: Vec<String>,
    /// Set when the scenario passed but its report row could not be written.
    pub persistence_error: Option<HarnessError>,
}

impl ScenarioResult {
    pub fn passed(session_id: impl Into<String>) -> Self {
        Self {
            success: true,
            fatal: false,
            error: None,
            session_id: Some(session_id.into()),
            detected_signatures: Vec::new(),
            persistence_error: None,
        }
    }

    pub fn failed(error: HarnessError, session_id: Option<String>) -> Self {
        let detected_signatures = match &error {
            HarnessError::Content { signatures } => signatures.clone(),
            _ => Vec::new(),
        };

        Self {
            success: false,
            fatal: true,
            error: Some(error),
            session_id,
            detected_signatures,
            persistence_error: None,
        }
    }

    pub fn with_persistence_error(mut self, error: HarnessError) -> Self {
        self.persistence_error = Some(error);
        self
    }

    /// A one line description of the failure, if any.
    pub fn error_description(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_is_always_fatal() {
        let result = ScenarioResult::failed(HarnessError::Request("503".to_string()), None);

        assert!(!result.success);
        assert!(result.fatal);
        assert_eq!(
            result.error_description().as_deref(),
            Some("request failed: 503")
        );
    }

    #[test]
    fn content_failure_keeps_signatures() {
        let result = ScenarioResult::failed(
            HarnessError::Content {
                signatures: vec!["internal server error".to_string()],
            },
            Some("s-1".to_string()),
        );

        assert_eq!(result.detected_signatures, vec!["internal server error"]);
        assert_eq!(result.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn tool_ids_default_to_empty() {
        let scenario: ScenarioSpec =
            serde_json::from_str(r#"{"name":"greeting","query":"Say hello"}"#).unwrap();

        assert!(scenario.tool_ids.is_empty());
    }
}
