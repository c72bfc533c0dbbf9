use std::time::Duration;

use gateway_tunnel_core::prelude::HarnessError;

/// A failed call to the gateway, analytics interface or webhook sink.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The endpoint answered 401, the access token needs refreshing.
    #[error("unauthorized")]
    Unauthorized,
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// A failure of an authenticated call made through a [`crate::prelude::SessionClient`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("token refresh failed: {0}")]
    RefreshFailed(GatewayError),
    #[error("{operation} was still unauthorized after refreshing the access token")]
    UnauthorizedAfterRefresh { operation: &'static str },
    #[error("{0}")]
    Creation(GatewayError),
    #[error("{0}")]
    Request(GatewayError),
}

impl From<SessionError> for HarnessError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::RefreshFailed(_) | SessionError::UnauthorizedAfterRefresh { .. } => {
                HarnessError::Auth(err.to_string())
            }
            SessionError::Creation(e) => HarnessError::SessionCreation(e.to_string()),
            SessionError::Request(e) => HarnessError::Request(e.to_string()),
        }
    }
}

/// A failure while reading the response stream.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("no chunk received within {window:?}")]
    Inactive { window: Duration },
    #[error("stream interrupted: {0}")]
    Transport(GatewayError),
}

impl From<StreamError> for HarnessError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Inactive { window } => HarnessError::StreamTimeout { window },
            StreamError::Transport(e) => HarnessError::Request(e.to_string()),
        }
    }
}
