mod analytics;
mod classify;
mod error;
mod framer;
mod gateway;
mod session;
mod webhook;

pub mod prelude {
    pub use crate::analytics::{fetch_supplemental, Analytics, AnalyticsKey, HttpAnalytics};
    pub use crate::classify::{classify, Classification, BLANK_RESPONSE};
    pub use crate::error::{GatewayError, SessionError, StreamError};
    pub use crate::framer::{LineFramer, StreamFramer, DONE_SENTINEL, EVENT_MARKER};
    pub use crate::gateway::{
        ByteStream, CreateSessionRequest, CreateSessionResponse, Gateway, HttpGateway,
        ModelConfig, QueryRequest, RefreshedTokens, ResponseMode,
    };
    pub use crate::session::SessionClient;
    pub use crate::webhook::{HttpWebhook, WebhookPayload, WebhookSink};
}
