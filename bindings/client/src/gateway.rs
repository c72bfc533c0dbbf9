use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use gateway_tunnel_core::prelude::{Credentials, ScenarioSpec};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;

/// The raw body of a streaming query, in the chunks the transport delivered it in.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// The endpoints of the conversational gateway that a scenario talks to.
///
/// Implementations make exactly one attempt per call and report a 401 as
/// [`GatewayError::Unauthorized`]. Refreshing and retrying is left to the
/// [`crate::prelude::SessionClient`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn refresh(&self, credentials: &Credentials) -> Result<RefreshedTokens, GatewayError>;

    async fn create_session(
        &self,
        credentials: &Credentials,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, GatewayError>;

    async fn query(
        &self,
        credentials: &Credentials,
        session_id: &str,
        request: &QueryRequest,
    ) -> Result<ByteStream, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    access_token: &'a str,
    refresh_token: &'a str,
    company_id: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub tool_ids: Vec<String>,
    pub external_user_id: String,
}

impl CreateSessionRequest {
    /// Sessions are always created without tools, tools are selected per query.
    pub fn new(external_user_id: impl Into<String>) -> Self {
        Self {
            tool_ids: Vec::new(),
            external_user_id: external_user_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    #[serde(alias = "id")]
    pub session_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Streaming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub endpoint_id: String,
    pub query: String,
    pub tool_ids: Vec<String>,
    pub response_mode: ResponseMode,
    pub model_config: ModelConfig,
}

impl QueryRequest {
    pub fn for_scenario(
        endpoint_id: impl Into<String>,
        scenario: &ScenarioSpec,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            query: scenario.query.clone(),
            tool_ids: scenario.tool_ids.clone(),
            response_mode: ResponseMode::Streaming,
            model_config,
        }
    }
}

/// [`Gateway`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: Url) -> Result<Self, GatewayError> {
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }

        // No overall timeout, the query stream is bounded by the inactivity window instead.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        endpoint(&self.base_url, segments)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn refresh(&self, credentials: &Credentials) -> Result<RefreshedTokens, GatewayError> {
        log::debug!("Refreshing access token for company {}", credentials.company_id);

        let response = self
            .client
            .post(self.endpoint(&["auth", "refresh"]))
            .json(&RefreshRequest {
                access_token: &credentials.access_token,
                refresh_token: &credentials.refresh_token,
                company_id: &credentials.company_id,
            })
            .send()
            .await?;
        let response: RefreshResponse = check_status(response).await?.json().await?;

        match response.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(RefreshedTokens {
                access_token,
                refresh_token: response.refresh_token,
            }),
            _ => Err(GatewayError::InvalidResponse(
                "refresh response carried no access token".to_string(),
            )),
        }
    }

    async fn create_session(
        &self,
        credentials: &Credentials,
        request: &CreateSessionRequest,
    ) -> Result<CreateSessionResponse, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(&["sessions"]))
            .bearer_auth(&credentials.access_token)
            .header("x-company-id", &credentials.company_id)
            .json(request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn query(
        &self,
        credentials: &Credentials,
        session_id: &str,
        request: &QueryRequest,
    ) -> Result<ByteStream, GatewayError> {
        let response = self
            .client
            .post(self.endpoint(&["sessions", session_id, "query"]))
            .bearer_auth(&credentials.access_token)
            .header("x-company-id", &credentials.company_id)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(GatewayError::from)),
        ))
    }
}

/// Append path segments to a base URL, keeping any path the base already has.
pub(crate) fn endpoint(base_url: &Url, segments: &[&str]) -> Url {
    let mut url = base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Turn a 401 into [`GatewayError::Unauthorized`] and any other non-success into
/// [`GatewayError::Status`].
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(GatewayError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = Url::parse("https://gateway.example.com/api/v2").unwrap();

        assert_eq!(
            endpoint(&base, &["sessions", "abc", "query"]).as_str(),
            "https://gateway.example.com/api/v2/sessions/abc/query"
        );

        let base = Url::parse("https://gateway.example.com/api/v2/").unwrap();
        assert_eq!(
            endpoint(&base, &["sessions"]).as_str(),
            "https://gateway.example.com/api/v2/sessions"
        );
    }

    #[test]
    fn query_request_carries_scenario_tools() {
        let scenario = ScenarioSpec {
            name: "weather".to_string(),
            query: "What is the weather in Oslo?".to_string(),
            tool_ids: vec!["weather-tool".to_string()],
        };
        let request = QueryRequest::for_scenario("gpt-endpoint", &scenario, ModelConfig::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["response_mode"], "streaming");
        assert_eq!(json["tool_ids"][0], "weather-tool");
        assert_eq!(json["query"], "What is the weather in Oslo?");
        assert!(json["model_config"].get("max_tokens").is_none());
    }

    #[test]
    fn session_response_accepts_id_alias() {
        let response: CreateSessionResponse = serde_json::from_str(r#"{"id":"s-42"}"#).unwrap();

        assert_eq!(response.session_id, "s-42");
    }

    #[test]
    fn rejects_base_url_without_path() {
        let base = Url::parse("mailto:ops@example.com").unwrap();

        assert!(HttpGateway::new(base).is_err());
    }
}
