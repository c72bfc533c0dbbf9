use async_trait::async_trait;
use gateway_tunnel_core::prelude::{MetricsRecord, PhaseStats, PluginStat};
use serde::Serialize;
use url::Url;

use crate::error::GatewayError;
use crate::gateway::check_status;

/// Everything known about one completed scenario, as delivered to the webhook sink.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload<'a> {
    pub run_id: &'a str,
    pub scenario: &'a str,
    pub session_id: &'a str,
    pub raw_transcript: &'a str,
    pub answer: &'a str,
    pub metrics: &'a [MetricsRecord],
    pub plugin_stats: &'a [PluginStat],
    pub reasoning_stats: Option<&'a PhaseStats>,
    pub fulfillment_stats: Option<&'a PhaseStats>,
}

#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn deliver(&self, payload: &WebhookPayload<'_>) -> Result<(), GatewayError>;
}

/// Posts each payload as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpWebhook {
    url: Url,
    client: reqwest::Client,
}

impl HttpWebhook {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebhookSink for HttpWebhook {
    async fn deliver(&self, payload: &WebhookPayload<'_>) -> Result<(), GatewayError> {
        log::debug!(
            "Delivering scenario {} to webhook {}",
            payload.scenario,
            self.url
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(payload)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_names_every_field() {
        let payload = WebhookPayload {
            run_id: "run-1",
            scenario: "weather",
            session_id: "s-1",
            raw_transcript: "data: [DONE]\n",
            answer: "Sunny",
            metrics: &[],
            plugin_stats: &[],
            reasoning_stats: None,
            fulfillment_stats: None,
        };

        let json = serde_json::to_value(&payload).unwrap();

        for field in [
            "run_id",
            "scenario",
            "session_id",
            "raw_transcript",
            "answer",
            "metrics",
            "plugin_stats",
            "reasoning_stats",
            "fulfillment_stats",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json["reasoning_stats"].is_null());
    }
}
