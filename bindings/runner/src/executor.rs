use std::time::Duration;

use async_trait::async_trait;
use gateway_client::prelude::*;
use gateway_tunnel_core::prelude::*;
use gateway_tunnel_instruments::prelude::{Report, ReportRow};
use gateway_tunnel_runner::prelude::ScenarioExecutor;

/// Settings shared by every scenario of a run.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub run_id: String,
    pub endpoint_id: String,
    pub model_config: ModelConfig,
    pub inactivity_window: Duration,
}

/// Runs a scenario against the gateway: session, query stream, classification, analytics,
/// report row and webhook delivery, in that order.
pub struct GatewayScenarioExecutor<G: Gateway> {
    client: SessionClient<G>,
    analytics: Box<dyn Analytics>,
    reporter: Box<dyn Report>,
    webhook: Option<Box<dyn WebhookSink>>,
    config: ExecutorConfig,
}

impl<G: Gateway> GatewayScenarioExecutor<G> {
    pub fn new(
        client: SessionClient<G>,
        analytics: Box<dyn Analytics>,
        reporter: Box<dyn Report>,
        webhook: Option<Box<dyn WebhookSink>>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            client,
            analytics,
            reporter,
            webhook,
            config,
        }
    }

    async fn stream_answer(
        &mut self,
        session: &Session,
        scenario: &ScenarioSpec,
    ) -> Result<RawAccumulation, HarnessError> {
        let request = QueryRequest::for_scenario(
            self.config.endpoint_id.as_str(),
            scenario,
            self.config.model_config.clone(),
        );
        let stream = self.client.open_query(session, &request).await?;

        let mut accumulation = RawAccumulation::default();
        let mut framer = StreamFramer::new(stream, self.config.inactivity_window);
        let streamed = framer.accumulate(&mut accumulation).await;
        log::debug!(
            "Received {} bytes for scenario {}",
            accumulation.full_text.len(),
            scenario.name
        );
        streamed?;

        if let Some(e) = classify(&accumulation.full_text, &accumulation.final_answer).into_error()
        {
            log::debug!(
                "Transcript of failed scenario {}:\n{}",
                scenario.name,
                accumulation.full_text
            );
            return Err(e);
        }

        Ok(accumulation)
    }

    async fn supplemental_stats(
        &mut self,
        session: &Session,
        accumulation: &RawAccumulation,
    ) -> SupplementalStats {
        let Some(message_id) = accumulation.last_message_id() else {
            log::warn!(
                "No message id reported in session {}, skipping analytics",
                session.id
            );
            return SupplementalStats::default();
        };

        let key = AnalyticsKey {
            session_id: &session.id,
            message_id,
        };
        fetch_supplemental(&mut self.client, self.analytics.as_ref(), &key).await
    }
}

#[async_trait]
impl<G: Gateway> ScenarioExecutor for GatewayScenarioExecutor<G> {
    async fn run_scenario(&mut self, scenario: &ScenarioSpec) -> ScenarioResult {
        let session = match self.client.create_session().await {
            Ok(session) => session,
            Err(e) => return ScenarioResult::failed(e.into(), None),
        };
        log::info!("Session {} created for scenario {}", session.id, scenario.name);

        let accumulation = match self.stream_answer(&session, scenario).await {
            Ok(accumulation) => accumulation,
            Err(e) => return ScenarioResult::failed(e, Some(session.id)),
        };
        log::info!(
            "Scenario {} answered with {} characters",
            scenario.name,
            accumulation.final_answer.chars().count()
        );

        let stats = self.supplemental_stats(&session, &accumulation).await;
        let row = ReportRow::assemble(
            &self.config.run_id,
            &scenario.name,
            &session.id,
            &accumulation,
            &stats,
        );

        let mut result = ScenarioResult::passed(session.id.as_str());
        if let Err(e) = self.reporter.append(&row).await {
            log::error!("Failed to record scenario {}: {e}", scenario.name);
            result = result.with_persistence_error(e.into());
        }

        if let Some(webhook) = &self.webhook {
            let payload = WebhookPayload {
                run_id: &self.config.run_id,
                scenario: &scenario.name,
                session_id: &session.id,
                raw_transcript: &accumulation.full_text,
                answer: &accumulation.final_answer,
                metrics: &accumulation.metrics_log,
                plugin_stats: &stats.plugin_stats,
                reasoning_stats: stats.reasoning.as_ref(),
                fulfillment_stats: stats.fulfillment.as_ref(),
            };
            if let Err(e) = webhook.deliver(&payload).await {
                return ScenarioResult::failed(
                    HarnessError::Webhook(e.to_string()),
                    Some(session.id.clone()),
                );
            }
            log::debug!("Delivered scenario {} to the webhook", scenario.name);
        }

        result
    }
}
