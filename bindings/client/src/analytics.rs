use async_trait::async_trait;
use gateway_tunnel_core::prelude::{
    Credentials, Phase, PhaseStats, PluginStat, SupplementalStats,
};
use url::Url;

use crate::error::GatewayError;
use crate::gateway::{check_status, endpoint, Gateway};
use crate::session::SessionClient;

/// Identifies the answer whose statistics are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticsKey<'a> {
    pub session_id: &'a str,
    pub message_id: &'a str,
}

/// The analytics interface that reports plugin executions and per phase statistics for an answer.
#[async_trait]
pub trait Analytics: Send + Sync {
    async fn plugin_executions(
        &self,
        credentials: &Credentials,
        key: &AnalyticsKey<'_>,
    ) -> Result<Vec<PluginStat>, GatewayError>;

    /// `None` when the gateway has no statistics for the phase.
    async fn phase_stats(
        &self,
        credentials: &Credentials,
        key: &AnalyticsKey<'_>,
        phase: Phase,
    ) -> Result<Option<PhaseStats>, GatewayError>;
}

/// [`Analytics`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAnalytics {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpAnalytics {
    pub fn new(base_url: Url) -> Result<Self, GatewayError> {
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }

        Ok(Self {
            base_url,
            client: reqwest::Client::new(),
        })
    }

    fn get(
        &self,
        resource: &str,
        credentials: &Credentials,
        key: &AnalyticsKey<'_>,
    ) -> reqwest::RequestBuilder {
        self.client
            .get(endpoint(&self.base_url, &["analytics", resource]))
            .bearer_auth(&credentials.access_token)
            .header("x-company-id", &credentials.company_id)
            .query(&[
                ("session_id", key.session_id),
                ("message_id", key.message_id),
                ("company_id", credentials.company_id.as_str()),
            ])
    }
}

#[async_trait]
impl Analytics for HttpAnalytics {
    async fn plugin_executions(
        &self,
        credentials: &Credentials,
        key: &AnalyticsKey<'_>,
    ) -> Result<Vec<PluginStat>, GatewayError> {
        let response = self
            .get("plugin-executions", credentials, key)
            .send()
            .await?;
        let stats: Option<Vec<PluginStat>> = check_status(response).await?.json().await?;

        Ok(stats.unwrap_or_default())
    }

    async fn phase_stats(
        &self,
        credentials: &Credentials,
        key: &AnalyticsKey<'_>,
        phase: Phase,
    ) -> Result<Option<PhaseStats>, GatewayError> {
        let response = self
            .get("phase-stats", credentials, key)
            .query(&[("phase", phase.as_str())])
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Fetch everything the analytics interface knows about an answer.
///
/// The calls go through the session client, so an expired token is refreshed once like for any
/// other call. Statistics are supplemental, so a failed fetch is logged and leaves that part empty
/// rather than failing the scenario.
pub async fn fetch_supplemental<G, A>(
    client: &mut SessionClient<G>,
    analytics: &A,
    key: &AnalyticsKey<'_>,
) -> SupplementalStats
where
    G: Gateway,
    A: Analytics + ?Sized,
{
    log::debug!(
        "Fetching analytics for session {} message {}",
        key.session_id,
        key.message_id
    );

    let plugin_stats = client
        .plugin_executions(analytics, key)
        .await
        .unwrap_or_else(|e| {
            log::warn!(
                "Plugin execution stats unavailable for message {}: {e}",
                key.message_id
            );
            Vec::new()
        });

    let mut stats = SupplementalStats {
        plugin_stats,
        ..Default::default()
    };
    for phase in [Phase::Reasoning, Phase::Fulfillment] {
        let phase_stats = match client.phase_stats(analytics, key, phase).await {
            Ok(Some(phase_stats)) => Some(phase_stats),
            Ok(None) => {
                log::warn!("No {phase} stats reported for message {}", key.message_id);
                None
            }
            Err(e) => {
                log::warn!("{phase} stats unavailable for message {}: {e}", key.message_id);
                None
            }
        };

        match phase {
            Phase::Reasoning => stats.reasoning = phase_stats,
            Phase::Fulfillment => stats.fulfillment = phase_stats,
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::{
        ByteStream, CreateSessionRequest, CreateSessionResponse, QueryRequest, RefreshedTokens,
    };

    /// Only answers token refreshes, handing out `fresh`.
    #[derive(Default)]
    struct RefreshOnlyGateway {
        refreshes: Mutex<usize>,
    }

    #[async_trait]
    impl Gateway for RefreshOnlyGateway {
        async fn refresh(&self, _: &Credentials) -> Result<RefreshedTokens, GatewayError> {
            *self.refreshes.lock().unwrap() += 1;
            Ok(RefreshedTokens {
                access_token: "fresh".to_string(),
                refresh_token: None,
            })
        }

        async fn create_session(
            &self,
            _: &Credentials,
            _: &CreateSessionRequest,
        ) -> Result<CreateSessionResponse, GatewayError> {
            Err(GatewayError::Transport("not served".to_string()))
        }

        async fn query(
            &self,
            _: &Credentials,
            _: &str,
            _: &QueryRequest,
        ) -> Result<ByteStream, GatewayError> {
            Err(GatewayError::Transport("not served".to_string()))
        }
    }

    struct FixedAnalytics {
        fail_plugins: bool,
        reasoning: Option<PhaseStats>,
        /// Calls made with this access token are unauthorized.
        expired_token: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl FixedAnalytics {
        fn new(fail_plugins: bool, reasoning: Option<PhaseStats>) -> Self {
            Self {
                fail_plugins,
                reasoning,
                expired_token: None,
                calls: Mutex::default(),
            }
        }

        fn authorize(&self, call: &str, credentials: &Credentials) -> Result<(), GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{call}:{}", credentials.access_token));
            if self.expired_token == Some(credentials.access_token.as_str()) {
                return Err(GatewayError::Unauthorized);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Analytics for FixedAnalytics {
        async fn plugin_executions(
            &self,
            credentials: &Credentials,
            _key: &AnalyticsKey<'_>,
        ) -> Result<Vec<PluginStat>, GatewayError> {
            self.authorize("plugins", credentials)?;
            if self.fail_plugins {
                return Err(GatewayError::Status {
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(vec![PluginStat {
                tool_id: "search".to_string(),
                latency_ms: 250.0,
                succeeded: true,
                ..Default::default()
            }])
        }

        async fn phase_stats(
            &self,
            credentials: &Credentials,
            _key: &AnalyticsKey<'_>,
            phase: Phase,
        ) -> Result<Option<PhaseStats>, GatewayError> {
            self.authorize(phase.as_str(), credentials)?;
            match phase {
                Phase::Reasoning => Ok(self.reasoning.clone()),
                Phase::Fulfillment => Err(GatewayError::Transport("reset".to_string())),
            }
        }
    }

    fn key() -> AnalyticsKey<'static> {
        AnalyticsKey {
            session_id: "s-1",
            message_id: "m-1",
        }
    }

    fn client(access_token: &str) -> SessionClient<RefreshOnlyGateway> {
        SessionClient::new(
            RefreshOnlyGateway::default(),
            Credentials::new(access_token, "r", "acme"),
            "tester",
        )
    }

    #[tokio::test]
    async fn merges_available_stats_and_tolerates_failures() {
        let reasoning = PhaseStats {
            model: "large".to_string(),
            input_tokens: 10,
            ..Default::default()
        };
        let analytics = FixedAnalytics::new(false, Some(reasoning.clone()));

        let stats = fetch_supplemental(&mut client("a"), &analytics, &key()).await;

        assert_eq!(stats.plugin_stats.len(), 1);
        assert_eq!(stats.reasoning, Some(reasoning));
        assert_eq!(stats.fulfillment, None);
    }

    #[tokio::test]
    async fn failed_plugin_fetch_leaves_plugins_empty() {
        let analytics = FixedAnalytics::new(true, None);

        let stats = fetch_supplemental(&mut client("a"), &analytics, &key()).await;

        assert_eq!(stats, SupplementalStats::default());
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_once_for_analytics() {
        let reasoning = PhaseStats {
            model: "large".to_string(),
            total_time: 2.5,
            ..Default::default()
        };
        let mut analytics = FixedAnalytics::new(false, Some(reasoning.clone()));
        analytics.expired_token = Some("expired");
        let mut client = client("expired");

        let stats = fetch_supplemental(&mut client, &analytics, &key()).await;

        assert_eq!(*client.gateway().refreshes.lock().unwrap(), 1);
        assert_eq!(client.credentials().access_token, "fresh");
        assert_eq!(stats.plugin_stats.len(), 1);
        assert_eq!(stats.reasoning, Some(reasoning));
        assert_eq!(
            *analytics.calls.lock().unwrap(),
            vec![
                "plugins:expired",
                "plugins:fresh",
                "reasoning:fresh",
                "fulfillment:fresh"
            ]
        );
    }
}
