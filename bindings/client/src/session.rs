use gateway_tunnel_core::prelude::{Credentials, Phase, PhaseStats, PluginStat, Session};

use crate::analytics::{Analytics, AnalyticsKey};
use crate::error::{GatewayError, SessionError};
use crate::gateway::{ByteStream, CreateSessionRequest, Gateway, QueryRequest};

/// Where a single authenticated call is in its retry cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// Issued with the credentials as they were.
    First,
    /// Re-issued once after a successful token refresh. Another 401 is fatal.
    Retried,
}

/// Authenticated access to the gateway for one suite run.
///
/// The client owns the [`Credentials`] and passes them to every call. A call that is answered
/// with 401 triggers exactly one token refresh followed by exactly one retry of that call. The
/// refresh is never attempted ahead of time.
pub struct SessionClient<G: Gateway> {
    gateway: G,
    credentials: Credentials,
    external_user_id: String,
}

impl<G: Gateway> SessionClient<G> {
    pub fn new(gateway: G, credentials: Credentials, external_user_id: impl Into<String>) -> Self {
        Self {
            gateway,
            credentials,
            external_user_id: external_user_id.into(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Create a fresh session for one scenario.
    pub async fn create_session(&mut self) -> Result<Session, SessionError> {
        let request = CreateSessionRequest::new(self.external_user_id.clone());
        let mut attempt = Attempt::First;

        loop {
            match self
                .gateway
                .create_session(&self.credentials, &request)
                .await
            {
                Ok(response) => {
                    log::debug!("Created session {}", response.session_id);
                    return Ok(Session::new(response.session_id));
                }
                Err(GatewayError::Unauthorized) => {
                    attempt = self.recover_unauthorized(attempt, "create session").await?;
                }
                Err(e) => return Err(SessionError::Creation(e)),
            }
        }
    }

    /// Submit a query to a session and return its response stream once the gateway accepted it.
    pub async fn open_query(
        &mut self,
        session: &Session,
        request: &QueryRequest,
    ) -> Result<ByteStream, SessionError> {
        let mut attempt = Attempt::First;

        loop {
            match self
                .gateway
                .query(&self.credentials, &session.id, request)
                .await
            {
                Ok(stream) => return Ok(stream),
                Err(GatewayError::Unauthorized) => {
                    attempt = self.recover_unauthorized(attempt, "query").await?;
                }
                Err(e) => return Err(SessionError::Request(e)),
            }
        }
    }

    /// Plugin executions reported for an answer.
    pub async fn plugin_executions<A: Analytics + ?Sized>(
        &mut self,
        analytics: &A,
        key: &AnalyticsKey<'_>,
    ) -> Result<Vec<PluginStat>, SessionError> {
        let mut attempt = Attempt::First;

        loop {
            match analytics.plugin_executions(&self.credentials, key).await {
                Ok(stats) => return Ok(stats),
                Err(GatewayError::Unauthorized) => {
                    attempt = self
                        .recover_unauthorized(attempt, "plugin executions")
                        .await?;
                }
                Err(e) => return Err(SessionError::Request(e)),
            }
        }
    }

    /// Statistics of one phase of an answer, `None` when none were reported.
    pub async fn phase_stats<A: Analytics + ?Sized>(
        &mut self,
        analytics: &A,
        key: &AnalyticsKey<'_>,
        phase: Phase,
    ) -> Result<Option<PhaseStats>, SessionError> {
        let mut attempt = Attempt::First;

        loop {
            match analytics.phase_stats(&self.credentials, key, phase).await {
                Ok(stats) => return Ok(stats),
                Err(GatewayError::Unauthorized) => {
                    attempt = self.recover_unauthorized(attempt, "phase stats").await?;
                }
                Err(e) => return Err(SessionError::Request(e)),
            }
        }
    }

    async fn recover_unauthorized(
        &mut self,
        attempt: Attempt,
        operation: &'static str,
    ) -> Result<Attempt, SessionError> {
        match attempt {
            Attempt::Retried => {
                log::error!("{operation} was unauthorized again after refreshing the token");
                Err(SessionError::UnauthorizedAfterRefresh { operation })
            }
            Attempt::First => {
                log::warn!("{operation} was unauthorized, refreshing the access token");
                let tokens = self
                    .gateway
                    .refresh(&self.credentials)
                    .await
                    .map_err(SessionError::RefreshFailed)?;
                self.credentials
                    .apply_refresh(tokens.access_token, tokens.refresh_token);
                log::info!("Access token refreshed, retrying {operation}");

                Ok(Attempt::Retried)
            }
        }
    }
}
