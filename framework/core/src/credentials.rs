use std::fmt;

use serde::{Deserialize, Serialize};

/// The tokens and tenant that authorise every call made to the gateway.
///
/// A suite run owns exactly one value of this type. It is only ever changed by a successful token
/// refresh, see [`Credentials::apply_refresh`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub company_id: String,
}

impl Credentials {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        company_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            company_id: company_id.into(),
        }
    }

    /// Replace the access token, and the refresh token when the gateway issued a new one.
    pub fn apply_refresh(&mut self, access_token: String, refresh_token: Option<String>) {
        self.access_token = access_token;
        if let Some(refresh_token) = refresh_token {
            self.refresh_token = refresh_token;
        }
    }
}

// Tokens must never end up in the logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("company_id", &self.company_id)
            .finish()
    }
}
