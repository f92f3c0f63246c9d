use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{Context, Result};

const TOKEN_ENDPOINT: &str = "https://login.eveonline.com/v2/oauth/token";

/// Bearer credential obtained from the SSO refresh flow.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Exchange a refresh token for a short-lived access token.
pub async fn authenticate(
    http: &Client,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<AccessToken> {
    let response = http
        .post(TOKEN_ENDPOINT)
        .basic_auth(client_id, Some(client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .context("Failed to request token refresh")?
        .error_for_status()
        .context("Token refresh request was rejected")?;

    let parsed: TokenResponse = response
        .json()
        .await
        .context("Failed to parse token response")?;

    Ok(AccessToken {
        token: parsed.access_token,
        expires_at: Utc::now() + chrono::Duration::seconds(parsed.expires_in),
    })
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The token itself never lands in logs.
        f.debug_struct("AccessToken")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
