use std::fmt;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::config::Credentials;
use crate::error::FetchError;

const TOKEN_PATH: &str = "/oauth/token";

/// Access token for the current run. Never refreshed or persisted.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchange client credentials for a bearer token.
///
/// A single request is issued. Any failure, including an unreachable token
/// endpoint, is reported as [`FetchError::Authentication`] and is not retried.
pub async fn acquire_token(
    client: &ApiClient,
    credentials: &Credentials,
) -> Result<BearerToken, FetchError> {
    info!("requesting access token");

    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
    ];

    let response = client
        .http()
        .post(client.url(TOKEN_PATH))
        .form(&form)
        .send()
        .await
        .map_err(|err| FetchError::Authentication {
            status: None,
            body: err.to_string(),
        })?;

    let status = response.status();
    debug!(status = status.as_u16(), "received token response");

    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to read token error response body");
            String::new()
        });
        return Err(FetchError::Authentication {
            status: Some(status),
            body,
        });
    }

    let payload: TokenResponse =
        response
            .json()
            .await
            .map_err(|err| FetchError::Authentication {
                status: Some(status),
                body: format!("unreadable token response: {err}"),
            })?;

    let token = payload
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| FetchError::Authentication {
            status: Some(status),
            body: "token response carried no access_token".to_string(),
        })?;

    info!(expires_in = payload.expires_in, "obtained access token");
    Ok(BearerToken::new(token))
}
