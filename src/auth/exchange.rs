//! Broker token exchange.
//!
//! Trades a verified client token for the backend access token stored by the
//! identity provider's broker: `GET <issuer>/broker/<alias>/token` with the
//! client token as bearer credential.
//!
//! The broker answers in a provider-dependent encoding and does not set a
//! reliable content type, so the body is decoded by provider type:
//! - openshift: JSON `{"access_token": "..."}`
//! - github: form-encoded `access_token=...&scope=...`

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::credential::{ExchangedToken, InboundCredential};
use crate::config::{ProviderSettings, ProviderType};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("unable to reach broker: {0}")]
    Request(#[source] reqwest::Error),

    #[error("unable to retrieve broker token: {0}")]
    Status(StatusCode),

    #[error("unable to read broker token: {0}")]
    Body(#[source] reqwest::Error),

    #[error("unable to decode broker token: {0}")]
    Decode(String),

    #[error("missing access token in broker token")]
    MissingAccessToken,
}

#[derive(Debug, Default, Deserialize)]
struct BrokerToken {
    #[serde(default)]
    access_token: Option<String>,
}

/// Decode a broker response body for the given provider type.
pub fn parse_broker_token(provider: ProviderType, body: &[u8]) -> Result<String, ExchangeError> {
    let token: BrokerToken = match provider {
        ProviderType::Openshift => {
            serde_json::from_slice(body).map_err(|e| ExchangeError::Decode(e.to_string()))?
        }
        ProviderType::Github => {
            serde_urlencoded::from_bytes(body).map_err(|e| ExchangeError::Decode(e.to_string()))?
        }
    };

    token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(ExchangeError::MissingAccessToken)
}

/// Calls the broker endpoint for one provider alias.
#[derive(Clone)]
pub struct TokenExchanger {
    client: reqwest::Client,
    token_url: String,
    provider: ProviderType,
    timeout: Duration,
}

impl TokenExchanger {
    pub fn new(client: reqwest::Client, provider: &ProviderSettings, timeout: Duration) -> Self {
        Self {
            client,
            token_url: provider.broker_token_url(),
            provider: provider.kind,
            timeout,
        }
    }

    pub async fn exchange(&self, credential: &InboundCredential) -> Result<ExchangedToken, ExchangeError> {
        let started = Instant::now();
        let result = self.request(credential).await;
        metrics::record_exchange(self.provider.as_str(), result.is_ok(), started);

        if let Err(e) = &result {
            tracing::debug!(broker = %self.token_url, error = %e, "Broker exchange failed");
        }
        result
    }

    async fn request(&self, credential: &InboundCredential) -> Result<ExchangedToken, ExchangeError> {
        let response = self
            .client
            .get(&self.token_url)
            .bearer_auth(credential.expose())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ExchangeError::Request)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ExchangeError::Status(status));
        }

        let body = response.bytes().await.map_err(ExchangeError::Body)?;
        let token = parse_broker_token(self.provider, &body)?;
        Ok(ExchangedToken::new(token, self.provider))
    }
}
