//! GitHub login lookup for git transfers.
//!
//! Git clients authenticate with Basic Auth, so the exchanged GitHub token
//! has to travel as a password next to the login of its owner. The login is
//! read from `GET <identity-server>/user`. The identity server defaults to
//! api.github.com and can point at a GitHub Enterprise API root.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::auth::credential::ExchangedToken;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("unable to reach identity server: {0}")]
    Request(#[source] reqwest::Error),

    #[error("identity server returned {0}")]
    Status(StatusCode),

    #[error("unable to decode identity server response: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("identity server response has no login")]
    MissingLogin,
}

#[derive(Debug, Deserialize)]
struct AuthenticatedUser {
    #[serde(default)]
    login: Option<String>,
}

/// Resolves the login that owns an exchanged token.
#[derive(Clone)]
pub struct IdentityResolver {
    client: reqwest::Client,
    user_url: Url,
    timeout: Duration,
}

impl IdentityResolver {
    /// `base` should end in '/' so the API root path is kept.
    pub fn new(client: reqwest::Client, base: &Url, timeout: Duration) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            user_url: base.join("user")?,
            timeout,
        })
    }

    pub fn user_url(&self) -> &Url {
        &self.user_url
    }

    pub async fn resolve(&self, token: &ExchangedToken) -> Result<String, IdentityError> {
        let response = self
            .client
            .get(self.user_url.clone())
            .bearer_auth(token.expose())
            .header(ACCEPT, "application/vnd.github+json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(IdentityError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status));
        }

        let user: AuthenticatedUser = response.json().await.map_err(IdentityError::Decode)?;
        user.login
            .filter(|login| !login.is_empty())
            .ok_or(IdentityError::MissingLogin)
    }
}
