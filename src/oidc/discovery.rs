//! Provider config discovery.
//!
//! # Responsibilities
//! - Fetch the issuer's OpenID Connect discovery document
//! - Check the advertised issuer matches the configured one
//! - Fetch the signing keys from `jwks_uri`
//!
//! Keys that the JWK parser does not understand (encryption keys with exotic
//! algorithms, for instance) are skipped rather than failing the whole set.

use std::str::FromStr;
use std::time::SystemTime;

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::Algorithm;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::config::schema::DISCOVERY_PATH;
use crate::config::validation::normalize_issuer;

/// Errors raised while fetching provider metadata or keys.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("invalid document at {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("issuer mismatch: expected {expected}, got {actual}")]
    IssuerMismatch { expected: String, actual: String },
}

/// Subset of the discovery document the gateway relies on.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    #[serde(default)]
    pub token_endpoint: Option<String>,
    #[serde(default)]
    pub id_token_signing_alg_values_supported: Vec<String>,
}

/// Discovered identity provider configuration.
///
/// Immutable once built; a refresh produces a new value that replaces the
/// shared snapshot as a whole.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Issuer exactly as advertised; tokens must carry this `iss`.
    pub issuer: String,
    pub jwks_uri: String,
    /// Asymmetric algorithms tokens may be signed with.
    pub signing_algorithms: Vec<Algorithm>,
    pub keys: JwkSet,
    pub fetched_at: SystemTime,
}

impl ProviderConfig {
    pub fn new(metadata: ProviderMetadata, keys: JwkSet) -> Self {
        let mut signing_algorithms: Vec<Algorithm> = metadata
            .id_token_signing_alg_values_supported
            .iter()
            .filter_map(|alg| Algorithm::from_str(alg).ok())
            .filter(is_asymmetric)
            .collect();
        if signing_algorithms.is_empty() {
            signing_algorithms.push(Algorithm::RS256);
        }

        Self {
            issuer: metadata.issuer,
            jwks_uri: metadata.jwks_uri,
            signing_algorithms,
            keys,
            fetched_at: SystemTime::now(),
        }
    }
}

fn is_asymmetric(alg: &Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Anything that can produce a fresh [`ProviderConfig`].
#[async_trait]
pub trait ProviderConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<ProviderConfig, DiscoveryError>;
}

/// Fetches provider config over HTTP from the issuer's well-known endpoint.
#[derive(Clone)]
pub struct HttpDiscovery {
    client: reqwest::Client,
    issuer: String,
}

impl HttpDiscovery {
    /// `issuer` must already be normalised (no trailing slash or discovery path).
    pub fn new(client: reqwest::Client, issuer: impl Into<String>) -> Self {
        Self {
            client,
            issuer: issuer.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, DiscoveryError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| DiscoveryError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.json::<T>().await.map_err(|source| DiscoveryError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[derive(Deserialize)]
struct RawJwkSet {
    keys: Vec<serde_json::Value>,
}

#[async_trait]
impl ProviderConfigSource for HttpDiscovery {
    async fn fetch(&self) -> Result<ProviderConfig, DiscoveryError> {
        let discovery_url = format!("{}{}", self.issuer, DISCOVERY_PATH);
        let metadata: ProviderMetadata = self.get_json(&discovery_url).await?;

        let advertised = normalize_issuer(&metadata.issuer);
        if advertised != self.issuer {
            return Err(DiscoveryError::IssuerMismatch {
                expected: self.issuer.clone(),
                actual: metadata.issuer,
            });
        }

        let raw: RawJwkSet = self.get_json(&metadata.jwks_uri).await?;
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Jwk>(value) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unsupported JWK");
                    None
                }
            })
            .collect();

        let config = ProviderConfig::new(metadata, JwkSet { keys });
        tracing::debug!(
            issuer = %config.issuer,
            keys = config.keys.keys.len(),
            "Provider config fetched"
        );
        Ok(config)
    }
}
