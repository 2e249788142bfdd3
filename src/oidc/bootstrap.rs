//! Startup fetch of the provider config.
//!
//! Runs once, before the listener is bound. Each failed attempt is retried
//! after the configured interval until the retry budget is spent; a negative
//! maximum in the flag form means the loop never gives up.

use thiserror::Error;

use crate::config::RetryPolicy;
use crate::oidc::discovery::{DiscoveryError, ProviderConfig, ProviderConfigSource};

/// The provider config could not be fetched within the retry budget.
#[derive(Debug, Error)]
#[error("provider config unavailable after {attempts} attempt(s): {source}")]
pub struct BootstrapError {
    pub attempts: u32,
    #[source]
    pub source: DiscoveryError,
}

/// Fetch the provider config, retrying per `policy`.
pub async fn bootstrap<S>(source: &S, policy: RetryPolicy) -> Result<ProviderConfig, BootstrapError>
where
    S: ProviderConfigSource + ?Sized,
{
    let mut retries: u32 = 0;

    loop {
        match source.fetch().await {
            Ok(config) => {
                tracing::info!(
                    issuer = %config.issuer,
                    keys = config.keys.keys.len(),
                    attempts = retries + 1,
                    "Provider config loaded"
                );
                return Ok(config);
            }
            Err(e) if policy.allows_retry(retries) => {
                tracing::warn!(
                    error = %e,
                    attempt = retries + 1,
                    retry_in = ?policy.interval,
                    "Provider config unavailable (retrying)"
                );
                retries = retries.saturating_add(1);
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => {
                tracing::error!(error = %e, attempts = retries + 1, "Provider config unavailable");
                return Err(BootstrapError {
                    attempts: retries + 1,
                    source: e,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use jsonwebtoken::jwk::JwkSet;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::oidc::discovery::ProviderMetadata;

    /// Fails until the `succeed_on`-th call (1-based); never succeeds when `None`.
    struct FlakySource {
        calls: AtomicU32,
        succeed_on: Option<u32>,
    }

    impl FlakySource {
        fn new(succeed_on: Option<u32>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                succeed_on,
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProviderConfigSource for FlakySource {
        async fn fetch(&self) -> Result<ProviderConfig, DiscoveryError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if Some(call) == self.succeed_on {
                let metadata = ProviderMetadata {
                    issuer: "https://sso.example.com".into(),
                    jwks_uri: "https://sso.example.com/certs".into(),
                    authorization_endpoint: None,
                    token_endpoint: None,
                    id_token_signing_alg_values_supported: vec!["RS256".into()],
                };
                return Ok(ProviderConfig::new(metadata, JwkSet { keys: Vec::new() }));
            }
            Err(DiscoveryError::Status {
                url: "https://sso.example.com/.well-known/openid-configuration".into(),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    fn policy(max: i64) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(1), max)
    }

    #[tokio::test]
    async fn test_bounded_retries_exhausted() {
        let source = FlakySource::new(None);

        let err = bootstrap(&source, policy(2)).await.unwrap_err();

        // Initial attempt plus two retries
        assert_eq!(source.calls(), 3);
        assert_eq!(err.attempts, 3);
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_zero_retries_fails_fast() {
        let source = FlakySource::new(None);
        assert!(bootstrap(&source, policy(0)).await.is_err());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unlimited_retries_until_success() {
        let source = FlakySource::new(Some(7));

        let config = bootstrap(&source, policy(-1)).await.unwrap();

        assert_eq!(source.calls(), 7);
        assert_eq!(config.issuer, "https://sso.example.com");
    }

    #[tokio::test]
    async fn test_success_within_budget() {
        let source = FlakySource::new(Some(3));
        assert!(bootstrap(&source, policy(2)).await.is_ok());
        assert_eq!(source.calls(), 3);
    }
}
