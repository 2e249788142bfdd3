//! Authentication-translation pipeline.
//!
//! # State Machine
//! ```text
//! Received → Classified ─┬─ no credential ─────────────────────────────────→ Anonymous
//!                        └─ credential → Validated → Exchanged ─┬─ generic ─→ Authorization
//!                                            │           │      └─ git ─────→ [Resolved] → Basic
//!                                            └───────────┴──── any failure → Rejected (401)
//! ```
//!
//! One call per request; the only shared state is the read-only provider
//! snapshot held by the validator.

use axum::http::HeaderMap;

use crate::auth::credential::{InboundCredential, OutboundCredential};
use crate::auth::error::AuthError;
use crate::auth::exchange::TokenExchanger;
use crate::auth::extractor::{classify, extract_credential, RequestClass};
use crate::auth::identity::IdentityResolver;
use crate::config::{GatewayConfig, ProviderType};
use crate::oidc::sync::SharedProviderConfig;
use crate::oidc::verifier::TokenValidator;

/// Username used for git Basic-Auth when the client sent none and the
/// provider has no login to resolve.
pub const FALLBACK_GIT_USERNAME: &str = "oauth2";

/// Outcome of authenticating one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// No credential was presented; forward without one.
    Anonymous,
    /// Credential verified and exchanged; attach this upstream.
    Authenticated(OutboundCredential),
}

pub struct Authenticator {
    validator: TokenValidator,
    exchanger: TokenExchanger,
    resolver: IdentityResolver,
    provider: ProviderType,
    scheme: &'static str,
    require_credential: bool,
}

impl Authenticator {
    pub fn new(
        validator: TokenValidator,
        exchanger: TokenExchanger,
        resolver: IdentityResolver,
        provider: ProviderType,
        require_credential: bool,
    ) -> Self {
        Self {
            validator,
            exchanger,
            resolver,
            provider,
            scheme: provider.authorization_scheme(),
            require_credential,
        }
    }

    /// Build every stage from the gateway configuration.
    pub fn from_config(
        config: &GatewayConfig,
        client: reqwest::Client,
        provider_config: SharedProviderConfig,
    ) -> Result<Self, url::ParseError> {
        let timeout = config.outbound.auth_timeout;
        let validator = TokenValidator::new(provider_config, config.provider.client_id.clone());
        let exchanger = TokenExchanger::new(client.clone(), &config.provider, timeout);
        let resolver =
            IdentityResolver::new(client, &config.provider.identity_server_url, timeout)?;

        Ok(Self::new(
            validator,
            exchanger,
            resolver,
            config.provider.kind,
            config.require_credential,
        ))
    }

    pub async fn authenticate(&self, path: &str, headers: &HeaderMap) -> Result<Authentication, AuthError> {
        let class = classify(path);

        let Some(credential) = extract_credential(class, headers) else {
            if self.require_credential {
                return Err(AuthError::MissingCredential);
            }
            tracing::debug!(class = class.as_str(), "No credential, forwarding anonymously");
            return Ok(Authentication::Anonymous);
        };

        let identity = self.validator.validate(&credential)?;
        tracing::debug!(
            subject = %identity.subject,
            class = class.as_str(),
            "Client token verified"
        );

        let exchanged = self.exchanger.exchange(&credential).await?;

        let outbound = match class {
            RequestClass::Generic => OutboundCredential::Authorization {
                scheme: self.scheme,
                token: exchanged.into_secret(),
            },
            RequestClass::GitProtocol if self.provider.resolves_identity() => {
                let login = self.resolver.resolve(&exchanged).await?;
                OutboundCredential::Basic {
                    username: login,
                    password: exchanged.into_secret(),
                }
            }
            RequestClass::GitProtocol => OutboundCredential::Basic {
                username: fallback_username(&credential),
                password: exchanged.into_secret(),
            },
        };

        Ok(Authentication::Authenticated(outbound))
    }
}

fn fallback_username(credential: &InboundCredential) -> String {
    credential
        .basic_username()
        .unwrap_or(FALLBACK_GIT_USERNAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_username() {
        assert_eq!(
            fallback_username(&InboundCredential::basic("dev".into(), "t".into())),
            "dev"
        );
        assert_eq!(
            fallback_username(&InboundCredential::basic(String::new(), "t".into())),
            FALLBACK_GIT_USERNAME
        );
    }
}
