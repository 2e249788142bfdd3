//! Client token verification.
//!
//! # Responsibilities
//! - Parse the compact JWT header (format errors are reported separately)
//! - Pick the signing key from the current provider snapshot
//! - Check signature, expiry, issuer and that the token was issued to our client
//!
//! # Design Decisions
//! - Only algorithms the provider advertises, and never HMAC, are accepted
//! - Audience passes when `aud` contains the client id or `azp` names it;
//!   Keycloak access tokens often carry `aud: account` with the client in `azp`

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::credential::InboundCredential;
use crate::oidc::discovery::ProviderConfig;
use crate::oidc::sync::SharedProviderConfig;

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
const LEEWAY_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("invalid token format: {0}")]
    Format(String),

    #[error("invalid token: {0}")]
    Invalid(String),
}

/// Claims of a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedIdentity {
    pub subject: String,
    pub issuer: String,
    pub preferred_username: Option<String>,
    pub expires_at: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, client_id: &str) -> bool {
        match self {
            Audience::One(aud) => aud == client_id,
            Audience::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    iss: String,
    exp: u64,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    #[serde(default)]
    azp: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
}

/// Verifies client tokens against the shared provider config.
#[derive(Clone)]
pub struct TokenValidator {
    provider: SharedProviderConfig,
    client_id: String,
}

impl TokenValidator {
    pub fn new(provider: SharedProviderConfig, client_id: impl Into<String>) -> Self {
        Self {
            provider,
            client_id: client_id.into(),
        }
    }

    pub fn validate(
        &self,
        credential: &InboundCredential,
    ) -> Result<ValidatedIdentity, VerificationError> {
        let token = credential.expose();
        let header =
            decode_header(token).map_err(|e| VerificationError::Format(e.to_string()))?;

        let config = self.provider.load();

        if !config.signing_algorithms.contains(&header.alg) {
            return Err(VerificationError::Invalid(format!(
                "signing algorithm {:?} is not accepted",
                header.alg
            )));
        }

        let jwk = select_key(&config, header.kid.as_deref())?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| VerificationError::Invalid(e.to_string()))?;

        let mut validation = Validation::new(header.alg);
        validation.leeway = LEEWAY_SECS;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|e| VerificationError::Invalid(e.to_string()))?
            .claims;

        let audience_ok = claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.contains(&self.client_id))
            || claims.azp.as_deref() == Some(self.client_id.as_str());
        if !audience_ok {
            return Err(VerificationError::Invalid(format!(
                "token was not issued for client {}",
                self.client_id
            )));
        }

        Ok(ValidatedIdentity {
            subject: claims.sub.unwrap_or_default(),
            issuer: claims.iss,
            preferred_username: claims.preferred_username,
            expires_at: claims.exp,
        })
    }
}

fn select_key<'a>(config: &'a ProviderConfig, kid: Option<&str>) -> Result<&'a Jwk, VerificationError> {
    let found = match kid {
        Some(kid) => config.keys.find(kid),
        None if config.keys.keys.len() == 1 => config.keys.keys.first(),
        None => None,
    };
    found.ok_or_else(|| {
        VerificationError::Invalid(match kid {
            Some(kid) => format!("no signing key with id '{kid}'"),
            None => "token has no key id and the provider publishes several keys".to_string(),
        })
    })
}
