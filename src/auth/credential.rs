//! Request-scoped credential types.
//!
//! None of these types print their secret: `Debug` is redacted so a stray
//! `?credential` in a log line cannot leak a token.

use std::fmt;

use crate::config::ProviderType;

/// Where an inbound credential was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// `Authorization: Bearer|token <credential>`
    AuthorizationHeader,
    /// Password field of HTTP Basic Auth; the username is kept for the
    /// non-GitHub git fallback.
    BasicAuth { username: String },
}

/// Raw credential extracted from a request.
#[derive(Clone, PartialEq, Eq)]
pub struct InboundCredential {
    token: String,
    source: CredentialSource,
}

impl InboundCredential {
    pub fn bearer(token: String) -> Self {
        Self {
            token,
            source: CredentialSource::AuthorizationHeader,
        }
    }

    pub fn basic(username: String, password: String) -> Self {
        Self {
            token: password,
            source: CredentialSource::BasicAuth { username },
        }
    }

    /// The secret itself.
    pub fn expose(&self) -> &str {
        &self.token
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Username sent alongside a Basic-Auth credential, if any.
    pub fn basic_username(&self) -> Option<&str> {
        match &self.source {
            CredentialSource::BasicAuth { username } if !username.is_empty() => Some(username),
            _ => None,
        }
    }
}

impl fmt::Debug for InboundCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundCredential")
            .field("token", &"[redacted]")
            .field("source", &self.source)
            .finish()
    }
}

/// Backend access token returned by the broker.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangedToken {
    token: String,
    provider: ProviderType,
}

impl ExchangedToken {
    pub fn new(token: String, provider: ProviderType) -> Self {
        Self { token, provider }
    }

    pub fn expose(&self) -> &str {
        &self.token
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    pub fn into_secret(self) -> String {
        self.token
    }
}

impl fmt::Debug for ExchangedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangedToken")
            .field("token", &"[redacted]")
            .field("provider", &self.provider)
            .finish()
    }
}

/// Credential attached to the outbound request.
#[derive(Clone, PartialEq, Eq)]
pub enum OutboundCredential {
    /// `Authorization: <scheme> <token>`
    Authorization { scheme: &'static str, token: String },
    /// HTTP Basic Auth, used for git transfers.
    Basic { username: String, password: String },
}

impl fmt::Debug for OutboundCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutboundCredential::Authorization { scheme, .. } => f
                .debug_struct("Authorization")
                .field("scheme", scheme)
                .field("token", &"[redacted]")
                .finish(),
            OutboundCredential::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[redacted]")
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let inbound = InboundCredential::basic("alice".into(), "s3cr3t".into());
        let exchanged = ExchangedToken::new("gho_s3cr3t".into(), ProviderType::Github);
        let outbound = OutboundCredential::Basic {
            username: "alice".into(),
            password: "gho_s3cr3t".into(),
        };

        for rendered in [
            format!("{inbound:?}"),
            format!("{exchanged:?}"),
            format!("{outbound:?}"),
        ] {
            assert!(!rendered.contains("s3cr3t"), "leaked secret in {rendered}");
            assert!(rendered.contains("[redacted]"));
        }
    }

    #[test]
    fn test_basic_username() {
        assert_eq!(
            InboundCredential::basic("alice".into(), "t".into()).basic_username(),
            Some("alice")
        );
        assert_eq!(InboundCredential::basic(String::new(), "t".into()).basic_username(), None);
        assert_eq!(InboundCredential::bearer("t".into()).basic_username(), None);
    }
}
