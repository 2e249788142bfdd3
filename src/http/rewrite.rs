//! Outbound request rewriting.
//!
//! # Responsibilities
//! - Point the request at the configured proxy destination, keeping path and query
//! - Replace whatever credential the client sent with the exchanged one
//!
//! # Design Decisions
//! - The client's `Authorization` header never reaches the backend: it is
//!   overwritten on success and removed for anonymous requests
//! - Outbound credential headers are marked sensitive

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue, Uri};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

use crate::auth::{AuthError, Authentication, OutboundCredential};

/// Attach the outbound credential (or strip the inbound one).
pub fn apply_credential(headers: &mut HeaderMap, authentication: &Authentication) -> Result<(), AuthError> {
    match authentication {
        Authentication::Anonymous => {
            headers.remove(AUTHORIZATION);
        }
        Authentication::Authenticated(credential) => {
            headers.insert(AUTHORIZATION, authorization_value(credential)?);
        }
    }
    Ok(())
}

fn authorization_value(credential: &OutboundCredential) -> Result<HeaderValue, AuthError> {
    let raw = match credential {
        OutboundCredential::Authorization { scheme, token } => format!("{scheme} {token}"),
        OutboundCredential::Basic { username, password } => {
            format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
        }
    };
    let mut value = HeaderValue::from_str(&raw).map_err(|_| AuthError::UnusableToken)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Target URL for a request: the proxy URL's origin and base path followed
/// by the inbound path and query.
pub fn target_url(proxy_url: &Url, uri: &Uri) -> Url {
    let mut target = proxy_url.clone();
    let base = proxy_url.path().trim_end_matches('/');
    target.set_path(&format!("{base}{}", uri.path()));
    target.set_query(uri.query());
    target.set_fragment(None);
    target
}
