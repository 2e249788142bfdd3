//! Request-time authentication failures.
//!
//! Every variant is answered with `401 Unauthorized` and the error message as
//! a plain-text body. Nothing is retried inside the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::auth::exchange::ExchangeError;
use crate::auth::identity::IdentityError;
use crate::oidc::verifier::VerificationError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("exchanged token cannot be sent in a header")]
    UnusableToken,
}

impl AuthError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::Verification(VerificationError::Format(_)) => "invalid_format",
            AuthError::Verification(VerificationError::Invalid(_)) => "invalid_token",
            AuthError::Exchange(_) => "exchange_failed",
            AuthError::Identity(_) => "identity_failed",
            AuthError::UnusableToken => "unusable_token",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}
