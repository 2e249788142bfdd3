//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → extractor.rs (classify path, pull credential)
//!     → oidc::verifier (signature, issuer, audience, expiry)
//!     → exchange.rs (broker call, provider-specific decoding)
//!     → identity.rs (GitHub login, git requests only)
//!     → pipeline.rs (Authentication outcome for the rewriter)
//! ```
//!
//! # Design Decisions
//! - Every failure short-circuits to a 401; nothing is retried per request
//! - Credentials are request-local and never logged

pub mod credential;
pub mod error;
pub mod exchange;
pub mod extractor;
pub mod identity;
pub mod pipeline;

pub use credential::{ExchangedToken, InboundCredential, OutboundCredential};
pub use error::AuthError;
pub use pipeline::{Authentication, Authenticator};
