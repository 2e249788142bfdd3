//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound:
//!     bind address → tls.rs (optional rustls termination) → HTTP layer
//!
//! Outbound:
//!     client.rs (shared reqwest client, CA bundles)
//!         → discovery, broker, identity server, proxy destination
//! ```
//!
//! # Design Decisions
//! - Inbound TLS is optional and handled by axum-server
//! - Outbound trust is configured once for every upstream
//! - Redirects are never followed by the client

pub mod client;
pub mod tls;

pub use client::{build_client, ClientError};
pub use tls::{load_tls_config, TlsError};
