//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware, handler)
//!     → request.rs (request ID generation)
//!     → [auth pipeline decides the outbound credential]
//!     → rewrite.rs (set or strip Authorization, compose target URL)
//!     → forward.rs (stream to proxy destination and back)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod rewrite;
pub mod server;

pub use forward::Forwarder;
pub use request::X_REQUEST_ID;
pub use server::{AppState, GatewayServer, ServerError};
