//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, request ID in every request span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Tokens never appear in logs; credential types redact `Debug`
//! - Authorization and Cookie headers are marked sensitive for the trace layer

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
