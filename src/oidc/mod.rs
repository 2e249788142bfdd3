//! OpenID Connect provider subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     bootstrap.rs (retry loop) → discovery.rs (well-known doc + JWKS)
//!     → ProviderConfig → Arc<ArcSwap<..>> shared with the verifier
//!
//! Background:
//!     sync.rs (interval) → discovery.rs → atomic swap of the snapshot
//!
//! Per request:
//!     verifier.rs loads the current snapshot and checks the client token
//! ```

pub mod bootstrap;
pub mod discovery;
pub mod sync;
pub mod verifier;

pub use bootstrap::{bootstrap, BootstrapError};
pub use discovery::{DiscoveryError, HttpDiscovery, ProviderConfig, ProviderConfigSource};
pub use sync::{shared, ProviderSync, SharedProviderConfig};
pub use verifier::{TokenValidator, ValidatedIdentity, VerificationError};
