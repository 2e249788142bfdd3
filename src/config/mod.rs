//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)      command-line flags
//!     → loader.rs (parse)               → cli.rs (clap)
//!              └──────── Settings::merge ───────┘
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → passed by reference to every subsystem constructor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once built; there is no process-wide mutable state
//! - Provider type is parsed into a closed enum exactly once
//! - Validation separates syntactic (serde/clap) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{
    GatewayConfig, ListenerConfig, ObservabilityConfig, OutboundConfig, ProviderSettings,
    ProviderType, RetryPolicy, Settings, TlsConfig,
};
pub use validation::ValidationError;
