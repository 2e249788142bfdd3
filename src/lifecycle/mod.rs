//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging → Client → Bootstrap provider → Listen
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop provider sync → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: invalid configuration exits before any network call
//! - Listeners start last, after provider keys are loaded

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
