//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Chain accessor → Gateway → Intake
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C → broadcast → gateway loop exits → outbound channel closes
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown never drops an order that the gateway already accepted

pub mod shutdown;

pub use shutdown::Shutdown;
