//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → sections handed to chain, gateway and observability at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Private keys never live in the file (see `chain::wallet`)

pub mod loader;
pub mod schema;
pub mod serde_helpers;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AbiConfig, ChainConfig, CutoffBoundary, CutoffConfig, GasConfig, GatewayConfig,
    ObservabilityConfig, ProtocolConfig, RelayConfig, ScanConfig, TokenPolicyConfig,
};
