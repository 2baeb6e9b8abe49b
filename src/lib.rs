//! Order relay: chain accessor and order admission gateway.

pub mod chain;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod observability;

pub use chain::ChainAccessor;
pub use config::schema::RelayConfig;
pub use gateway::{Gateway, Order, OrderState};
pub use lifecycle::Shutdown;
