//! Order admission gateway.
//!
//! # Data Flow
//! ```text
//! producers (intake.rs JSON lines, other tasks)
//!     → mpsc::Sender<Order>
//!     → handler.rs (Gateway::run, one order at a time)
//!         → order.rs (hash + price)
//!         → filters.rs (Base → Sign → TokenS → TokenB → Cutoff?)
//!     → mpsc::UnboundedSender<OrderState> (order manager)
//! ```
//!
//! # Design Decisions
//! - The filter chain is built once and never changes
//! - First rejection stops the chain; rejected orders are only logged
//! - No filter performs I/O; cutoffs come from an in-memory lookup

pub mod cutoff;
pub mod error;
pub mod filters;
pub mod handler;
pub mod intake;
pub mod order;

pub use cutoff::{CutoffCache, CutoffLookup};
pub use error::{GatewayError, RejectReason, TokenSide};
pub use filters::{BaseFilter, CutoffFilter, Filter, FilterChain, SignFilter, TokenFilter};
pub use handler::{Gateway, GatewayStats};
pub use intake::{forward_json_lines, IntakeStats};
pub use order::{Order, OrderState, Price};
