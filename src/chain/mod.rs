//! Chain access subsystem.
//!
//! # Data Flow
//! ```text
//! RelayConfig.chain / RELAY_ACCOUNT_KEYS
//!     → transport.rs (JSON-RPC client, deadlines, batch round trips)
//!     → abi.rs (JSON ABIs bound to addresses: callers and senders)
//!     → accessor.rs (typed reads, protocol table, helpers)
//!         ├─ batch.rs (transactions / receipts by hash, chunked)
//!         └─ iterator.rs (block range scan with prefetch)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts

pub mod abi;
pub mod accessor;
pub mod batch;
pub mod iterator;
pub mod protocol;
pub mod transport;
pub mod types;
pub mod wallet;

pub use abi::{AbiFamily, ContractAbis, ContractCaller, ContractSender};
pub use accessor::ChainAccessor;
pub use batch::{BatchReq, BatchTransactionRecipientReq, BatchTransactionReq};
pub use iterator::BlockIterator;
pub use protocol::{ProtocolAddressSet, ProtocolAddresses};
pub use transport::RpcTransport;
pub use types::{
    parse_block_tag, BlockWithTxHash, ChainError, ChainResult, Log, Transaction, TransactionReceipt,
};
pub use wallet::{AccountStore, Wallet};
