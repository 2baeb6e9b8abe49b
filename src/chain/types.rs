//! Chain-specific types and error definitions.

use alloy::eips::BlockNumberOrTag;
use alloy::network::TransactionResponse;
use alloy::primitives::{Address, B256};
use alloy::rpc::json_rpc::RpcError;
use alloy::rpc::types::{Block, BlockTransactions};
use alloy::transports::TransportError;
use thiserror::Error;

pub use alloy::rpc::types::{Log, Transaction, TransactionReceipt};

/// Errors that can occur during chain access.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Node unreachable or the exchange itself failed.
    #[error("RPC transport error calling {method}: {source}")]
    Transport {
        method: String,
        #[source]
        source: TransportError,
    },

    /// RPC request exceeded its deadline.
    #[error("RPC timeout after {secs} seconds calling {method}")]
    Timeout { method: String, secs: u64 },

    /// The node answered with a JSON-RPC error object (reverts, nonce conflicts, ...).
    #[error("RPC error from {method} (code {code}): {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// The response did not fit the expected shape.
    #[error("could not decode {method} response: {message}")]
    Decode { method: String, message: String },

    /// The node has no record for the requested key.
    #[error("{what} {key} not found")]
    NotFound { what: &'static str, key: String },

    /// The contract ABI does not declare the method.
    #[error("method {method} not found in ABI of contract {address}")]
    MethodNotFound { method: String, address: Address },

    /// Argument encoding or output decoding against the ABI failed.
    #[error("ABI error for {method} on contract {address}: {message}")]
    Abi {
        method: String,
        address: Address,
        message: String,
    },

    /// An interface description could not be read or parsed.
    #[error("invalid {family} ABI: {message}")]
    InvalidAbi { family: String, message: String },

    /// Invalid private key format or signing failure.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// No signing key is loaded for the account.
    #[error("no signing key loaded for account {0}")]
    UnknownAccount(Address),

    /// Gas price exceeded maximum allowed.
    #[error("Gas price {price_wei} wei exceeds maximum {max_gwei} gwei")]
    GasPriceTooHigh { price_wei: u128, max_gwei: u64 },

    /// The configured endpoint is not a usable URL.
    #[error("Invalid RPC URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// A node exchange made on behalf of a contract method failed.
    #[error("{method}({args}) on contract {address} failed: {source}")]
    Contract {
        method: String,
        address: Address,
        args: String,
        #[source]
        source: Box<ChainError>,
    },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },
}

impl ChainError {
    /// Classify an alloy transport error raised while calling `method`.
    pub(crate) fn from_rpc(method: &str, err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => ChainError::Rpc {
                method: method.to_string(),
                code: payload.code,
                message: payload.message.to_string(),
            },
            RpcError::DeserError { err, .. } => ChainError::Decode {
                method: method.to_string(),
                message: err.to_string(),
            },
            other => ChainError::Transport {
                method: method.to_string(),
                source: other,
            },
        }
    }

    /// True for faults of the exchange itself rather than of the answer.
    pub fn is_transport(&self) -> bool {
        match self {
            ChainError::Transport { .. } | ChainError::Timeout { .. } => true,
            ChainError::Contract { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// The underlying error, with contract context stripped.
    pub fn root(&self) -> &ChainError {
        match self {
            ChainError::Contract { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Lightweight block view produced by the block iterator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockWithTxHash {
    pub number: u64,
    pub hash: B256,
    pub parent_hash: B256,
    pub timestamp: u64,
    /// Transaction hashes in block order.
    pub transactions: Vec<B256>,
    /// Full transaction bodies, present only when requested.
    pub full_transactions: Option<Vec<Transaction>>,
}

impl BlockWithTxHash {
    pub(crate) fn from_rpc(block: Block, include_full_tx: bool) -> Self {
        let header = &block.header;
        let (transactions, full) = match block.transactions {
            BlockTransactions::Full(txs) => (txs.iter().map(|tx| tx.tx_hash()).collect(), txs),
            BlockTransactions::Hashes(hashes) => (hashes, Vec::new()),
            BlockTransactions::Uncle => (Vec::new(), Vec::new()),
        };

        Self {
            number: header.inner.number,
            hash: header.hash,
            parent_hash: header.inner.parent_hash,
            timestamp: header.inner.timestamp,
            transactions,
            full_transactions: include_full_tx.then_some(full),
        }
    }
}

/// Parse a block reference: `latest`, `pending`, `earliest`, `safe`, `finalized`,
/// a decimal number or a `0x` quantity.
pub fn parse_block_tag(input: &str) -> Result<BlockNumberOrTag, String> {
    match input {
        "latest" => Ok(BlockNumberOrTag::Latest),
        "pending" => Ok(BlockNumberOrTag::Pending),
        "earliest" => Ok(BlockNumberOrTag::Earliest),
        "safe" => Ok(BlockNumberOrTag::Safe),
        "finalized" => Ok(BlockNumberOrTag::Finalized),
        other => {
            let parsed = match other.strip_prefix("0x") {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => other.parse::<u64>(),
            };
            parsed
                .map(BlockNumberOrTag::Number)
                .map_err(|e| format!("invalid block reference '{}': {}", other, e))
        }
    }
}
