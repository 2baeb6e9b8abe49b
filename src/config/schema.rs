//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.
//! Signing keys are deliberately absent: they come from the environment only.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::serde_helpers::{deserialize_u256, serialize_u256};

/// Root configuration for the order relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Node connection settings.
    pub chain: ChainConfig,

    /// Gas policy for transactions sent by the relay.
    pub gas: GasConfig,

    /// Default batch sizes for block scans and transaction lookups.
    pub scan: ScanConfig,

    /// Deployed protocol versions.
    pub protocols: Vec<ProtocolConfig>,

    /// ABI override files.
    pub abis: AbiConfig,

    /// Order admission policy.
    pub gateway: GatewayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Chain ID (e.g., 1 for Ethereum mainnet, 31337 for local Anvil).
    pub chain_id: u64,

    /// Deadline for a single call or one batch round trip, in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 1,
            rpc_timeout_secs: 10,
        }
    }
}

/// Gas policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasConfig {
    /// Percentage added on top of the node's suggested gas price.
    pub price_bump_percent: u64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            price_bump_percent: 20,
            max_gas_price_gwei: 500,
        }
    }
}

/// Batch sizes used when the caller passes 0.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Blocks prefetched per round trip by the block iterator.
    pub block_batch_size: usize,

    /// Transactions or receipts per batched round trip.
    pub tx_batch_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            block_batch_size: 50,
            tx_batch_size: 100,
        }
    }
}

/// One deployed protocol version.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolConfig {
    /// Version label (e.g., "v1.0").
    pub version: String,

    /// Protocol implementation contract.
    pub implementation: Address,

    /// Token registry contract; read from the implementation when absent.
    #[serde(default)]
    pub token_registry: Option<Address>,

    /// Transfer delegate contract; read from the implementation when absent.
    #[serde(default)]
    pub delegate: Option<Address>,

    /// LRC fee token; read from the implementation when absent.
    #[serde(default)]
    pub lrc_token: Option<Address>,
}

/// Paths to ABI JSON files replacing the built-in descriptions.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AbiConfig {
    pub erc20: Option<PathBuf>,
    pub protocol_impl: Option<PathBuf>,
    pub token_registry: Option<PathBuf>,
    pub delegate: Option<PathBuf>,
    pub weth: Option<PathBuf>,
}

/// Order admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Orders must pay strictly more than this LRC fee.
    #[serde(deserialize_with = "deserialize_u256", serialize_with = "serialize_u256")]
    pub min_lrc_fee: U256,

    /// Policy for the token being sold.
    pub token_s: TokenPolicyConfig,

    /// Policy for the token being bought.
    pub token_b: TokenPolicyConfig,

    /// Cutoff filter settings.
    pub cutoff: CutoffConfig,

    /// Capacity of the inbound order channel.
    pub inbound_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            min_lrc_fee: U256::ZERO,
            token_s: TokenPolicyConfig::default(),
            token_b: TokenPolicyConfig::default(),
            cutoff: CutoffConfig::default(),
            inbound_capacity: 1024,
        }
    }
}

/// Allow and deny lists for one side of an order.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TokenPolicyConfig {
    /// Tokens admitted on this side. Orders naming any other token are rejected.
    pub allow: Vec<Address>,

    /// Tokens refused on this side, even when allowed.
    pub deny: Vec<Address>,
}

/// Where the cutoff boundary falls.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CutoffBoundary {
    /// Reject orders created before the cutoff.
    #[default]
    Strict,
    /// Also reject orders created exactly at the cutoff.
    Inclusive,
}

/// Cutoff filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CutoffConfig {
    /// Enable the cutoff filter.
    pub enabled: bool,

    /// Boundary policy.
    pub boundary: CutoffBoundary,

    /// Owners whose cutoffs are loaded on every protocol before orders are admitted.
    pub owners: Vec<Address>,

    /// Seconds between re-reads of every known owner's cutoff.
    pub refresh_interval_secs: u64,
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            boundary: CutoffBoundary::Strict,
            owners: Vec::new(),
            refresh_interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
