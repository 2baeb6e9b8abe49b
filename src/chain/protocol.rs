//! Protocol address table: implementation contract → satellite contracts.

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::Address;
use std::collections::HashMap;

use crate::chain::abi::ContractCaller;
use crate::chain::types::{ChainError, ChainResult};
use crate::config::ProtocolConfig;

/// Addresses of one deployed protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolAddresses {
    pub version: String,
    pub implementation: Address,
    pub token_registry: Address,
    pub delegate: Address,
    pub lrc_token: Address,
}

/// All known protocol versions, keyed by implementation address.
#[derive(Debug, Clone, Default)]
pub struct ProtocolAddressSet {
    by_implementation: HashMap<Address, ProtocolAddresses>,
}

impl ProtocolAddresses {
    /// Take every address from configuration. All satellites must be present.
    pub fn from_config(config: &ProtocolConfig) -> ChainResult<Self> {
        let missing = |what: &'static str| ChainError::NotFound {
            what,
            key: config.version.clone(),
        };
        Ok(Self {
            version: config.version.clone(),
            implementation: config.implementation,
            token_registry: config.token_registry.ok_or_else(|| missing("token registry for protocol"))?,
            delegate: config.delegate.ok_or_else(|| missing("delegate for protocol"))?,
            lrc_token: config.lrc_token.ok_or_else(|| missing("LRC token for protocol"))?,
        })
    }
}

impl ProtocolAddressSet {
    /// Build from configuration alone. Every satellite address must be present.
    pub fn from_config(configs: &[ProtocolConfig]) -> ChainResult<Self> {
        let mut set = Self::default();
        for config in configs {
            set.insert(ProtocolAddresses::from_config(config)?);
        }
        Ok(set)
    }

    /// Build from the fully configured entries, skipping the rest with a warning.
    pub fn from_complete_configs(configs: &[ProtocolConfig]) -> Self {
        let mut set = Self::default();
        for config in configs {
            match ProtocolAddresses::from_config(config) {
                Ok(addresses) => set.insert(addresses),
                Err(e) => tracing::warn!(
                    version = %config.version,
                    implementation = %config.implementation,
                    error = %e,
                    "Protocol skipped until its addresses are read from chain"
                ),
            }
        }
        set
    }

    /// Build from configuration, reading absent satellite addresses from each
    /// implementation contract. `caller_for` binds the protocol ABI to an address.
    pub async fn complete_from_chain<F>(configs: &[ProtocolConfig], caller_for: F) -> ChainResult<Self>
    where
        F: Fn(Address) -> ContractCaller,
    {
        let mut set = Self::default();
        for config in configs {
            let caller = caller_for(config.implementation);
            let token_registry = fill(&caller, config.token_registry, "tokenRegistryAddress").await?;
            let delegate = fill(&caller, config.delegate, "delegateAddress").await?;
            let lrc_token = fill(&caller, config.lrc_token, "lrcTokenAddress").await?;

            tracing::info!(
                version = %config.version,
                implementation = %config.implementation,
                token_registry = %token_registry,
                delegate = %delegate,
                lrc_token = %lrc_token,
                "Protocol addresses resolved"
            );

            set.insert(ProtocolAddresses {
                version: config.version.clone(),
                implementation: config.implementation,
                token_registry,
                delegate,
                lrc_token,
            });
        }
        Ok(set)
    }

    pub fn insert(&mut self, addresses: ProtocolAddresses) {
        self.by_implementation.insert(addresses.implementation, addresses);
    }

    /// Look up by implementation address.
    pub fn get(&self, implementation: &Address) -> Option<&ProtocolAddresses> {
        self.by_implementation.get(implementation)
    }

    /// Look up by version label.
    pub fn by_version(&self, version: &str) -> Option<&ProtocolAddresses> {
        self.by_implementation.values().find(|p| p.version == version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolAddresses> {
        self.by_implementation.values()
    }

    pub fn len(&self) -> usize {
        self.by_implementation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_implementation.is_empty()
    }
}

async fn fill(caller: &ContractCaller, configured: Option<Address>, getter: &str) -> ChainResult<Address> {
    if let Some(address) = configured {
        return Ok(address);
    }
    match caller.call_one(getter, BlockNumberOrTag::Latest, &[]).await? {
        DynSolValue::Address(address) => Ok(address),
        other => Err(ChainError::Abi {
            method: getter.to_string(),
            address: caller.address(),
            message: format!("expected an address, got {:?}", other),
        }),
    }
}
