//! Typed, batching-aware access to the node.

use alloy::dyn_abi::DynSolValue;
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256, U256, U64};
use alloy::rpc::json_rpc::{RpcRecv, RpcSend};
use std::sync::Arc;

use crate::chain::abi::{AbiFamily, ContractAbis, ContractCaller, ContractSender};
use crate::chain::batch::{fetch_by_hash, BatchTransactionRecipientReq, BatchTransactionReq};
use crate::chain::iterator::BlockIterator;
use crate::chain::protocol::{ProtocolAddressSet, ProtocolAddresses};
use crate::chain::transport::{RpcTransport, NO_PARAMS};
use crate::chain::types::{ChainError, ChainResult};
use crate::chain::wallet::AccountStore;
use crate::config::{GasConfig, ProtocolConfig, RelayConfig, ScanConfig};

/// Entry point for every chain read and write the relay performs.
#[derive(Debug, Clone)]
pub struct ChainAccessor {
    transport: RpcTransport,
    abis: ContractAbis,
    accounts: Arc<AccountStore>,
    protocols: Arc<ProtocolAddressSet>,
    gas: GasConfig,
    scan: ScanConfig,
    chain_id: u64,
}

impl ChainAccessor {
    /// Build an accessor without touching the node.
    ///
    /// Fully configured protocols are usable right away. Entries with missing
    /// satellite addresses stay out until [`ChainAccessor::connect`] reads them.
    pub fn new(config: &RelayConfig, accounts: AccountStore) -> ChainResult<Self> {
        let transport = RpcTransport::new(&config.chain)?;
        let abis = ContractAbis::load(&config.abis)?;
        let protocols = ProtocolAddressSet::from_complete_configs(&config.protocols);

        Ok(Self {
            transport,
            abis,
            accounts: Arc::new(accounts),
            protocols: Arc::new(protocols),
            gas: config.gas.clone(),
            scan: config.scan.clone(),
            chain_id: config.chain.chain_id,
        })
    }

    /// Build an accessor, verify the chain ID and resolve protocol addresses.
    pub async fn connect(config: &RelayConfig, accounts: AccountStore) -> ChainResult<Self> {
        let mut accessor = Self::new(config, accounts)?;
        accessor.transport.verify_chain_id(config.chain.chain_id).await?;
        accessor.complete_protocol_addresses(&config.protocols).await?;

        tracing::info!(
            rpc_url = %config.chain.rpc_url,
            chain_id = config.chain.chain_id,
            protocols = accessor.protocols.len(),
            accounts = accessor.accounts.len(),
            "Chain accessor initialized"
        );
        Ok(accessor)
    }

    /// Resolve satellite addresses missing from `configs` by asking each implementation.
    pub async fn complete_protocol_addresses(&mut self, configs: &[ProtocolConfig]) -> ChainResult<()> {
        let abi = self.abis.get(AbiFamily::ProtocolImpl);
        let transport = self.transport.clone();
        let set = ProtocolAddressSet::complete_from_chain(configs, |address| {
            ContractCaller::new(transport.clone(), abi.clone(), address)
        })
        .await?;
        self.protocols = Arc::new(set);
        Ok(())
    }

    pub fn transport(&self) -> &RpcTransport {
        &self.transport
    }

    pub fn abis(&self) -> &ContractAbis {
        &self.abis
    }

    pub fn protocols(&self) -> &ProtocolAddressSet {
        &self.protocols
    }

    /// Addresses of the protocol version whose implementation is `implementation`.
    pub fn protocol(&self, implementation: &Address) -> ChainResult<&ProtocolAddresses> {
        self.protocols.get(implementation).ok_or_else(|| ChainError::NotFound {
            what: "protocol",
            key: implementation.to_string(),
        })
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.accounts
    }

    /// Default batch sizes from configuration.
    pub fn scan_config(&self) -> &ScanConfig {
        &self.scan
    }

    /// Raw JSON-RPC call.
    pub async fn call<P, R>(&self, method: &str, params: P) -> ChainResult<R>
    where
        P: RpcSend,
        R: RpcRecv,
    {
        self.transport.call(method, params).await
    }

    /// Bind `abi` at `address` for read-only calls.
    pub fn contract_call_method(&self, abi: Arc<JsonAbi>, address: Address) -> ContractCaller {
        ContractCaller::new(self.transport.clone(), abi, address)
    }

    /// Bind `abi` at `address` for signed state-changing calls.
    pub fn contract_send_transaction_method(&self, abi: Arc<JsonAbi>, address: Address) -> ContractSender {
        ContractSender::new(
            self.transport.clone(),
            abi,
            address,
            self.accounts.clone(),
            self.gas.clone(),
            self.chain_id,
        )
    }

    fn caller(&self, family: AbiFamily, address: Address) -> ContractCaller {
        self.contract_call_method(self.abis.get(family), address)
    }

    /// ERC-20 `balanceOf(owner)`.
    pub async fn erc20_balance(&self, token: Address, owner: Address, block: BlockNumberOrTag) -> ChainResult<U256> {
        let caller = self.caller(AbiFamily::Erc20, token);
        let value = caller
            .call_one("balanceOf", block, &[DynSolValue::Address(owner)])
            .await?;
        expect_uint(value, "balanceOf", token)
    }

    /// ERC-20 `allowance(owner, spender)`.
    pub async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
        block: BlockNumberOrTag,
    ) -> ChainResult<U256> {
        let caller = self.caller(AbiFamily::Erc20, token);
        let value = caller
            .call_one(
                "allowance",
                block,
                &[DynSolValue::Address(owner), DynSolValue::Address(spender)],
            )
            .await?;
        expect_uint(value, "allowance", token)
    }

    /// Amount of an order already cancelled or filled on `protocol`.
    pub async fn get_cancelled_or_filled(
        &self,
        protocol: Address,
        order_hash: B256,
        block: BlockNumberOrTag,
    ) -> ChainResult<U256> {
        let caller = self.caller(AbiFamily::ProtocolImpl, protocol);
        let value = caller
            .call_one(
                "cancelledOrFilled",
                block,
                &[DynSolValue::FixedBytes(order_hash, 32)],
            )
            .await?;
        expect_uint(value, "cancelledOrFilled", protocol)
    }

    /// Cutoff timestamp set by `owner` on `protocol`; orders older than it are void.
    pub async fn get_cutoff(&self, protocol: Address, owner: Address, block: BlockNumberOrTag) -> ChainResult<U256> {
        let caller = self.caller(AbiFamily::ProtocolImpl, protocol);
        let value = caller
            .call_one("cutoffs", block, &[DynSolValue::Address(owner)])
            .await?;
        expect_uint(value, "cutoffs", protocol)
    }

    /// Token registered under `symbol` in the token registry.
    pub async fn token_address_by_symbol(&self, registry: Address, symbol: &str) -> ChainResult<Address> {
        let caller = self.caller(AbiFamily::TokenRegistry, registry);
        let value = caller
            .call_one(
                "getAddressBySymbol",
                BlockNumberOrTag::Latest,
                &[DynSolValue::String(symbol.to_string())],
            )
            .await?;
        match value.as_address() {
            Some(address) if address != Address::ZERO => Ok(address),
            Some(_) => Err(ChainError::NotFound {
                what: "token symbol",
                key: symbol.to_string(),
            }),
            None => Err(unexpected_output("getAddressBySymbol", registry, &value)),
        }
    }

    /// Whether `address` may move funds through the transfer delegate.
    pub async fn is_address_authorized(&self, delegate: Address, address: Address) -> ChainResult<bool> {
        let caller = self.caller(AbiFamily::Delegate, delegate);
        let value = caller
            .call_one(
                "isAddressAuthorized",
                BlockNumberOrTag::Latest,
                &[DynSolValue::Address(address)],
            )
            .await?;
        value
            .as_bool()
            .ok_or_else(|| unexpected_output("isAddressAuthorized", delegate, &value))
    }

    /// Iterate blocks `[start, end)`. A `batch_size` of 0 uses `scan.block_batch_size`.
    pub fn block_iterator(&self, start: u64, end: u64, include_full_tx: bool, batch_size: usize) -> BlockIterator {
        let batch_size = if batch_size == 0 {
            self.scan.block_batch_size
        } else {
            batch_size
        };
        BlockIterator::new(self.transport.clone(), start, end, include_full_tx, batch_size)
    }

    /// Fill each request with its transaction, `batch_size` per round trip.
    pub async fn batch_transactions(&self, batch_size: usize, reqs: &mut [BatchTransactionReq]) -> ChainResult<()> {
        fetch_by_hash(&self.transport, "eth_getTransactionByHash", "transaction", batch_size, reqs).await
    }

    /// Fill each request with its receipt, `batch_size` per round trip.
    pub async fn batch_transaction_receipts(
        &self,
        batch_size: usize,
        reqs: &mut [BatchTransactionRecipientReq],
    ) -> ChainResult<()> {
        fetch_by_hash(&self.transport, "eth_getTransactionReceipt", "receipt", batch_size, reqs).await
    }

    pub async fn block_number(&self) -> ChainResult<u64> {
        self.transport.block_number().await
    }

    pub async fn chain_id(&self) -> ChainResult<u64> {
        self.transport.chain_id().await
    }

    /// Node's suggested gas price in wei.
    pub async fn gas_price(&self) -> ChainResult<u128> {
        let price: U256 = self.transport.call("eth_gasPrice", NO_PARAMS).await?;
        Ok(price.saturating_to::<u128>())
    }

    /// Pending nonce of `address` as seen by the node.
    pub async fn nonce_at(&self, address: Address) -> ChainResult<u64> {
        let nonce: U64 = self
            .transport
            .call("eth_getTransactionCount", (address, BlockNumberOrTag::Pending))
            .await?;
        Ok(nonce.to::<u64>())
    }

    pub async fn is_healthy(&self) -> bool {
        self.transport.is_healthy().await
    }
}

fn expect_uint(value: DynSolValue, method: &str, address: Address) -> ChainResult<U256> {
    match value.as_uint() {
        Some((n, _)) => Ok(n),
        None => Err(unexpected_output(method, address, &value)),
    }
}

fn unexpected_output(method: &str, address: Address, value: &DynSolValue) -> ChainError {
    ChainError::Abi {
        method: method.to_string(),
        address,
        message: format!("unexpected output {:?}", value),
    }
}
