//! Contract interface descriptions and method binding.
//!
//! A bound contract pairs a parsed ABI with an address. [`ContractCaller`]
//! runs read-only methods through `eth_call`; [`ContractSender`] signs and
//! broadcasts state-changing ones. Overloaded methods are resolved by the
//! number of arguments supplied.

use alloy::dyn_abi::{DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::BlockNumberOrTag;
use alloy::json_abi::{Function, JsonAbi};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, B256, U256, U64};
use alloy::rpc::types::TransactionRequest;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::chain::transport::RpcTransport;
use crate::chain::types::{ChainError, ChainResult};
use crate::chain::wallet::{AccountStore, Wallet};
use crate::config::{AbiConfig, GasConfig};
use crate::observability::metrics;

const ERC20_ABI: &str = include_str!("../../abi/erc20.json");
const PROTOCOL_IMPL_ABI: &str = include_str!("../../abi/protocol_impl.json");
const TOKEN_REGISTRY_ABI: &str = include_str!("../../abi/token_registry.json");
const DELEGATE_ABI: &str = include_str!("../../abi/delegate.json");
const WETH_ABI: &str = include_str!("../../abi/weth.json");

const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Contract families the relay talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum AbiFamily {
    Erc20,
    ProtocolImpl,
    TokenRegistry,
    Delegate,
    Weth,
}

impl fmt::Display for AbiFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AbiFamily::Erc20 => "erc20",
            AbiFamily::ProtocolImpl => "protocol_impl",
            AbiFamily::TokenRegistry => "token_registry",
            AbiFamily::Delegate => "delegate",
            AbiFamily::Weth => "weth",
        };
        f.write_str(name)
    }
}

/// Parsed ABIs, loaded once and shared.
#[derive(Debug, Clone)]
pub struct ContractAbis {
    erc20: Arc<JsonAbi>,
    protocol_impl: Arc<JsonAbi>,
    token_registry: Arc<JsonAbi>,
    delegate: Arc<JsonAbi>,
    weth: Arc<JsonAbi>,
}

impl ContractAbis {
    /// ABIs shipped with the crate.
    pub fn builtin() -> ChainResult<Self> {
        Self::load(&AbiConfig::default())
    }

    /// Load ABIs, preferring configured override files over the built-in ones.
    pub fn load(config: &AbiConfig) -> ChainResult<Self> {
        let load = |family: AbiFamily, path: Option<&Path>, builtin: &str| {
            let abi = match path {
                Some(path) => {
                    let json = std::fs::read_to_string(path).map_err(|e| ChainError::InvalidAbi {
                        family: family.to_string(),
                        message: format!("{}: {}", path.display(), e),
                    })?;
                    parse_abi(family, &json)?
                }
                None => parse_abi(family, builtin)?,
            };
            Ok::<_, ChainError>(Arc::new(abi))
        };

        Ok(Self {
            erc20: load(AbiFamily::Erc20, config.erc20.as_deref(), ERC20_ABI)?,
            protocol_impl: load(
                AbiFamily::ProtocolImpl,
                config.protocol_impl.as_deref(),
                PROTOCOL_IMPL_ABI,
            )?,
            token_registry: load(
                AbiFamily::TokenRegistry,
                config.token_registry.as_deref(),
                TOKEN_REGISTRY_ABI,
            )?,
            delegate: load(AbiFamily::Delegate, config.delegate.as_deref(), DELEGATE_ABI)?,
            weth: load(AbiFamily::Weth, config.weth.as_deref(), WETH_ABI)?,
        })
    }

    pub fn get(&self, family: AbiFamily) -> Arc<JsonAbi> {
        match family {
            AbiFamily::Erc20 => self.erc20.clone(),
            AbiFamily::ProtocolImpl => self.protocol_impl.clone(),
            AbiFamily::TokenRegistry => self.token_registry.clone(),
            AbiFamily::Delegate => self.delegate.clone(),
            AbiFamily::Weth => self.weth.clone(),
        }
    }
}

/// Parse a JSON interface description.
pub fn parse_abi(family: AbiFamily, json: &str) -> ChainResult<JsonAbi> {
    serde_json::from_str(json).map_err(|e| ChainError::InvalidAbi {
        family: family.to_string(),
        message: e.to_string(),
    })
}

/// ABI bound to a contract address.
#[derive(Debug, Clone)]
struct BoundContract {
    transport: RpcTransport,
    abi: Arc<JsonAbi>,
    address: Address,
}

impl BoundContract {
    fn resolve(&self, method: &str, arity: usize) -> ChainResult<&Function> {
        let overloads = self
            .abi
            .function(method)
            .ok_or_else(|| ChainError::MethodNotFound {
                method: method.to_string(),
                address: self.address,
            })?;

        overloads
            .iter()
            .find(|f| f.inputs.len() == arity)
            .ok_or_else(|| self.abi_error(method, format!("no overload takes {} arguments", arity)))
    }

    fn encode(&self, method: &str, args: &[DynSolValue]) -> ChainResult<(&Function, Bytes)> {
        let function = self.resolve(method, args.len())?;
        let data = function
            .abi_encode_input(args)
            .map_err(|e| self.abi_error(method, e.to_string()))?;
        Ok((function, Bytes::from(data)))
    }

    fn coerce_args(&self, method: &str, raw: &[String]) -> ChainResult<Vec<DynSolValue>> {
        let function = self.resolve(method, raw.len())?;
        function
            .inputs
            .iter()
            .zip(raw)
            .map(|(param, value)| {
                let ty = param
                    .resolve()
                    .map_err(|e| self.abi_error(method, e.to_string()))?;
                ty.coerce_str(value).map_err(|e| {
                    self.abi_error(method, format!("argument '{}' ({}): {}", value, param.ty, e))
                })
            })
            .collect()
    }

    fn call_request(&self, data: Bytes) -> TransactionRequest {
        TransactionRequest::default()
            .with_to(self.address)
            .with_input(data)
    }

    /// Attach the contract call that a node exchange was made for.
    fn context(&self, method: &str, args: &[DynSolValue], source: ChainError) -> ChainError {
        ChainError::Contract {
            method: method.to_string(),
            address: self.address,
            args: format_args(args),
            source: Box::new(source),
        }
    }

    fn abi_error(&self, method: &str, message: String) -> ChainError {
        ChainError::Abi {
            method: method.to_string(),
            address: self.address,
            message,
        }
    }
}

/// Read-only method caller for one contract.
#[derive(Debug, Clone)]
pub struct ContractCaller {
    inner: BoundContract,
}

impl ContractCaller {
    pub fn new(transport: RpcTransport, abi: Arc<JsonAbi>, address: Address) -> Self {
        Self {
            inner: BoundContract {
                transport,
                abi,
                address,
            },
        }
    }

    pub fn address(&self) -> Address {
        self.inner.address
    }

    /// Call `method(args…)` at `block` and decode all return values.
    pub async fn call(
        &self,
        method: &str,
        block: BlockNumberOrTag,
        args: &[DynSolValue],
    ) -> ChainResult<Vec<DynSolValue>> {
        let (function, data) = self.inner.encode(method, args)?;
        let request = self.inner.call_request(data);

        let output: Bytes = self
            .inner
            .transport
            .call("eth_call", (request, block))
            .await
            .map_err(|e| self.inner.context(method, args, e))?;

        function
            .abi_decode_output(&output)
            .map_err(|e| self.inner.abi_error(method, format!("undecodable output: {}", e)))
    }

    /// Call a method that returns exactly one value.
    pub async fn call_one(
        &self,
        method: &str,
        block: BlockNumberOrTag,
        args: &[DynSolValue],
    ) -> ChainResult<DynSolValue> {
        let mut values = self.call(method, block, args).await?;
        if values.len() != 1 {
            return Err(self.inner.abi_error(
                method,
                format!("expected one return value, got {}", values.len()),
            ));
        }
        Ok(values.remove(0))
    }

    /// Convert textual arguments into typed values per the method's inputs.
    pub fn coerce_args(&self, method: &str, raw: &[String]) -> ChainResult<Vec<DynSolValue>> {
        self.inner.coerce_args(method, raw)
    }
}

/// State-changing method sender for one contract.
#[derive(Debug, Clone)]
pub struct ContractSender {
    inner: BoundContract,
    accounts: Arc<AccountStore>,
    gas: GasConfig,
    chain_id: u64,
}

impl ContractSender {
    pub fn new(
        transport: RpcTransport,
        abi: Arc<JsonAbi>,
        address: Address,
        accounts: Arc<AccountStore>,
        gas: GasConfig,
        chain_id: u64,
    ) -> Self {
        Self {
            inner: BoundContract {
                transport,
                abi,
                address,
            },
            accounts,
            gas,
            chain_id,
        }
    }

    pub fn address(&self) -> Address {
        self.inner.address
    }

    /// Sign and broadcast `method(args…)` from `account`, returning the transaction hash.
    ///
    /// `None` gas parameters are resolved from the node. Does not wait for mining.
    pub async fn send(
        &self,
        account: Address,
        method: &str,
        gas_limit: Option<u64>,
        gas_price: Option<u128>,
        value: U256,
        args: &[DynSolValue],
    ) -> ChainResult<B256> {
        let wallet = self.accounts.get(&account)?;
        let (_, data) = self.inner.encode(method, args)?;
        let transport = &self.inner.transport;

        let gas_limit = match gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = self
                    .inner
                    .call_request(data.clone())
                    .with_from(account)
                    .with_value(value);
                let gas: U64 = transport
                    .call("eth_estimateGas", (estimate,))
                    .await
                    .map_err(|e| self.inner.context(method, args, e))?;
                gas.to::<u64>()
            }
        };

        let gas_price = match gas_price {
            Some(price) => price,
            None => {
                let node_price: U256 = transport.call("eth_gasPrice", super::transport::NO_PARAMS).await?;
                bump_gas_price(node_price.saturating_to::<u128>(), self.gas.price_bump_percent)
            }
        };
        check_gas_ceiling(gas_price, self.gas.max_gas_price_gwei)?;

        let pending: U64 = transport
            .call("eth_getTransactionCount", (account, BlockNumberOrTag::Pending))
            .await?;
        let nonce = wallet.reserve_nonce(pending.to::<u64>());

        let tx = TransactionRequest::default()
            .with_from(account)
            .with_to(self.inner.address)
            .with_value(value)
            .with_input(data)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_gas_limit(gas_limit)
            .with_chain_id(self.chain_id);

        let hash = match self.sign_and_broadcast(wallet, tx).await {
            Ok(hash) => hash,
            Err(e) => {
                wallet.release_nonce(nonce);
                return Err(self.inner.context(method, args, e));
            }
        };
        metrics::record_transaction_sent(method);

        tracing::info!(
            tx_hash = %hash,
            from = %account,
            contract = %self.inner.address,
            method = method,
            nonce = nonce,
            gas_limit = gas_limit,
            gas_price = gas_price,
            "Transaction broadcast"
        );
        Ok(hash)
    }

    async fn sign_and_broadcast(&self, wallet: &Wallet, tx: TransactionRequest) -> ChainResult<B256> {
        let envelope = tx
            .build(&wallet.network_wallet())
            .await
            .map_err(|e| ChainError::Wallet(format!("Signing failed: {}", e)))?;
        let local_hash = *envelope.tx_hash();
        let raw = Bytes::from(envelope.encoded_2718());

        let hash: B256 = self
            .inner
            .transport
            .call("eth_sendRawTransaction", (raw,))
            .await?;
        if hash != local_hash {
            tracing::warn!(node = %hash, local = %local_hash, "Node reported a different transaction hash");
        }
        Ok(hash)
    }

    pub fn coerce_args(&self, method: &str, raw: &[String]) -> ChainResult<Vec<DynSolValue>> {
        self.inner.coerce_args(method, raw)
    }
}

/// Render a decoded ABI value for display.
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Uint(n, _) => n.to_string(),
        DynSolValue::Int(n, _) => n.to_string(),
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", alloy::hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", alloy::hex::encode(bytes)),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            format!("[{}]", format_args(items))
        }
        other => format!("{:?}", other),
    }
}

fn format_args(args: &[DynSolValue]) -> String {
    args.iter().map(format_value).collect::<Vec<_>>().join(", ")
}

/// Raise a node-suggested gas price by `percent`.
pub fn bump_gas_price(price: u128, percent: u64) -> u128 {
    price.saturating_mul(100 + percent as u128) / 100
}

fn check_gas_ceiling(price: u128, max_gwei: u64) -> ChainResult<()> {
    if price > (max_gwei as u128).saturating_mul(WEI_PER_GWEI) {
        return Err(ChainError::GasPriceTooHigh {
            price_wei: price,
            max_gwei,
        });
    }
    Ok(())
}
