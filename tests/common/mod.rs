//! Shared utilities for integration testing: an in-process JSON-RPC node.

#![allow(dead_code)]

use alloy::consensus::transaction::Recovered;
use alloy::consensus::{
    Eip658Value, Header, Receipt, ReceiptEnvelope, ReceiptWithBloom, SignableTransaction, Signed,
    TxEnvelope, TxLegacy,
};
use alloy::primitives::{keccak256, Address, Bloom, Bytes, TxKind, B256, U256};
use alloy::rpc::types::{Block, BlockTransactions, Transaction, TransactionReceipt};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

use order_relay::config::{ProtocolConfig, RelayConfig, TokenPolicyConfig};
use order_relay::gateway::Order;

pub const CHAIN_ID: u64 = 31337;
pub const TXS_PER_BLOCK: u64 = 2;

/// Anvil's first account.
pub const ACCOUNT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub const PROTOCOL: Address = Address::new([0xa1; 20]);
pub const TOKEN_REGISTRY: Address = Address::new([0xa2; 20]);
pub const DELEGATE: Address = Address::new([0xa3; 20]);
pub const LRC: Address = Address::new([0xa4; 20]);
pub const TOKEN_S: Address = Address::new([0xb1; 20]);
pub const TOKEN_B: Address = Address::new([0xb2; 20]);

const GWEI: u128 = 1_000_000_000;
const TRANSFER_TO: Address = Address::new([0xbb; 20]);

/// Mutable behaviour of the mock node.
pub struct MockState {
    round_trips: AtomicUsize,
    latest_block: u64,
    methods: Mutex<Vec<String>>,
    call_results: Mutex<HashMap<[u8; 4], Vec<u8>>>,
    reverting: Mutex<HashSet<[u8; 4]>>,
    gas_price: Mutex<u128>,
    pending_nonce: Mutex<u64>,
    delay: Mutex<Option<Duration>>,
    raw_transactions: Mutex<Vec<Vec<u8>>>,
    failing_broadcasts: AtomicUsize,
    tx_positions: HashMap<B256, (u64, u64)>,
}

impl MockState {
    /// Number of HTTP exchanges so far (a batch counts once).
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::SeqCst);
    }

    /// Methods received, in order.
    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }

    /// Answer `eth_call` for the function with this signature, e.g. `balanceOf(address)`.
    pub fn set_call_result(&self, signature: &str, output: Vec<u8>) {
        self.call_results.lock().unwrap().insert(selector(signature), output);
    }

    pub fn set_revert(&self, signature: &str) {
        self.reverting.lock().unwrap().insert(selector(signature));
    }

    pub fn set_gas_price(&self, wei: u128) {
        *self.gas_price.lock().unwrap() = wei;
    }

    pub fn set_pending_nonce(&self, nonce: u64) {
        *self.pending_nonce.lock().unwrap() = nonce;
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn raw_transactions(&self) -> Vec<Vec<u8>> {
        self.raw_transactions.lock().unwrap().clone()
    }

    /// Refuse the next `count` raw transactions without recording them.
    pub fn fail_next_broadcasts(&self, count: usize) {
        self.failing_broadcasts.store(count, Ordering::SeqCst);
    }
}

/// A running mock node.
pub struct MockNode {
    pub url: String,
    pub state: Arc<MockState>,
}

/// Start a mock node whose chain has blocks `0..=latest_block`.
pub async fn start_mock_node(latest_block: u64) -> MockNode {
    let state = Arc::new(MockState {
        round_trips: AtomicUsize::new(0),
        latest_block,
        methods: Mutex::new(Vec::new()),
        call_results: Mutex::new(HashMap::new()),
        reverting: Mutex::new(HashSet::new()),
        gas_price: Mutex::new(1_000_000_000),
        pending_nonce: Mutex::new(3),
        delay: Mutex::new(None),
        raw_transactions: Mutex::new(Vec::new()),
        failing_broadcasts: AtomicUsize::new(0),
        tx_positions: (0..=latest_block)
            .flat_map(|n| (0..TXS_PER_BLOCK).map(move |i| (tx_hash(n, i), (n, i))))
            .collect(),
    });

    let app = Router::new()
        .route("/", post(handle_rpc))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockNode {
        url: format!("http://{}", addr),
        state,
    }
}

async fn handle_rpc(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.round_trips.fetch_add(1, Ordering::SeqCst);
    let delay = *state.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    match body {
        Value::Array(requests) => Json(Value::Array(
            requests.iter().map(|r| answer(&state, r)).collect(),
        )),
        request => Json(answer(&state, &request)),
    }
}

fn answer(state: &MockState, request: &Value) -> Value {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();
    state.methods.lock().unwrap().push(method.clone());

    let result = match method.as_str() {
        "eth_chainId" => Ok(json!(format!("{:#x}", CHAIN_ID))),
        "eth_blockNumber" => Ok(json!(format!("{:#x}", state.latest_block))),
        "eth_gasPrice" => Ok(json!(format!("{:#x}", *state.gas_price.lock().unwrap()))),
        "eth_estimateGas" => Ok(json!("0x5208")),
        "eth_getTransactionCount" => Ok(json!(format!("{:#x}", *state.pending_nonce.lock().unwrap()))),
        "eth_getBlockByNumber" => {
            let number = parse_quantity(&params[0]);
            let full = params[1].as_bool().unwrap_or(false);
            Ok(match number {
                Some(n) if n <= state.latest_block => json!(block(n, full)),
                _ => Value::Null,
            })
        }
        "eth_getTransactionByHash" => Ok(lookup_tx(state, &params[0]).map_or(Value::Null, |(n, i)| json!(transaction(n, i)))),
        "eth_getTransactionReceipt" => {
            Ok(lookup_tx(state, &params[0]).map_or(Value::Null, |(n, i)| json!(receipt(n, i))))
        }
        "eth_call" => eth_call(state, &params[0]),
        "eth_sendRawTransaction" => {
            let refused = state
                .failing_broadcasts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                Err((-32000, "insufficient funds for gas * price + value".to_string()))
            } else {
                let raw = alloy::hex::decode(params[0].as_str().unwrap_or_default()).unwrap_or_default();
                let hash = keccak256(&raw);
                state.raw_transactions.lock().unwrap().push(raw);
                Ok(json!(hash.to_string()))
            }
        }
        _ => Err((-32601, format!("the method {} does not exist/is not available", method))),
    };

    match result {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    }
}

fn eth_call(state: &MockState, call: &Value) -> Result<Value, (i64, String)> {
    let data = call["data"]
        .as_str()
        .or_else(|| call["input"].as_str())
        .unwrap_or_default();
    let bytes = alloy::hex::decode(data).unwrap_or_default();
    if bytes.len() < 4 {
        return Ok(json!("0x"));
    }
    let sel: [u8; 4] = [bytes[0], bytes[1], bytes[2], bytes[3]];

    if state.reverting.lock().unwrap().contains(&sel) {
        return Err((3, "execution reverted".to_string()));
    }
    match state.call_results.lock().unwrap().get(&sel) {
        Some(output) => Ok(json!(format!("0x{}", alloy::hex::encode(output)))),
        None => Ok(json!("0x")),
    }
}

fn parse_quantity(value: &Value) -> Option<u64> {
    let s = value.as_str()?;
    u64::from_str_radix(s.strip_prefix("0x")?, 16).ok()
}

/// Transfer `index` of block `number`, signed by the test account.
fn signed_tx(number: u64, index: u64) -> Signed<TxLegacy> {
    let signer: PrivateKeySigner = ACCOUNT_KEY.parse().unwrap();
    let tx = TxLegacy {
        chain_id: Some(CHAIN_ID),
        nonce: number * TXS_PER_BLOCK + index,
        gas_price: GWEI,
        gas_limit: 21_000,
        to: TxKind::Call(TRANSFER_TO),
        value: U256::from(1),
        input: Bytes::new(),
    };
    let signature = signer.sign_hash_sync(&tx.signature_hash()).unwrap();
    tx.into_signed(signature)
}

/// Hash of transaction `index` in block `number`. Defined for blocks the node does not have too.
pub fn tx_hash(number: u64, index: u64) -> B256 {
    *signed_tx(number, index).hash()
}

pub fn block_hash(number: u64) -> B256 {
    B256::from(U256::from(0x10_0000 + number).to_be_bytes::<32>())
}

fn lookup_tx(state: &MockState, hash: &Value) -> Option<(u64, u64)> {
    let hash: B256 = hash.as_str()?.parse().ok()?;
    state.tx_positions.get(&hash).copied()
}

fn transaction(number: u64, index: u64) -> Transaction {
    let sender = PrivateKeySigner::from_str(ACCOUNT_KEY).unwrap().address();
    Transaction {
        inner: Recovered::new_unchecked(TxEnvelope::Legacy(signed_tx(number, index)), sender),
        block_hash: Some(block_hash(number)),
        block_number: Some(number),
        transaction_index: Some(index),
        effective_gas_price: Some(GWEI),
    }
}

fn block(number: u64, full: bool) -> Block {
    let transactions = if full {
        BlockTransactions::Full((0..TXS_PER_BLOCK).map(|i| transaction(number, i)).collect())
    } else {
        BlockTransactions::Hashes((0..TXS_PER_BLOCK).map(|i| tx_hash(number, i)).collect())
    };
    Block {
        header: alloy::rpc::types::Header {
            hash: block_hash(number),
            inner: Header {
                parent_hash: block_hash(number.saturating_sub(1)),
                number,
                timestamp: 1_500_000_000 + number * 15,
                gas_limit: 30_000_000,
                gas_used: 21_000 * TXS_PER_BLOCK,
                ..Default::default()
            },
            total_difficulty: None,
            size: None,
        },
        uncles: Vec::new(),
        transactions,
        withdrawals: None,
    }
}

/// Receipt of transaction `index` in block `number`. Even indices succeed.
fn receipt(number: u64, index: u64) -> TransactionReceipt {
    let sender = PrivateKeySigner::from_str(ACCOUNT_KEY).unwrap().address();
    TransactionReceipt {
        inner: ReceiptEnvelope::Legacy(ReceiptWithBloom {
            receipt: Receipt {
                status: Eip658Value::Eip658(index % 2 == 0),
                cumulative_gas_used: 21_000 * (index + 1),
                logs: Vec::new(),
            },
            logs_bloom: Bloom::ZERO,
        }),
        transaction_hash: tx_hash(number, index),
        transaction_index: Some(index),
        block_hash: Some(block_hash(number)),
        block_number: Some(number),
        gas_used: 21_000,
        effective_gas_price: GWEI,
        blob_gas_used: None,
        blob_gas_price: None,
        from: sender,
        to: Some(TRANSFER_TO),
        contract_address: None,
    }
}

/// First four bytes of the Keccak-256 of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI word holding an unsigned integer.
pub fn uint_word(value: u64) -> Vec<u8> {
    U256::from(value).to_be_bytes::<32>().to_vec()
}

/// ABI word holding an address.
pub fn address_word(address: Address) -> Vec<u8> {
    let mut word = vec![0u8; 12];
    word.extend_from_slice(address.as_slice());
    word
}

/// Relay configuration pointing at `url`, with one fully specified protocol
/// and both sides allowing `TOKEN_S` and `TOKEN_B`.
pub fn relay_config(url: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.chain.rpc_url = url.to_string();
    config.chain.chain_id = CHAIN_ID;
    config.chain.rpc_timeout_secs = 2;
    config.protocols = vec![ProtocolConfig {
        version: "v1.0".to_string(),
        implementation: PROTOCOL,
        token_registry: Some(TOKEN_REGISTRY),
        delegate: Some(DELEGATE),
        lrc_token: Some(LRC),
    }];
    let policy = TokenPolicyConfig {
        allow: vec![TOKEN_S, TOKEN_B],
        deny: vec![],
    };
    config.gateway.token_s = policy.clone();
    config.gateway.token_b = policy;
    config.gateway.min_lrc_fee = U256::from(1);
    config
}

/// An order from the test account, signed over its hash.
pub fn signed_order(lrc_fee: u64, timestamp: u64) -> Order {
    let signer: PrivateKeySigner = ACCOUNT_KEY.parse().unwrap();
    let mut order = Order {
        protocol: PROTOCOL,
        owner: signer.address(),
        token_s: TOKEN_S,
        token_b: TOKEN_B,
        amount_s: U256::from(5_000u64),
        amount_b: U256::from(2_500u64),
        timestamp: U256::from(timestamp),
        ttl: U256::from(86_400u64),
        salt: U256::from(7u64),
        lrc_fee: U256::from(lrc_fee),
        buy_no_more_than_amount_b: true,
        margin_split_percentage: 100,
        v: 0,
        r: B256::ZERO,
        s: B256::ZERO,
        hash: None,
        price: None,
    };
    let signature = signer.sign_message_sync(order.generate_hash().as_slice()).unwrap();
    order.v = 27 + signature.v() as u8;
    order.r = B256::from(signature.r().to_be_bytes::<32>());
    order.s = B256::from(signature.s().to_be_bytes::<32>());
    order
}
