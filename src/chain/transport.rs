//! JSON-RPC transport with deadlines and batching.
//!
//! # Responsibilities
//! - Connect to the node's JSON-RPC endpoint
//! - Issue single calls and batched array-of-requests round trips
//! - Enforce the configured deadline on every exchange
//! - Keep per-request failures inside a batch apart from batch-level faults

use alloy::rpc::client::RpcClient;
use alloy::rpc::json_rpc::{RpcRecv, RpcSend};
use alloy::primitives::U64;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::chain::types::{ChainError, ChainResult};
use crate::config::ChainConfig;
use crate::observability::metrics;

/// Empty positional parameter list (`[]`).
pub const NO_PARAMS: [(); 0] = [];

/// Shared handle to one node endpoint. Cheap to clone.
#[derive(Clone)]
pub struct RpcTransport {
    client: RpcClient,
    endpoint: String,
    timeout_duration: Duration,
}

impl RpcTransport {
    /// Create a transport for the configured endpoint.
    ///
    /// No request is sent here; an unreachable node surfaces on first use.
    pub fn new(config: &ChainConfig) -> ChainResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e: url::ParseError| {
            ChainError::InvalidUrl {
                url: config.rpc_url.clone(),
                message: e.to_string(),
            }
        })?;

        Ok(Self {
            client: RpcClient::new_http(url),
            endpoint: config.rpc_url.clone(),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
        })
    }

    /// Endpoint URL, for diagnostics.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deadline applied to each call and to each batch round trip.
    pub fn timeout(&self) -> Duration {
        self.timeout_duration
    }

    /// Issue one call and decode its result.
    pub async fn call<P, R>(&self, method: &str, params: P) -> ChainResult<R>
    where
        P: RpcSend,
        R: RpcRecv,
    {
        let started = Instant::now();
        let fut = self.client.request::<P, R>(method.to_string(), params);

        let result = match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ChainError::from_rpc(method, e)),
            Err(_) => Err(self.timeout_error(method)),
        };
        metrics::record_rpc_round_trip("single", started);

        if let Err(e) = &result {
            metrics::record_rpc_error(method);
            tracing::warn!(method = method, endpoint = %self.endpoint, error = %e, "RPC call failed");
        }
        result
    }

    /// Issue one batched round trip calling `method` once per parameter set.
    ///
    /// The outer error is a batch-level fault (node unreachable, malformed
    /// envelope). Inner results are per request, in the order of `params`.
    /// A round trip that exceeds the deadline yields a timeout for every
    /// request of this batch only.
    pub async fn batch<P, R>(&self, method: &str, params: &[P]) -> ChainResult<Vec<ChainResult<R>>>
    where
        P: RpcSend,
        R: RpcRecv,
    {
        if params.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mut batch = self.client.new_batch();
        let mut waiters = Vec::with_capacity(params.len());
        for p in params {
            let waiter = batch
                .add_call::<P, R>(method.to_string(), p)
                .map_err(|e| ChainError::from_rpc(method, e))?;
            waiters.push(waiter);
        }

        let sent = timeout(self.timeout_duration, batch.send()).await;
        metrics::record_rpc_round_trip("batch", started);

        match sent {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                metrics::record_rpc_error(method);
                tracing::warn!(
                    method = method,
                    size = params.len(),
                    error = %e,
                    "RPC batch failed"
                );
                return Err(ChainError::from_rpc(method, e));
            }
            Err(_) => {
                tracing::warn!(method = method, size = params.len(), "RPC batch timed out");
                return Ok(params.iter().map(|_| Err(self.timeout_error(method))).collect());
            }
        }

        let mut results = Vec::with_capacity(waiters.len());
        for waiter in waiters {
            results.push(waiter.await.map_err(|e| ChainError::from_rpc(method, e)));
        }
        Ok(results)
    }

    /// Latest block number.
    pub async fn block_number(&self) -> ChainResult<u64> {
        let number: U64 = self.call("eth_blockNumber", NO_PARAMS).await?;
        Ok(number.to::<u64>())
    }

    /// Chain ID reported by the node.
    pub async fn chain_id(&self) -> ChainResult<u64> {
        let id: U64 = self.call("eth_chainId", NO_PARAMS).await?;
        Ok(id.to::<u64>())
    }

    /// Verify the node serves the expected chain.
    pub async fn verify_chain_id(&self, expected: u64) -> ChainResult<()> {
        let actual = self.chain_id().await?;
        if actual != expected {
            return Err(ChainError::ChainMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check if the node is reachable and answering.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.block_number().await.is_ok();
        metrics::record_chain_health(healthy);
        healthy
    }

    fn timeout_error(&self, method: &str) -> ChainError {
        ChainError::Timeout {
            method: method.to_string(),
            secs: self.timeout_duration.as_secs(),
        }
    }
}

impl std::fmt::Debug for RpcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcTransport")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .finish()
    }
}
