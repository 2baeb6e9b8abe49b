//! Batched lookups of transactions and receipts by hash.
//!
//! Requests are split into chunks, one JSON-RPC batch round trip per chunk.
//! Chunks run concurrently; each outcome is written back into the slot of
//! the request that asked for it.

use alloy::primitives::B256;
use alloy::rpc::json_rpc::RpcRecv;
use futures_util::future::join_all;

use crate::chain::transport::RpcTransport;
use crate::chain::types::{ChainError, ChainResult, Transaction, TransactionReceipt};

/// One lookup in a batch: the hash asked for and, once the batch has run,
/// either the record or the error for this hash alone.
#[derive(Debug)]
pub struct BatchReq<T> {
    pub tx_hash: B256,
    pub outcome: Option<ChainResult<T>>,
}

/// Transaction lookup by hash.
pub type BatchTransactionReq = BatchReq<Transaction>;

/// Receipt lookup by transaction hash.
pub type BatchTransactionRecipientReq = BatchReq<TransactionReceipt>;

impl<T> BatchReq<T> {
    pub fn new(tx_hash: B256) -> Self {
        Self {
            tx_hash,
            outcome: None,
        }
    }

    /// Build one request per hash, in order.
    pub fn from_hashes<I: IntoIterator<Item = B256>>(hashes: I) -> Vec<Self> {
        hashes.into_iter().map(Self::new).collect()
    }

    pub fn payload(&self) -> Option<&T> {
        self.outcome.as_ref().and_then(|o| o.as_ref().ok())
    }

    pub fn error(&self) -> Option<&ChainError> {
        self.outcome.as_ref().and_then(|o| o.as_ref().err())
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }
}

/// Fetch `method` for every request, `batch_size` hashes per round trip
/// (0 sends everything in one round trip).
///
/// A batch-level fault in any chunk fails the whole call; slots of the failed
/// chunk are then left empty.
pub(crate) async fn fetch_by_hash<T>(
    transport: &RpcTransport,
    method: &str,
    what: &'static str,
    batch_size: usize,
    reqs: &mut [BatchReq<T>],
) -> ChainResult<()>
where
    T: RpcRecv,
{
    if reqs.is_empty() {
        return Ok(());
    }
    let chunk_size = if batch_size == 0 { reqs.len() } else { batch_size };

    let chunks = reqs.chunks_mut(chunk_size).map(|chunk| async move {
        let params: Vec<(B256,)> = chunk.iter().map(|r| (r.tx_hash,)).collect();
        let results = transport.batch::<_, Option<T>>(method, &params).await?;

        for (req, result) in chunk.iter_mut().zip(results) {
            req.outcome = Some(match result {
                Ok(Some(record)) => Ok(record),
                Ok(None) => Err(ChainError::NotFound {
                    what,
                    key: req.tx_hash.to_string(),
                }),
                Err(e) => Err(e),
            });
        }
        Ok::<_, ChainError>(())
    });

    let outcomes = join_all(chunks).await;
    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        tracing::warn!(method = method, failed_chunks = failed, "Batch lookup incomplete");
    }
    outcomes.into_iter().collect::<ChainResult<Vec<()>>>()?;

    let errors = reqs.iter().filter(|r| r.error().is_some()).count();
    tracing::debug!(method = method, requests = reqs.len(), errors = errors, "Batch lookup complete");
    Ok(())
}
