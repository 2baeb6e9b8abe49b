//! Forward-only scan over a block range with batched prefetch.

use alloy::eips::BlockNumberOrTag;
use alloy::rpc::types::Block;
use futures_util::stream::{self, Stream};
use std::collections::VecDeque;

use crate::chain::transport::RpcTransport;
use crate::chain::types::{BlockWithTxHash, ChainError, ChainResult};

/// Lazy single-pass iterator over blocks `[start, end)`.
///
/// Blocks are fetched `batch_size` at a time in one batched round trip and
/// handed out one by one. The cursor only moves past a group once the whole
/// group was fetched, so a failed advance can be retried without gaps or
/// repeats.
#[derive(Debug)]
pub struct BlockIterator {
    transport: RpcTransport,
    next_block: u64,
    end: u64,
    include_full_tx: bool,
    batch_size: usize,
    buffer: VecDeque<BlockWithTxHash>,
}

impl BlockIterator {
    pub(crate) fn new(
        transport: RpcTransport,
        start: u64,
        end: u64,
        include_full_tx: bool,
        batch_size: usize,
    ) -> Self {
        Self {
            transport,
            next_block: start,
            end: end.max(start),
            include_full_tx,
            batch_size: batch_size.max(1),
            buffer: VecDeque::with_capacity(batch_size.max(1)),
        }
    }

    /// Next block in the range, or `None` once the range is exhausted.
    pub async fn next(&mut self) -> ChainResult<Option<BlockWithTxHash>> {
        if let Some(block) = self.buffer.pop_front() {
            return Ok(Some(block));
        }
        if self.next_block >= self.end {
            return Ok(None);
        }
        self.prefetch().await?;
        Ok(self.buffer.pop_front())
    }

    /// Blocks not yet handed out.
    pub fn remaining(&self) -> u64 {
        (self.end - self.next_block) + self.buffer.len() as u64
    }

    /// Adapt into a stream. The stream ends after the range or after the first error.
    pub fn into_stream(self) -> impl Stream<Item = ChainResult<BlockWithTxHash>> {
        stream::unfold(Some(self), |state| async move {
            let mut iter = state?;
            match iter.next().await {
                Ok(Some(block)) => Some((Ok(block), Some(iter))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    async fn prefetch(&mut self) -> ChainResult<()> {
        let from = self.next_block;
        let to = self.end.min(from.saturating_add(self.batch_size as u64));

        let params: Vec<(BlockNumberOrTag, bool)> = (from..to)
            .map(|n| (BlockNumberOrTag::Number(n), self.include_full_tx))
            .collect();
        let results = self
            .transport
            .batch::<_, Option<Block>>("eth_getBlockByNumber", &params)
            .await?;

        let mut fetched = Vec::with_capacity(results.len());
        for (number, result) in (from..to).zip(results) {
            match result? {
                Some(block) => fetched.push(BlockWithTxHash::from_rpc(block, self.include_full_tx)),
                None => {
                    return Err(ChainError::NotFound {
                        what: "block",
                        key: number.to_string(),
                    })
                }
            }
        }

        tracing::debug!(from = from, to = to, "Prefetched blocks");
        self.buffer.extend(fetched);
        self.next_block = to;
        Ok(())
    }
}
