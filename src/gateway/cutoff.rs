//! Owner cutoff timestamps for the cutoff filter.
//!
//! The filter only reads from a [`CutoffLookup`]. [`CutoffCache`] remembers
//! every (protocol, owner) pair it has loaded so the relay can seed it before
//! admitting orders and re-read all of them on a timer with
//! [`CutoffCache::refresh_watched`]. Between refreshes the filter sees the
//! last value read.

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, U256};
use dashmap::{DashMap, DashSet};

use crate::chain::{ChainAccessor, ChainResult};

/// Synchronous cutoff source. Must not block on I/O.
pub trait CutoffLookup: Send + Sync {
    /// Cutoff of `owner` on `protocol`, `None` if the owner never set one.
    fn cutoff(&self, protocol: &Address, owner: &Address) -> Option<U256>;
}

/// In-memory cutoff table keyed by (protocol, owner).
#[derive(Debug, Default)]
pub struct CutoffCache {
    entries: DashMap<(Address, Address), U256>,
    watched: DashSet<(Address, Address)>,
}

impl CutoffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, protocol: Address, owner: Address, cutoff: U256) {
        if cutoff.is_zero() {
            self.entries.remove(&(protocol, owner));
        } else {
            self.entries.insert((protocol, owner), cutoff);
        }
    }

    /// Include `owner` on `protocol` in future [`CutoffCache::refresh_watched`] passes.
    pub fn watch(&self, protocol: Address, owner: Address) {
        self.watched.insert((protocol, owner));
    }

    pub fn watched_len(&self) -> usize {
        self.watched.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the cutoff of each owner from `protocol` and watch them. Returns how many owners have one.
    pub async fn refresh_from_chain<I>(&self, accessor: &ChainAccessor, protocol: Address, owners: I) -> ChainResult<usize>
    where
        I: IntoIterator<Item = Address>,
    {
        for owner in owners {
            let cutoff = accessor.get_cutoff(protocol, owner, BlockNumberOrTag::Latest).await?;
            self.set(protocol, owner, cutoff);
            self.watch(protocol, owner);
        }
        let count = self.entries.iter().filter(|e| e.key().0 == protocol).count();
        tracing::debug!(protocol = %protocol, owners_with_cutoff = count, "Cutoffs refreshed");
        Ok(count)
    }

    /// Re-read every watched pair. Failed reads keep the previous value.
    /// Returns the number of pairs that could not be read.
    pub async fn refresh_watched(&self, accessor: &ChainAccessor) -> usize {
        let pairs: Vec<(Address, Address)> = self.watched.iter().map(|pair| *pair).collect();
        let mut failed = 0;
        for (protocol, owner) in pairs {
            match accessor.get_cutoff(protocol, owner, BlockNumberOrTag::Latest).await {
                Ok(cutoff) => self.set(protocol, owner, cutoff),
                Err(e) => {
                    failed += 1;
                    tracing::warn!(protocol = %protocol, owner = %owner, error = %e, "Cutoff refresh failed");
                }
            }
        }
        tracing::debug!(watched = self.watched.len(), failed = failed, "Watched cutoffs refreshed");
        failed
    }
}

impl CutoffLookup for CutoffCache {
    fn cutoff(&self, protocol: &Address, owner: &Address) -> Option<U256> {
        self.entries.get(&(*protocol, *owner)).map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_set_and_clear() {
        let cache = CutoffCache::new();
        let protocol = Address::with_last_byte(1);
        let owner = Address::with_last_byte(2);

        assert_eq!(cache.cutoff(&protocol, &owner), None);
        cache.set(protocol, owner, U256::from(100));
        assert_eq!(cache.cutoff(&protocol, &owner), Some(U256::from(100)));
        assert_eq!(cache.cutoff(&Address::with_last_byte(9), &owner), None);

        // A zero cutoff on chain means none
        cache.set(protocol, owner, U256::ZERO);
        assert!(cache.is_empty());
        assert_eq!(cache.watched_len(), 0);

        cache.watch(protocol, owner);
        cache.watch(protocol, owner);
        assert_eq!(cache.watched_len(), 1);
    }
}
