//! Relay accounts and their signing keys.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized

use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::chain::types::{ChainError, ChainResult};

/// Environment variable holding comma separated hex private keys.
pub const ACCOUNT_KEYS_ENV_VAR: &str = "RELAY_ACCOUNT_KEYS";

/// One signing account with a local nonce counter.
#[derive(Debug, Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
    /// Next nonce this process will use, shared between clones.
    nonce: Arc<AtomicU64>,
}

impl Wallet {
    /// Create a wallet from a hex-encoded private key (with or without `0x`).
    pub fn from_private_key(private_key_hex: &str) -> ChainResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| ChainError::Wallet(format!("Invalid private key format: {}", e)))?;

        Ok(Self {
            signer,
            nonce: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Reserve the next nonce, never going below what the node reports as pending.
    pub fn reserve_nonce(&self, chain_nonce: u64) -> u64 {
        self.nonce.fetch_max(chain_nonce, Ordering::SeqCst);
        self.nonce.fetch_add(1, Ordering::SeqCst)
    }

    /// Hand back a reserved nonce whose transaction never reached the node.
    ///
    /// Only the most recent reservation can be returned. Returns false when a
    /// later reservation already consumed the next value; the gap then closes
    /// once the node's pending count catches up.
    pub fn release_nonce(&self, nonce: u64) -> bool {
        let released = self
            .nonce
            .compare_exchange(nonce + 1, nonce, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if !released {
            tracing::warn!(
                account = %self.address(),
                nonce = nonce,
                next = self.current_nonce(),
                "Nonce could not be released, a later send already reserved past it"
            );
        }
        released
    }

    /// Get current nonce without incrementing.
    pub fn current_nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    /// Network wallet used to sign transaction requests.
    pub(crate) fn network_wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }
}

/// Signing accounts available to the relay, keyed by address.
#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: HashMap<Address, Wallet>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma separated list of private keys. Empty entries are skipped.
    pub fn from_keys(keys: &str) -> ChainResult<Self> {
        let mut store = Self::new();
        for key in keys.split(',').map(str::trim).filter(|k| !k.is_empty()) {
            store.insert(Wallet::from_private_key(key)?);
        }
        Ok(store)
    }

    /// Load accounts from `RELAY_ACCOUNT_KEYS`. An unset variable yields an empty store.
    pub fn from_env() -> ChainResult<Self> {
        match std::env::var(ACCOUNT_KEYS_ENV_VAR) {
            Ok(keys) => {
                let store = Self::from_keys(&keys)?;
                for address in store.addresses() {
                    tracing::info!(address = %address, "Relay account loaded");
                }
                Ok(store)
            }
            Err(_) => {
                tracing::info!("{} not set, relay runs without signing accounts", ACCOUNT_KEYS_ENV_VAR);
                Ok(Self::new())
            }
        }
    }

    pub fn insert(&mut self, wallet: Wallet) {
        self.accounts.insert(wallet.address(), wallet);
    }

    pub fn get(&self, address: &Address) -> ChainResult<&Wallet> {
        self.accounts
            .get(address)
            .ok_or(ChainError::UnknownAccount(*address))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.accounts.keys()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
