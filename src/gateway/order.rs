//! Off-chain orders and the accepted-order wrapper.

use alloy::primitives::{keccak256, Address, Signature, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gateway::error::RejectReason;

/// A signed trade intent: sell `amount_s` of `token_s` for `amount_b` of `token_b`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Protocol implementation the order is signed for.
    pub protocol: Address,
    pub owner: Address,
    pub token_s: Address,
    pub token_b: Address,
    pub amount_s: U256,
    pub amount_b: U256,
    /// Creation time, seconds since the epoch.
    pub timestamp: U256,
    /// Lifetime in seconds.
    pub ttl: U256,
    pub salt: U256,
    pub lrc_fee: U256,
    pub buy_no_more_than_amount_b: bool,
    pub margin_split_percentage: u8,
    pub v: u8,
    pub r: B256,
    pub s: B256,

    /// Set by the gateway during admission.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,

    /// Set by the gateway during admission.
    #[serde(skip)]
    pub price: Option<Price>,
}

impl Order {
    /// Keccak-256 over the tightly packed canonical fields.
    pub fn generate_hash(&self) -> B256 {
        let mut packed = Vec::with_capacity(4 * 20 + 6 * 32 + 2);
        packed.extend_from_slice(self.protocol.as_slice());
        packed.extend_from_slice(self.owner.as_slice());
        packed.extend_from_slice(self.token_s.as_slice());
        packed.extend_from_slice(self.token_b.as_slice());
        for word in [
            self.amount_s,
            self.amount_b,
            self.timestamp,
            self.ttl,
            self.salt,
            self.lrc_fee,
        ] {
            packed.extend_from_slice(&word.to_be_bytes::<32>());
        }
        packed.push(self.buy_no_more_than_amount_b as u8);
        packed.push(self.margin_split_percentage);
        keccak256(&packed)
    }

    /// `amount_s / amount_b`, `None` when `amount_b` is zero.
    pub fn generate_price(&self) -> Option<Price> {
        Price::new(self.amount_s, self.amount_b)
    }

    /// Address that produced (v, r, s) over the order hash as a personal message.
    pub fn signer_address(&self) -> Result<Address, RejectReason> {
        let odd_y = match self.v {
            0 | 27 => false,
            1 | 28 => true,
            other => {
                return Err(RejectReason::InvalidSignature(format!(
                    "unsupported recovery id {}",
                    other
                )))
            }
        };
        let signature = Signature::new(
            U256::from_be_bytes(self.r.0),
            U256::from_be_bytes(self.s.0),
            odd_y,
        );
        signature
            .recover_address_from_msg(self.generate_hash().as_slice())
            .map_err(|e| RejectReason::InvalidSignature(e.to_string()))
    }

    /// Assign price, and hash unless the client supplied one to be checked.
    pub fn normalize(&mut self) {
        if self.hash.is_none() {
            self.hash = Some(self.generate_hash());
        }
        self.price = self.generate_price();
    }
}

/// Exact exchange rate of an order, kept as an unreduced integer ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price {
    pub numerator: U256,
    pub denominator: U256,
}

impl Price {
    pub fn new(numerator: U256, denominator: U256) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// An admitted order as handed to the order manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    pub raw_order: Order,
    pub dealt_amount_s: U256,
    pub dealt_amount_b: U256,
    pub cancelled_amount_s: U256,
    pub cancelled_amount_b: U256,
}

impl OrderState {
    pub fn accepted(raw_order: Order) -> Self {
        Self {
            raw_order,
            dealt_amount_s: U256::ZERO,
            dealt_amount_b: U256::ZERO,
            cancelled_amount_s: U256::ZERO,
            cancelled_amount_b: U256::ZERO,
        }
    }

    pub fn hash(&self) -> Option<B256> {
        self.raw_order.hash
    }
}
