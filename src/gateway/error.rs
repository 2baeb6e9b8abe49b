//! Admission rejections and gateway errors.

use alloy::primitives::{Address, B256, U256};
use std::fmt;
use thiserror::Error;

/// Which side of an order a token policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSide {
    /// The token being sold.
    Sell,
    /// The token being bought.
    Buy,
}

impl fmt::Display for TokenSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSide::Sell => f.write_str("tokenS"),
            TokenSide::Buy => f.write_str("tokenB"),
        }
    }
}

/// Why a filter refused an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("tokenS and tokenB are both {0}")]
    SelfPair(Address),

    #[error("lrcFee {fee} must exceed the minimum {min}")]
    LrcFeeTooLow { fee: U256, min: U256 },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("order hash {claimed} does not match its fields ({computed})")]
    HashMismatch { claimed: B256, computed: B256 },

    #[error("signer {signer} is not the owner {owner}")]
    SignerMismatch { owner: Address, signer: Address },

    #[error("{side} {token} is not in the allow list")]
    TokenNotAllowed { side: TokenSide, token: Address },

    #[error("{side} {token} is denied")]
    TokenDenied { side: TokenSide, token: Address },

    #[error("order timestamp {timestamp} is before the cutoff {cutoff} of {owner}")]
    CutOff {
        owner: Address,
        timestamp: U256,
        cutoff: U256,
    },
}

/// Errors from [`crate::gateway::Gateway::handle_order`].
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The order failed a filter and was dropped.
    #[error("order rejected by {filter} filter: {reason}")]
    Rejected {
        filter: &'static str,
        reason: RejectReason,
    },

    /// The accepted-order receiver is gone.
    #[error("accepted-order channel closed")]
    PublishClosed,
}

impl GatewayError {
    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            GatewayError::Rejected { reason, .. } => Some(reason),
            GatewayError::PublishClosed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_messages_name_the_problem() {
        let reason = RejectReason::TokenDenied {
            side: TokenSide::Buy,
            token: Address::with_last_byte(1),
        };
        assert!(reason.to_string().starts_with("tokenB 0x"));

        let err = GatewayError::Rejected {
            filter: "base",
            reason: RejectReason::LrcFeeTooLow {
                fee: U256::from(1),
                min: U256::from(1),
            },
        };
        assert_eq!(
            err.to_string(),
            "order rejected by base filter: lrcFee 1 must exceed the minimum 1"
        );
        assert!(err.reason().is_some());
        assert!(GatewayError::PublishClosed.reason().is_none());
    }
}
