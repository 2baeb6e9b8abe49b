//! Admission filters and the ordered chain that runs them.
//!
//! Filters are pure checks over an order and their own immutable settings.
//! The chain runs them in registration order and stops at the first rejection.

use alloy::primitives::{Address, U256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::config::{CutoffBoundary, GatewayConfig, TokenPolicyConfig};
use crate::gateway::cutoff::CutoffLookup;
use crate::gateway::error::{GatewayError, RejectReason, TokenSide};
use crate::gateway::order::Order;

/// Rejects self-trades and orders whose LRC fee does not exceed the floor.
#[derive(Debug, Clone)]
pub struct BaseFilter {
    pub min_lrc_fee: U256,
}

impl BaseFilter {
    fn check(&self, order: &Order) -> Result<(), RejectReason> {
        if order.token_s == order.token_b {
            return Err(RejectReason::SelfPair(order.token_s));
        }
        if order.lrc_fee <= self.min_lrc_fee {
            return Err(RejectReason::LrcFeeTooLow {
                fee: order.lrc_fee,
                min: self.min_lrc_fee,
            });
        }
        Ok(())
    }
}

/// Rejects orders not signed by their owner.
#[derive(Debug, Clone, Default)]
pub struct SignFilter;

impl SignFilter {
    fn check(&self, order: &Order) -> Result<(), RejectReason> {
        let computed = order.generate_hash();
        if let Some(claimed) = order.hash {
            if claimed != computed {
                return Err(RejectReason::HashMismatch { claimed, computed });
            }
        }

        let signer = order.signer_address()?;
        if signer != order.owner {
            return Err(RejectReason::SignerMismatch {
                owner: order.owner,
                signer,
            });
        }
        Ok(())
    }
}

/// Allow list then deny list for one side of the order.
#[derive(Debug, Clone)]
pub struct TokenFilter {
    side: TokenSide,
    allow: HashSet<Address>,
    deny: HashSet<Address>,
}

impl TokenFilter {
    pub fn new(side: TokenSide, policy: &TokenPolicyConfig) -> Self {
        Self {
            side,
            allow: policy.allow.iter().copied().collect(),
            deny: policy.deny.iter().copied().collect(),
        }
    }

    fn check(&self, order: &Order) -> Result<(), RejectReason> {
        let token = match self.side {
            TokenSide::Sell => order.token_s,
            TokenSide::Buy => order.token_b,
        };
        if !self.allow.contains(&token) {
            return Err(RejectReason::TokenNotAllowed {
                side: self.side,
                token,
            });
        }
        if self.deny.contains(&token) {
            return Err(RejectReason::TokenDenied {
                side: self.side,
                token,
            });
        }
        Ok(())
    }
}

/// Rejects orders created before the owner's cutoff on the order's protocol.
#[derive(Clone)]
pub struct CutoffFilter {
    lookup: Arc<dyn CutoffLookup>,
    boundary: CutoffBoundary,
}

impl CutoffFilter {
    pub fn new(lookup: Arc<dyn CutoffLookup>, boundary: CutoffBoundary) -> Self {
        Self { lookup, boundary }
    }

    fn check(&self, order: &Order) -> Result<(), RejectReason> {
        let Some(cutoff) = self.lookup.cutoff(&order.protocol, &order.owner) else {
            return Ok(());
        };
        let cut = match self.boundary {
            CutoffBoundary::Strict => order.timestamp < cutoff,
            CutoffBoundary::Inclusive => order.timestamp <= cutoff,
        };
        if cut {
            return Err(RejectReason::CutOff {
                owner: order.owner,
                timestamp: order.timestamp,
                cutoff,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for CutoffFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CutoffFilter")
            .field("boundary", &self.boundary)
            .finish_non_exhaustive()
    }
}

/// The admission filters.
#[derive(Debug, Clone)]
pub enum Filter {
    Base(BaseFilter),
    Sign(SignFilter),
    TokenS(TokenFilter),
    TokenB(TokenFilter),
    Cutoff(CutoffFilter),
}

impl Filter {
    /// Stable name used in logs, metrics and rejection errors.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::Base(_) => "base",
            Filter::Sign(_) => "sign",
            Filter::TokenS(_) => "token_s",
            Filter::TokenB(_) => "token_b",
            Filter::Cutoff(_) => "cutoff",
        }
    }

    pub fn check(&self, order: &Order) -> Result<(), RejectReason> {
        match self {
            Filter::Base(f) => f.check(order),
            Filter::Sign(f) => f.check(order),
            Filter::TokenS(f) | Filter::TokenB(f) => f.check(order),
            Filter::Cutoff(f) => f.check(order),
        }
    }
}

/// Ordered, immutable list of filters.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
}

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Base → Sign → TokenS → TokenB, then Cutoff when enabled.
    pub fn from_config(config: &GatewayConfig, cutoffs: Arc<dyn CutoffLookup>) -> Self {
        let mut filters = vec![
            Filter::Base(BaseFilter {
                min_lrc_fee: config.min_lrc_fee,
            }),
            Filter::Sign(SignFilter),
            Filter::TokenS(TokenFilter::new(TokenSide::Sell, &config.token_s)),
            Filter::TokenB(TokenFilter::new(TokenSide::Buy, &config.token_b)),
        ];
        if config.cutoff.enabled {
            filters.push(Filter::Cutoff(CutoffFilter::new(cutoffs, config.cutoff.boundary)));
        }
        Self { filters }
    }

    /// Run every filter in order; the first rejection wins.
    pub fn check(&self, order: &Order) -> Result<(), GatewayError> {
        for filter in &self.filters {
            filter.check(order).map_err(|reason| GatewayError::Rejected {
                filter: filter.name(),
                reason,
            })?;
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(Filter::name).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
