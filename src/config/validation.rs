//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! consistency. All errors are collected, not just the first.

use alloy::primitives::Address;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{RelayConfig, TokenPolicyConfig};

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a parsed configuration.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(&config.chain.rpc_url) {
        errors.push(ValidationError::new("chain.rpc_url", e.to_string()));
    }
    if config.chain.chain_id == 0 {
        errors.push(ValidationError::new("chain.chain_id", "must be non-zero"));
    }
    if config.chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("chain.rpc_timeout_secs", "must be at least 1"));
    }

    if config.gas.max_gas_price_gwei == 0 {
        errors.push(ValidationError::new("gas.max_gas_price_gwei", "must be non-zero"));
    }

    if config.scan.block_batch_size == 0 {
        errors.push(ValidationError::new("scan.block_batch_size", "must be at least 1"));
    }
    if config.scan.tx_batch_size == 0 {
        errors.push(ValidationError::new("scan.tx_batch_size", "must be at least 1"));
    }

    let mut versions = HashSet::new();
    let mut implementations = HashSet::new();
    for (i, protocol) in config.protocols.iter().enumerate() {
        let field = format!("protocols[{}]", i);
        if protocol.version.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.version", field), "must not be empty"));
        } else if !versions.insert(protocol.version.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.version", field),
                format!("duplicate version '{}'", protocol.version),
            ));
        }
        if protocol.implementation == Address::ZERO {
            errors.push(ValidationError::new(
                format!("{}.implementation", field),
                "must not be the zero address",
            ));
        } else if !implementations.insert(protocol.implementation) {
            errors.push(ValidationError::new(
                format!("{}.implementation", field),
                format!("duplicate implementation {}", protocol.implementation),
            ));
        }
    }

    validate_token_policy("gateway.token_s", &config.gateway.token_s, &mut errors);
    validate_token_policy("gateway.token_b", &config.gateway.token_b, &mut errors);
    if config.gateway.inbound_capacity == 0 {
        errors.push(ValidationError::new("gateway.inbound_capacity", "must be at least 1"));
    }
    if config.gateway.cutoff.enabled && config.gateway.cutoff.refresh_interval_secs == 0 {
        errors.push(ValidationError::new(
            "gateway.cutoff.refresh_interval_secs",
            "must be at least 1",
        ));
    }

    let obs = &config.observability;
    if !LOG_LEVELS.contains(&obs.log_level.to_lowercase().as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_token_policy(field: &str, policy: &TokenPolicyConfig, errors: &mut Vec<ValidationError>) {
    if policy.allow.is_empty() {
        errors.push(ValidationError::new(
            format!("{}.allow", field),
            "is empty, every order would be rejected",
        ));
    }
    let denied: HashSet<&Address> = policy.deny.iter().collect();
    for token in policy.allow.iter().filter(|t| denied.contains(t)) {
        errors.push(ValidationError::new(
            field,
            format!("token {} is both allowed and denied", token),
        ));
    }
}
