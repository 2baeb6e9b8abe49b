//! Serde helpers for configuration deserialization

use alloy::primitives::U256;
use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;

/// Deserialize a `U256` from a TOML integer or a decimal / `0x` hex string.
///
/// Token amounts routinely exceed `i64`, so large values must be quoted.
pub fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    struct U256Visitor;

    impl<'de> Visitor<'de> for U256Visitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal/hex string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom(format!("negative amount: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            parse_u256(v).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(U256Visitor)
}

/// Serialize a `U256` as a decimal string.
pub fn serialize_u256<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// Parse a decimal or `0x` prefixed hex amount.
pub fn parse_u256(input: &str) -> Result<U256, String> {
    let input = input.trim();
    let parsed = match input.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(input, 10),
    };
    parsed.map_err(|e| format!("invalid amount '{}': {}", input, e))
}
